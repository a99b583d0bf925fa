//! Turns compiled statements into the literal SQL string sent over the wire.
//!
//! A statement without values is sent as written. Otherwise each run of rows
//! that share the same SQL becomes a prepared block:
//!
//! ```text
//! PREPARE _1a2b3c4d5e6f7a8b AS
//! insert into "t" ("a") values ($1);
//! EXECUTE _1a2b3c4d5e6f7a8b(numeric $$1$$);
//! EXECUTE _1a2b3c4d5e6f7a8b(numeric $$2$$);
//! DEALLOCATE _1a2b3c4d5e6f7a8b
//! ```

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::builder::{Raw, SqlValue};
use crate::compiler::{segments, CompiledStatement, Segment};
use crate::encode::{encode, TimeZone};
use crate::error::{CompileError, EncodingError, Result};
use crate::ident::quote_qualified;

/// How a list of statements is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Envelope {
    /// `BEGIN;` … `COMMIT;`
    #[default]
    Transaction,
    /// Statements joined as they are.
    Bare,
}

/// A statement with identifiers and nested raw statements resolved, split
/// around its remaining value slots.
#[derive(Debug, PartialEq)]
struct Flattened {
    pieces: Vec<String>,
    values: Vec<SqlValue>,
}

impl Flattened {
    fn new() -> Self {
        Self {
            pieces: vec![String::new()],
            values: vec![],
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(last) = self.pieces.last_mut() {
            last.push_str(text);
        }
    }

    fn push_value(&mut self, value: SqlValue) {
        self.values.push(value);
        self.pieces.push(String::new());
    }

    /// SQL with `$1…$n` in the value slots.
    fn parameterized(&self) -> String {
        let mut sql = String::new();
        for (i, piece) in self.pieces.iter().enumerate() {
            if i > 0 {
                sql.push_str(&format!("${i}"));
            }
            sql.push_str(piece);
        }
        sql
    }

    /// SQL with encoded literals in the value slots.
    fn inlined(&self, tz: TimeZone) -> Result<String> {
        let mut sql = String::new();
        for (i, piece) in self.pieces.iter().enumerate() {
            if i > 0 {
                sql.push_str(&encode(&self.values[i - 1], tz)?);
            }
            sql.push_str(piece);
        }
        Ok(sql)
    }

    fn type_descriptor(&self) -> String {
        self.values
            .iter()
            .map(SqlValue::type_tag)
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn flatten(sql: &str, bindings: &[SqlValue]) -> Result<Flattened> {
    let mut flat = Flattened::new();
    flatten_into(sql, bindings, &mut flat)?;
    Ok(flat)
}

fn flatten_into(sql: &str, bindings: &[SqlValue], flat: &mut Flattened) -> Result<()> {
    let segments = segments(sql);
    let actual = segments
        .iter()
        .filter(|s| !matches!(s, Segment::Text(_)))
        .count();
    if actual != bindings.len() {
        return Err(CompileError::BindingCount {
            expected: bindings.len(),
            actual,
        }
        .into());
    }

    let mut values = bindings.iter();
    for segment in segments {
        let value = match segment {
            Segment::Text(text) => {
                flat.push_text(text);
                continue;
            }
            Segment::Value | Segment::Identifier => match values.next() {
                Some(value) => value,
                None => break,
            },
        };
        match (segment, value) {
            (Segment::Identifier, SqlValue::Text(name)) => flat.push_text(&quote_qualified(name)),
            (Segment::Identifier, other) => {
                return Err(CompileError::InvalidIdentifier(other.type_tag()).into());
            }
            (_, SqlValue::Raw(raw)) => flatten_into(raw.sql(), raw.bindings(), flat)?,
            (_, value) => flat.push_value(value.clone()),
        }
    }
    Ok(())
}

/// Deterministic prepared statement name for a run of rows.
fn prepared_name(sql: &str, rows: &[Flattened]) -> String {
    let descriptor = rows
        .iter()
        .map(Flattened::type_descriptor)
        .collect::<Vec<_>>()
        .join(";");
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    hasher.update(b"\n");
    hasher.update(descriptor.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("_{}", &digest[..16])
}

fn render_run(rows: &[Flattened], tz: TimeZone) -> Result<String> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let sql = first.parameterized();
    if first.values.is_empty() {
        return Ok(vec![sql.as_str(); rows.len()].join(";\n"));
    }

    let name = prepared_name(&sql, rows);
    let mut out = format!("PREPARE {name} AS\n{sql};\n");
    for row in rows {
        let literals = row
            .values
            .iter()
            .map(|v| encode(v, tz))
            .collect::<std::result::Result<Vec<_>, EncodingError>>()?;
        out.push_str(&format!("EXECUTE {name}({});\n", literals.join(",")));
    }
    out.push_str(&format!("DEALLOCATE {name}"));
    Ok(out)
}

/// Materializes one compiled statement.
///
/// # Errors
///
/// Fails when placeholder and binding counts disagree, when an identifier
/// binding is not text, or when a value cannot be encoded.
pub fn materialize(statement: &CompiledStatement, tz: TimeZone) -> Result<String> {
    let rows = statement.bindings.rows();
    if rows.is_empty() {
        return Ok(statement.sql.clone());
    }
    let flattened = rows
        .iter()
        .map(|row| flatten(&statement.sql, row))
        .collect::<Result<Vec<_>>>()?;

    let runs = flattened
        .chunk_by(|a, b| a.pieces == b.pieces)
        .map(|run| render_run(run, tz))
        .collect::<Result<Vec<_>>>()?;
    Ok(runs.join(";\n"))
}

/// Materializes a list of statements into one string.
///
/// # Errors
///
/// Fails like [`materialize`] for any of the statements.
pub fn materialize_all(
    statements: &[CompiledStatement],
    tz: TimeZone,
    envelope: Envelope,
) -> Result<String> {
    let parts = statements
        .iter()
        .map(|s| materialize(s, tz))
        .collect::<Result<Vec<_>>>()?;
    let body = parts.join(";\n");
    let sql = match envelope {
        Envelope::Transaction => format!("BEGIN;\n{body};\nCOMMIT;"),
        Envelope::Bare => body,
    };
    debug!(%sql, "materialized");
    Ok(sql)
}

/// Renders a raw fragment with its values inlined as literals, for places
/// where a prepared statement is not allowed (DDL).
///
/// # Errors
///
/// Fails like [`materialize`].
pub fn inline(raw: &Raw, tz: TimeZone) -> Result<String> {
    flatten(raw.sql(), raw.bindings())?.inlined(tz)
}
