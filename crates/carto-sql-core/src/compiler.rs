//! Lowering of builder operations to SQL with placeholders.
//!
//! A compiled statement still carries its values separately; `?` marks a
//! bound value and `??` a bound identifier. [`crate::materialize`] turns the
//! pair into literal SQL.

use std::collections::BTreeSet;

use tracing::debug;

use crate::builder::{
    DeleteQuery, ExprBuilder, InsertQuery, Raw, SelectQuery, SqlValue, UpdateQuery,
};
use crate::error::{CompileError, Result};
use crate::ident::{quote_identifier, quote_qualified};
use crate::materialize::Envelope;
use crate::schema::{compile_schema, SchemaBuilder};

/// What kind of statement a compiled statement is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Select,
    Insert,
    Update,
    Delete,
    Raw,
    Ddl,
}

/// Values bound to a statement's placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum Bindings {
    /// One set of values for a statement executed once.
    Single(Vec<SqlValue>),
    /// One set of values per row, for a statement executed once per row.
    PerRow(Vec<Vec<SqlValue>>),
}

impl Bindings {
    /// Returns the value sets in execution order.
    #[must_use]
    pub fn rows(&self) -> Vec<&[SqlValue]> {
        match self {
            Self::Single(values) => vec![values.as_slice()],
            Self::PerRow(rows) => rows.iter().map(Vec::as_slice).collect(),
        }
    }

    /// Returns true if no values are bound at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(values) => values.is_empty(),
            Self::PerRow(rows) => rows.iter().all(Vec::is_empty),
        }
    }
}

/// SQL text plus the values for its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    /// SQL with `?`/`??` placeholders.
    pub sql: String,
    /// Values for the placeholders.
    pub bindings: Bindings,
    /// Statement kind.
    pub method: Method,
}

impl CompiledStatement {
    /// Creates a statement executed once.
    #[must_use]
    pub fn new(sql: impl Into<String>, bindings: Vec<SqlValue>, method: Method) -> Self {
        Self {
            sql: sql.into(),
            bindings: Bindings::Single(bindings),
            method,
        }
    }

    /// Creates a DDL statement without bindings.
    #[must_use]
    pub fn ddl(sql: impl Into<String>) -> Self {
        Self::new(sql, vec![], Method::Ddl)
    }
}

/// A complete operation, ready to be compiled.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Select(SelectQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
    Raw(Raw),
    Schema(SchemaBuilder),
}

impl Operation {
    /// Returns the method tag of the operation.
    #[must_use]
    pub const fn method(&self) -> Method {
        match self {
            Self::Select(_) => Method::Select,
            Self::Insert(_) => Method::Insert,
            Self::Update(_) => Method::Update,
            Self::Delete(_) => Method::Delete,
            Self::Raw(_) => Method::Raw,
            Self::Schema(_) => Method::Ddl,
        }
    }

    /// Returns the target table, if the operation has one.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Select(q) => Some(q.table()),
            Self::Insert(q) => Some(q.table()),
            Self::Update(q) => Some(q.table()),
            Self::Delete(q) => Some(q.table()),
            Self::Raw(_) | Self::Schema(_) => None,
        }
    }

    /// Raw statements run as written; everything else runs in a transaction.
    #[must_use]
    pub const fn envelope(&self) -> Envelope {
        match self {
            Self::Raw(_) => Envelope::Bare,
            _ => Envelope::Transaction,
        }
    }

    /// Returns the table a schema operation creates, if any.
    #[must_use]
    pub fn created_table(&self) -> Option<&str> {
        match self {
            Self::Schema(schema) => schema.created_table(),
            _ => None,
        }
    }
}

impl From<Raw> for Operation {
    fn from(raw: Raw) -> Self {
        Self::Raw(raw)
    }
}

/// Compiles an operation to one or more statements.
///
/// # Errors
///
/// Fails for inserts without rows, updates without assignments, raw
/// statements whose placeholder and binding counts disagree, and unnamed
/// non-increment columns.
pub fn compile(op: &Operation) -> Result<Vec<CompiledStatement>> {
    let statements = match op {
        Operation::Select(q) => vec![compile_select(q)],
        Operation::Insert(q) => compile_insert(q)?,
        Operation::Update(q) => vec![compile_update(q)?],
        Operation::Delete(q) => vec![compile_delete(q)],
        Operation::Raw(raw) => vec![compile_raw(raw)?],
        Operation::Schema(schema) => compile_schema(schema)?,
    };
    for statement in &statements {
        debug!(sql = %statement.sql, method = ?statement.method, "compiled statement");
    }
    Ok(statements)
}

fn push_expr(sql: &mut String, params: &mut Vec<SqlValue>, keyword: &str, expr: &ExprBuilder) {
    sql.push_str(keyword);
    sql.push_str(expr.sql());
    params.extend(expr.params().iter().cloned());
}

fn compile_select(q: &SelectQuery) -> CompiledStatement {
    let mut sql = String::from("select ");
    let mut params = vec![];

    if q.distinct {
        sql.push_str("distinct ");
    }

    for (i, column) in q.columns.iter().enumerate() {
        push_expr(&mut sql, &mut params, if i == 0 { "" } else { ", " }, column);
    }

    sql.push_str(" from ");
    sql.push_str(&quote_qualified(&q.from));

    for join in &q.joins {
        sql.push(' ');
        sql.push_str(join);
    }

    if let Some(ref where_expr) = q.where_clause {
        push_expr(&mut sql, &mut params, " where ", where_expr);
    }

    if !q.group_by.is_empty() {
        sql.push_str(" group by ");
        sql.push_str(&q.group_by.join(", "));
    }

    if let Some(ref having_expr) = q.having {
        push_expr(&mut sql, &mut params, " having ", having_expr);
    }

    if !q.order_by.is_empty() {
        sql.push_str(" order by ");
        sql.push_str(&q.order_by.join(", "));
    }

    if let Some(n) = q.limit {
        sql.push_str(&format!(" limit {n}"));
    }

    if let Some(n) = q.offset {
        sql.push_str(&format!(" offset {n}"));
    }

    CompiledStatement::new(sql, params, Method::Select)
}

fn compile_insert(q: &InsertQuery) -> Result<Vec<CompiledStatement>> {
    if q.rows.is_empty() {
        return Err(CompileError::EmptyInsert {
            table: q.table.clone(),
        }
        .into());
    }
    let table = quote_qualified(&q.table);

    let columns: BTreeSet<&str> = q
        .rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    if columns.is_empty() {
        let sql = format!("insert into {table} default values");
        return Ok(q
            .rows
            .iter()
            .map(|_| CompiledStatement::new(sql.clone(), vec![], Method::Insert))
            .collect());
    }

    // Insert targets are plain column names, never qualified.
    let names: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    let sql = format!(
        "insert into {table} ({}) values ({})",
        names.join(", "),
        placeholders.join(", ")
    );

    let rows = q
        .rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(*c).cloned().unwrap_or(SqlValue::Null))
                .collect()
        })
        .collect();

    Ok(vec![CompiledStatement {
        sql,
        bindings: Bindings::PerRow(rows),
        method: Method::Insert,
    }])
}

fn compile_update(q: &UpdateQuery) -> Result<CompiledStatement> {
    if q.assignments.is_empty() {
        return Err(CompileError::EmptyUpdate {
            table: q.table.clone(),
        }
        .into());
    }
    let mut sql = format!("update {} set ", quote_qualified(&q.table));
    let mut params = vec![];

    let set_parts: Vec<String> = q
        .assignments
        .iter()
        .map(|(column, _)| format!("{} = ?", quote_identifier(column)))
        .collect();
    sql.push_str(&set_parts.join(", "));
    params.extend(q.assignments.iter().map(|(_, value)| value.clone()));

    if let Some(ref where_expr) = q.where_clause {
        push_expr(&mut sql, &mut params, " where ", where_expr);
    }

    Ok(CompiledStatement::new(sql, params, Method::Update))
}

fn compile_delete(q: &DeleteQuery) -> CompiledStatement {
    let mut sql = format!("delete from {}", quote_qualified(&q.table));
    let mut params = vec![];

    if let Some(ref where_expr) = q.where_clause {
        push_expr(&mut sql, &mut params, " where ", where_expr);
    }

    CompiledStatement::new(sql, params, Method::Delete)
}

pub(crate) fn compile_raw(raw: &Raw) -> Result<CompiledStatement> {
    let actual = placeholder_count(raw.sql());
    let expected = raw.bindings().len();
    if actual != expected {
        return Err(CompileError::BindingCount { expected, actual }.into());
    }
    Ok(CompiledStatement::new(
        raw.sql(),
        raw.bindings().to_vec(),
        Method::Raw,
    ))
}

/// A piece of SQL text split at its placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    /// `?`
    Value,
    /// `??`
    Identifier,
}

/// Splits SQL at `?` and `??`, leaving quoted regions and comments alone.
///
/// `'…'`, `"…"`, `$tag$…$tag$`, `-- …` and `/* … */` are never scanned for
/// placeholders, and `\?` stands for a literal question mark.
pub(crate) fn segments(sql: &str) -> Vec<Segment<'_>> {
    let bytes = sql.as_bytes();
    let mut out = vec![];
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => i = skip_quoted(bytes, i, quote),
            b'$' => i = skip_dollar_quoted(sql, i),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |p| i + p + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b'\\' if bytes.get(i + 1) == Some(&b'?') => {
                push_text(&mut out, &sql[start..i]);
                // The `?` itself opens the next text run.
                start = i + 1;
                i += 2;
            }
            b'?' => {
                push_text(&mut out, &sql[start..i]);
                if bytes.get(i + 1) == Some(&b'?') {
                    out.push(Segment::Identifier);
                    i += 2;
                } else {
                    out.push(Segment::Value);
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }
    push_text(&mut out, &sql[start..]);
    out
}

fn push_text<'a>(out: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        out.push(Segment::Text(text));
    }
}

/// Number of `?` and `??` placeholders outside quoted regions.
pub(crate) fn placeholder_count(sql: &str) -> usize {
    segments(sql)
        .iter()
        .filter(|s| !matches!(s, Segment::Text(_)))
        .count()
}

fn skip_quoted(bytes: &[u8], open: usize, quote: u8) -> usize {
    let mut j = open + 1;
    while j < bytes.len() {
        if bytes[j] == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    bytes.len()
}

/// Block comments nest.
fn skip_block_comment(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0_usize;
    let mut j = open;
    while j + 1 < bytes.len() {
        match (bytes[j], bytes[j + 1]) {
            (b'/', b'*') => {
                depth += 1;
                j += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                j += 2;
                if depth == 0 {
                    return j;
                }
            }
            _ => j += 1,
        }
    }
    bytes.len()
}

fn skip_dollar_quoted(sql: &str, open: usize) -> usize {
    let bytes = sql.as_bytes();
    let mut j = open + 1;
    while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
        j += 1;
    }
    // `$1` is a positional parameter, not a tag.
    let starts_with_digit = bytes.get(open + 1).is_some_and(u8::is_ascii_digit);
    if j >= bytes.len() || bytes[j] != b'$' || starts_with_digit {
        return open + 1;
    }
    let tag = &sql[open..=j];
    sql[j + 1..]
        .find(tag)
        .map_or(bytes.len(), |p| j + 1 + p + tag.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{col, record, table, Insert, Order, Select, Update};

    fn single(op: &Operation) -> CompiledStatement {
        let mut statements = compile(op).unwrap();
        assert_eq!(statements.len(), 1);
        statements.remove(0)
    }

    #[test]
    fn test_simple_select() {
        let stmt = single(&Select::new().columns(&["id", "name"]).from("users").build());
        assert_eq!(stmt.sql, "select \"id\", \"name\" from \"users\"");
        assert!(stmt.bindings.is_empty());
        assert_eq!(stmt.method, Method::Select);
    }

    #[test]
    fn test_full_select() {
        let op = Select::new()
            .columns(&["u.id", "u.name"])
            .distinct()
            .from("users")
            .left_join("orders", "users.id", "orders.user_id")
            .where_clause(col("u.active").eq(true).and(col("o.status").not_eq("cancelled")))
            .group_by(&["u.id", "u.name"])
            .order_by("u.name", Order::Desc)
            .limit(10)
            .offset(20)
            .build();
        let stmt = single(&op);
        assert_eq!(
            stmt.sql,
            "select distinct \"u\".\"id\", \"u\".\"name\" from \"users\" \
             left join \"orders\" on \"users\".\"id\" = \"orders\".\"user_id\" \
             where \"u\".\"active\" = ? and \"o\".\"status\" != ? \
             group by \"u\".\"id\", \"u\".\"name\" order by \"u\".\"name\" desc \
             limit 10 offset 20"
        );
        assert_eq!(
            stmt.bindings,
            Bindings::Single(vec![SqlValue::Bool(true), SqlValue::Text("cancelled".into())])
        );
    }

    #[test]
    fn test_count() {
        let stmt = single(&table("t").count().build());
        assert_eq!(stmt.sql, "select count(*) from \"t\"");
    }

    #[test]
    fn test_insert_union_of_columns() {
        let op = Insert::into_table("t")
            .row(record([("b", 1_i64)]))
            .row(record([("a", 2_i64)]))
            .build();
        let stmt = single(&op);
        assert_eq!(stmt.sql, "insert into \"t\" (\"a\", \"b\") values (?, ?)");
        assert_eq!(
            stmt.bindings,
            Bindings::PerRow(vec![
                vec![SqlValue::Null, SqlValue::Int(1)],
                vec![SqlValue::Int(2), SqlValue::Null],
            ])
        );
    }

    #[test]
    fn test_dotted_column_names_are_not_split() {
        let stmt = single(&Insert::into_table("t").row(record([("addr.street", "x")])).build());
        assert_eq!(stmt.sql, "insert into \"t\" (\"addr.street\") values (?)");

        let stmt = single(&Update::table("t").set("addr.street", "y").build());
        assert_eq!(stmt.sql, "update \"t\" set \"addr.street\" = ?");
    }

    #[test]
    fn test_empty_insert_rejected() {
        let op = Insert::into_table("t").rows(vec![]).build();
        assert_eq!(
            compile(&op).unwrap_err(),
            crate::Error::Compile(CompileError::EmptyInsert {
                table: String::from("t")
            })
        );
    }

    #[test]
    fn test_insert_default_values() {
        let op = table("t").insert_many(vec![record(Vec::<(&str, i64)>::new()); 2]).build();
        let statements = compile(&op).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].sql, "insert into \"t\" default values");
    }

    #[test]
    fn test_update() {
        let op = Update::table("users")
            .set("name", "Bob")
            .where_clause(col("id").eq(7))
            .build();
        let stmt = single(&op);
        assert_eq!(stmt.sql, "update \"users\" set \"name\" = ? where \"id\" = ?");
        assert_eq!(
            stmt.bindings,
            Bindings::Single(vec![SqlValue::Text("Bob".into()), SqlValue::Int(7)])
        );
    }

    #[test]
    fn test_empty_update_rejected() {
        let op = Update::table("t").set_many(record(Vec::<(&str, i64)>::new())).build();
        assert!(matches!(
            compile(&op),
            Err(crate::Error::Compile(CompileError::EmptyUpdate { .. }))
        ));
    }

    #[test]
    fn test_delete() {
        let stmt = single(&table("t").delete().where_clause(col("id").in_list(vec![1, 2])).build());
        assert_eq!(stmt.sql, "delete from \"t\" where \"id\" in (?, ?)");
        assert_eq!(stmt.method, Method::Delete);
    }

    #[test]
    fn test_raw_binding_count() {
        let op = Operation::from(Raw::new("select ?, ?").bind(1));
        assert_eq!(
            compile(&op).unwrap_err(),
            crate::Error::Compile(CompileError::BindingCount {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_raw_with_comment() {
        let op = Operation::from(Raw::new("select 1 -- don't\n, ?").bind(2));
        let stmt = single(&op);
        assert_eq!(stmt.bindings, Bindings::Single(vec![SqlValue::Int(2)]));
    }

    #[test]
    fn test_segments_skip_quoted_regions() {
        assert_eq!(placeholder_count("select '?', \"a?\", $$?$$, $x$ ? $x$, ?"), 1);
        assert_eq!(placeholder_count("select 'it''s ?' , ?? , ?"), 2);
        assert_eq!(placeholder_count("select $1, ?"), 1);
        assert_eq!(placeholder_count("select 1 -- don't ?\n, ?"), 1);
        assert_eq!(placeholder_count("select /* it's /* ? */ ? */ ?, a - -1"), 1);
        assert_eq!(placeholder_count("select 1 -- ?"), 0);
        assert_eq!(
            segments("a \\? b ?"),
            vec![
                Segment::Text("a "),
                Segment::Text("? b "),
                Segment::Value
            ]
        );
    }

    #[test]
    fn test_envelope_per_operation() {
        assert_eq!(Operation::from(Raw::new("select 1")).envelope(), Envelope::Bare);
        assert_eq!(table("t").select_all().build().envelope(), Envelope::Transaction);
    }
}
