#![allow(dead_code)]

use carto_sql_core::{compile, materialize_all, CompiledStatement, Envelope, Operation, TimeZone};

pub fn compiled(op: &Operation) -> Vec<CompiledStatement> {
    compile(op).unwrap_or_else(|e| panic!("Failed to compile: {op:?}\nError: {e:?}"))
}

/// Compiles and materializes with the envelope the operation asks for.
pub fn to_sql(op: &Operation) -> String {
    materialize_all(&compiled(op), TimeZone::utc(), op.envelope())
        .unwrap_or_else(|e| panic!("Failed to materialize: {op:?}\nError: {e:?}"))
}

pub fn to_bare_sql(op: &Operation) -> String {
    materialize_all(&compiled(op), TimeZone::utc(), Envelope::Bare)
        .unwrap_or_else(|e| panic!("Failed to materialize: {op:?}\nError: {e:?}"))
}

/// Reads one dollar-quoted literal from the start of `sql` the way the
/// server does: the opening tag, then everything up to the first occurrence
/// of the same tag. Returns the body and whatever follows the closing tag.
pub fn read_dollar_quoted(sql: &str) -> Option<(&str, &str)> {
    let rest = sql.strip_prefix('$')?;
    let tag_len = rest.find('$')?;
    let tag_body = &rest[..tag_len];
    if !tag_body
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        || tag_body.starts_with(|c: char| c.is_ascii_digit())
    {
        return None;
    }
    let tag = &sql[..tag_len + 2];
    let after_open = &sql[tag.len()..];
    let close = after_open.find(tag)?;
    Some((&after_open[..close], &after_open[close + tag.len()..]))
}

/// The literals passed to each `EXECUTE` of a prepared block, one string per
/// row.
pub fn execute_args(sql: &str) -> Vec<&str> {
    sql.lines()
        .filter(|line| line.starts_with("EXECUTE "))
        .filter_map(|line| {
            let open = line.find('(')?;
            line.get(open + 1..line.len() - 2)
        })
        .collect()
}
