//! Identifier and DDL literal quoting.

use std::sync::LazyLock;

use regex::Regex;

static SUBSCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)((?:\[[0-9]+\])+)$").expect("valid subscript regex"));

/// Quotes an identifier with double quotes, doubling embedded quotes.
///
/// `*` passes through and trailing array subscripts stay outside the quotes:
///
/// ```rust
/// use carto_sql_core::quote_identifier;
///
/// assert_eq!(quote_identifier("name"), "\"name\"");
/// assert_eq!(quote_identifier("tags[0]"), "\"tags\"[0]");
/// assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
/// ```
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    if name == "*" {
        return String::from("*");
    }
    if let Some(caps) = SUBSCRIPT_RE.captures(name) {
        let base = caps.get(1).map_or("", |m| m.as_str());
        if !base.is_empty() {
            return format!("{}{}", quote_identifier(base), &caps[2]);
        }
    }
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes a possibly qualified reference such as `schema.table` or
/// `alias.column`, one segment at a time.
#[must_use]
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Single-quotes a literal for DDL text, doubling embedded quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
