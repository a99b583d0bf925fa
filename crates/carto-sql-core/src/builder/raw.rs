//! Raw SQL fragments with positional or named bindings.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::value::{SqlValue, ToSqlValue};
use crate::error::CompileError;

static NAMED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s:(\w+)(:?)").expect("valid named binding regex"));

/// A raw SQL statement or fragment.
///
/// `?` marks a bound value and `??` a bound identifier. A `Raw` bound to a
/// `?` of another statement is spliced in place, bindings included.
///
/// ```rust
/// use carto_sql_core::builder::Raw;
///
/// let raw = Raw::new("select * from ?? where id = ?").bind("users").bind(7);
/// assert_eq!(raw.bindings().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Raw {
    sql: String,
    bindings: Vec<SqlValue>,
}

impl Raw {
    /// Creates a raw statement without bindings.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bindings: vec![],
        }
    }

    /// Creates a raw statement with positional bindings.
    #[must_use]
    pub fn with_bindings(sql: impl Into<String>, bindings: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }

    /// Rewrites `:key` (value) and `:key:` (identifier) placeholders into
    /// positional ones, looking each key up in `values`.
    ///
    /// A placeholder is only recognised after whitespace, so `::` casts are
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingNamedBinding`] when a key has no value.
    pub fn named(sql: &str, values: &BTreeMap<String, SqlValue>) -> Result<Self, CompileError> {
        let mut out = String::with_capacity(sql.len());
        let mut bindings = vec![];
        let mut last = 0;

        for caps in NAMED_RE.captures_iter(sql) {
            let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            // `:a::int` is a value followed by a cast, not an identifier.
            let followed_by_colon = sql[whole.end()..].starts_with(':');
            let identifier = !caps[2].is_empty() && !followed_by_colon;
            let end = if identifier || caps[2].is_empty() {
                whole.end()
            } else {
                whole.end() - 1
            };

            let value = values
                .get(key.as_str())
                .ok_or_else(|| CompileError::MissingNamedBinding(key.as_str().to_string()))?;

            out.push_str(&sql[last..key.start() - 1]);
            out.push_str(if identifier { "??" } else { "?" });
            bindings.push(value.clone());
            last = end;
        }
        out.push_str(&sql[last..]);

        Ok(Self { sql: out, bindings })
    }

    /// Appends a positional binding.
    #[must_use]
    pub fn bind<T: ToSqlValue>(mut self, value: T) -> Self {
        self.bindings.push(value.to_sql_value());
        self
    }

    /// Surrounds the SQL text, e.g. with parentheses for a subquery.
    #[must_use]
    pub fn wrap(mut self, before: &str, after: &str) -> Self {
        self.sql = format!("{before}{}{after}", self.sql);
        self
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the bindings.
    #[must_use]
    pub fn bindings(&self) -> &[SqlValue] {
        &self.bindings
    }

    /// Consumes the statement, returning its SQL and bindings.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.bindings)
    }
}
