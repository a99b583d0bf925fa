//! INSERT statement builder using the typestate pattern.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use super::value::{SqlValue, ToSqlValue};
use crate::compiler::Operation;

/// One row of an insert, keyed by column name.
pub type Record = BTreeMap<String, SqlValue>;

/// Builds a [`Record`] from `(column, value)` pairs.
pub fn record<K, V, I>(pairs: I) -> Record
where
    K: Into<String>,
    V: ToSqlValue,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_sql_value()))
        .collect()
}

// Typestate markers

/// Marker: No rows specified yet.
pub struct NoValues;
/// Marker: Rows have been specified.
pub struct HasValues;

/// The collected state of an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    pub(crate) table: String,
    pub(crate) rows: Vec<Record>,
}

impl InsertQuery {
    /// Returns the unquoted target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the rows to insert.
    #[must_use]
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }
}

/// An INSERT statement builder.
///
/// Rows may name different columns; the statement covers their union and
/// missing cells are inserted as NULL.
///
/// ```rust
/// use carto_sql_core::builder::{record, Insert};
///
/// let op = Insert::into_table("places")
///     .row(record([("name", "home")]))
///     .row(record([("name", "work")]))
///     .build();
/// ```
pub struct Insert<Values> {
    query: InsertQuery,
    _state: PhantomData<Values>,
}

impl Insert<NoValues> {
    /// Starts an insert into `table`.
    #[must_use]
    pub fn into_table(table: &str) -> Self {
        Self {
            query: InsertQuery {
                table: String::from(table),
                rows: vec![],
            },
            _state: PhantomData,
        }
    }
}

impl<Values> Insert<Values> {
    /// Adds a row.
    #[must_use]
    pub fn row(mut self, row: Record) -> Insert<HasValues> {
        self.query.rows.push(row);
        Insert {
            query: self.query,
            _state: PhantomData,
        }
    }

    /// Adds several rows. An empty iterator still counts as "values given";
    /// compiling such an insert fails instead.
    #[must_use]
    pub fn rows<I: IntoIterator<Item = Record>>(mut self, rows: I) -> Insert<HasValues> {
        self.query.rows.extend(rows);
        Insert {
            query: self.query,
            _state: PhantomData,
        }
    }
}

impl Insert<HasValues> {
    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Operation {
        Operation::Insert(self.query)
    }
}

impl From<Insert<HasValues>> for Operation {
    fn from(insert: Insert<HasValues>) -> Self {
        insert.build()
    }
}
