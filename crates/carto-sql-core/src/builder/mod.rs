//! Fluent builders for the operations the client can run.
//!
//! Builders only collect state. Turning them into SQL is the job of
//! [`crate::compile`], and turning compiled SQL into a literal string the job
//! of [`crate::materialize`].
//!
//! # Example
//!
//! ```rust
//! use carto_sql_core::builder::{col, table};
//! use carto_sql_core::{compile, materialize_all, Envelope, TimeZone};
//!
//! let op = table("t").select(&["a"]).where_clause(col("b").eq(true)).build();
//! let statements = compile(&op).unwrap();
//! let sql = materialize_all(&statements, TimeZone::Local, Envelope::Transaction).unwrap();
//!
//! assert!(sql.contains("EXECUTE"));
//! assert!(sql.contains("(true);"));
//! ```

mod delete;
mod expr;
mod insert;
mod raw;
mod select;
mod update;
pub mod value;

pub use delete::{Delete, DeleteQuery};
pub use expr::{col, Column, ExprBuilder};
pub use insert::{record, HasValues, Insert, InsertQuery, NoValues, Record};
pub use raw::Raw;
pub use select::{HasColumns, HasFrom, JoinKind, NoColumns, NoFrom, Order, Select, SelectQuery};
pub use update::{HasSet, NoSet, Update, UpdateQuery};
pub use value::{Geometry, GeometryKind, SqlValue, ToSqlValue};

/// Entry point for operations on one table.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
}

/// Starts an operation on `name`.
#[must_use]
pub fn table(name: &str) -> Table {
    Table {
        name: String::from(name),
    }
}

/// Starts a raw statement.
#[must_use]
pub fn raw(sql: impl Into<String>) -> Raw {
    Raw::new(sql)
}

impl Table {
    /// Returns the unquoted table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `select <cols> from <table>`.
    #[must_use]
    pub fn select(&self, cols: &[&str]) -> Select<HasColumns, HasFrom> {
        Select::new().columns(cols).from(&self.name)
    }

    /// `select * from <table>`.
    #[must_use]
    pub fn select_all(&self) -> Select<HasColumns, HasFrom> {
        Select::new().all().from(&self.name)
    }

    /// `select count(*) from <table>`.
    #[must_use]
    pub fn count(&self) -> Select<HasColumns, HasFrom> {
        Select::new().count().from(&self.name)
    }

    /// Inserts one row.
    #[must_use]
    pub fn insert(&self, row: Record) -> Insert<HasValues> {
        Insert::into_table(&self.name).row(row)
    }

    /// Inserts several rows with one statement.
    #[must_use]
    pub fn insert_many<I: IntoIterator<Item = Record>>(&self, rows: I) -> Insert<HasValues> {
        Insert::into_table(&self.name).rows(rows)
    }

    /// Starts an update.
    #[must_use]
    pub fn update(&self) -> Update<NoSet> {
        Update::table(&self.name)
    }

    /// Starts a delete.
    #[must_use]
    pub fn delete(&self) -> Delete {
        Delete::from(&self.name)
    }
}
