//! SELECT statement builder using the typestate pattern.
//!
//! `build()` is only reachable once both the projection and the source table
//! are known; clauses that need a source are only offered after `from()`.

use std::marker::PhantomData;

use super::expr::{col, ExprBuilder};
use super::raw::Raw;
use crate::compiler::Operation;
use crate::ident::{quote_identifier, quote_qualified};

// Typestate markers (zero-sized types)

/// Marker: No columns specified yet.
pub struct NoColumns;
/// Marker: Columns have been specified.
pub struct HasColumns;
/// Marker: No FROM clause specified yet.
pub struct NoFrom;
/// Marker: FROM clause has been specified.
pub struct HasFrom;

/// Sort direction of an ORDER BY term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Join flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "inner join",
            Self::Left => "left join",
            Self::Right => "right join",
        }
    }
}

/// The collected state of a SELECT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub(crate) distinct: bool,
    pub(crate) columns: Vec<ExprBuilder>,
    pub(crate) from: String,
    pub(crate) joins: Vec<String>,
    pub(crate) where_clause: Option<ExprBuilder>,
    pub(crate) group_by: Vec<String>,
    pub(crate) having: Option<ExprBuilder>,
    pub(crate) order_by: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
}

impl SelectQuery {
    /// Returns the unquoted source table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.from
    }
}

/// A SELECT statement builder.
///
/// ```rust
/// use carto_sql_core::builder::{col, Select};
///
/// let op = Select::new()
///     .columns(&["id", "name"])
///     .from("users")
///     .where_clause(col("active").eq(true))
///     .build();
/// ```
pub struct Select<Cols, From> {
    query: SelectQuery,
    _state: PhantomData<(Cols, From)>,
}

impl Select<NoColumns, NoFrom> {
    /// Creates a new SELECT builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            query: SelectQuery::default(),
            _state: PhantomData,
        }
    }
}

impl Default for Select<NoColumns, NoFrom> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Cols, From> Select<Cols, From> {
    fn transition<C, F>(self) -> Select<C, F> {
        Select {
            query: self.query,
            _state: PhantomData,
        }
    }
}

// Transition: NoColumns -> HasColumns
impl<From> Select<NoColumns, From> {
    /// Specifies the columns to select.
    #[must_use]
    pub fn columns(mut self, cols: &[&str]) -> Select<HasColumns, From> {
        self.query.columns = cols.iter().map(|c| ExprBuilder::column(c)).collect();
        self.transition()
    }

    /// Selects all columns (*).
    #[must_use]
    pub fn all(mut self) -> Select<HasColumns, From> {
        self.query.columns = vec![ExprBuilder::raw(Raw::new("*"))];
        self.transition()
    }

    /// Selects `count(*)`.
    #[must_use]
    pub fn count(mut self) -> Select<HasColumns, From> {
        self.query.columns = vec![ExprBuilder::raw(Raw::new("count(*)"))];
        self.transition()
    }

    /// Selects `count("column")`.
    #[must_use]
    pub fn count_column(mut self, column: &str) -> Select<HasColumns, From> {
        let sql = format!("count({})", quote_qualified(column));
        self.query.columns = vec![ExprBuilder::raw(Raw::new(sql))];
        self.transition()
    }

    /// Selects a raw expression, keeping its bindings.
    #[must_use]
    pub fn column_raw(mut self, raw: Raw) -> Select<HasColumns, From> {
        self.query.columns = vec![ExprBuilder::raw(raw)];
        self.transition()
    }
}

// Methods available with columns
impl<From> Select<HasColumns, From> {
    /// Adds another column.
    #[must_use]
    pub fn column(mut self, name: &str) -> Self {
        self.query.columns.push(ExprBuilder::column(name));
        self
    }

    /// Adds another raw expression.
    #[must_use]
    pub fn and_column_raw(mut self, raw: Raw) -> Self {
        self.query.columns.push(ExprBuilder::raw(raw));
        self
    }

    /// Sets DISTINCT.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.query.distinct = true;
        self
    }
}

// Transition: NoFrom -> HasFrom
impl<Cols> Select<Cols, NoFrom> {
    /// Specifies the table to select from.
    #[must_use]
    pub fn from(mut self, table: &str) -> Select<Cols, HasFrom> {
        self.query.from = String::from(table);
        self.transition()
    }
}

// Methods available after FROM
impl<Cols> Select<Cols, HasFrom> {
    /// Sets the WHERE clause, replacing any previous one.
    #[must_use]
    pub fn where_clause(mut self, expr: ExprBuilder) -> Self {
        self.query.where_clause = Some(expr);
        self
    }

    /// ANDs a predicate onto the WHERE clause.
    #[must_use]
    pub fn and_where(mut self, expr: ExprBuilder) -> Self {
        self.query.where_clause = Some(match self.query.where_clause.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// ORs a predicate onto the WHERE clause.
    #[must_use]
    pub fn or_where(mut self, expr: ExprBuilder) -> Self {
        self.query.where_clause = Some(match self.query.where_clause.take() {
            Some(existing) => existing.or(expr),
            None => expr,
        });
        self
    }

    fn push_join(mut self, kind: JoinKind, table: &str, left: &str, right: &str) -> Self {
        let on = col(left).eq_col(col(right));
        self.query.joins.push(format!(
            "{} {} on {}",
            kind.as_sql(),
            quote_identifier(table),
            on.sql()
        ));
        self
    }

    /// Adds an INNER JOIN on `left = right`.
    #[must_use]
    pub fn join(self, table: &str, left: &str, right: &str) -> Self {
        self.push_join(JoinKind::Inner, table, left, right)
    }

    /// Adds a LEFT JOIN on `left = right`.
    #[must_use]
    pub fn left_join(self, table: &str, left: &str, right: &str) -> Self {
        self.push_join(JoinKind::Left, table, left, right)
    }

    /// Adds a RIGHT JOIN on `left = right`.
    #[must_use]
    pub fn right_join(self, table: &str, left: &str, right: &str) -> Self {
        self.push_join(JoinKind::Right, table, left, right)
    }
}

impl Select<HasColumns, HasFrom> {
    /// Adds a GROUP BY clause.
    #[must_use]
    pub fn group_by(mut self, cols: &[&str]) -> Self {
        self.query.group_by = cols.iter().map(|c| quote_qualified(c)).collect();
        self
    }

    /// Adds a HAVING clause.
    #[must_use]
    pub fn having(mut self, expr: ExprBuilder) -> Self {
        self.query.having = Some(expr);
        self
    }

    /// Appends an ORDER BY term.
    #[must_use]
    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.query
            .order_by
            .push(format!("{} {}", quote_qualified(column), order.as_sql()));
        self
    }

    /// Adds a LIMIT clause.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.query.limit = Some(n);
        self
    }

    /// Adds an OFFSET clause.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.query.offset = Some(n);
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Operation {
        Operation::Select(self.query)
    }
}

impl From<Select<HasColumns, HasFrom>> for Operation {
    fn from(select: Select<HasColumns, HasFrom>) -> Self {
        select.build()
    }
}
