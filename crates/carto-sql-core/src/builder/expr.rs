//! Predicate expression builder.
//!
//! Identifiers are quoted as the expression is built; values become `?`
//! placeholders carried alongside the SQL text in order. Every predicate is
//! available on a bare [`Column`] as well as on an [`ExprBuilder`], so
//! `col("a").eq(1)` and `ExprBuilder::column("a").eq(1)` build the same thing.

use super::raw::Raw;
use super::value::{SqlValue, ToSqlValue};
use crate::ident::{quote_identifier, quote_qualified};

/// Creates a column reference. Dotted names are quoted segment by segment.
#[must_use]
pub fn col(name: &str) -> Column {
    Column {
        table: None,
        name: String::from(name),
    }
}

/// A column reference, optionally with an explicit table.
#[derive(Debug, Clone)]
pub struct Column {
    pub table: Option<String>,
    pub name: String,
}

/// Emits the shared predicate methods; `self` must convert into an
/// [`ExprBuilder`].
macro_rules! predicates {
    () => {
        predicates! {
            eq => "=",
            not_eq => "!=",
            lt => "<",
            lt_eq => "<=",
            gt => ">",
            gt_eq => ">=",
            like => "like",
            not_like => "not like",
            ilike => "ilike",
        }

        #[must_use]
        pub fn is_null(self) -> ExprBuilder {
            ExprBuilder::from(self).suffixed("is null")
        }

        #[must_use]
        pub fn is_not_null(self) -> ExprBuilder {
            ExprBuilder::from(self).suffixed("is not null")
        }

        /// `between ? and ?`, bounds inclusive.
        #[must_use]
        pub fn between<T: ToSqlValue, U: ToSqlValue>(self, low: T, high: U) -> ExprBuilder {
            ExprBuilder::from(self).range("between", low.to_sql_value(), high.to_sql_value())
        }

        #[must_use]
        pub fn not_between<T: ToSqlValue, U: ToSqlValue>(self, low: T, high: U) -> ExprBuilder {
            ExprBuilder::from(self).range("not between", low.to_sql_value(), high.to_sql_value())
        }

        /// An empty list matches no row.
        #[must_use]
        pub fn in_list<T: ToSqlValue>(self, values: Vec<T>) -> ExprBuilder {
            ExprBuilder::from(self).membership(values, false)
        }

        /// An empty list matches every row.
        #[must_use]
        pub fn not_in_list<T: ToSqlValue>(self, values: Vec<T>) -> ExprBuilder {
            ExprBuilder::from(self).membership(values, true)
        }
    };
    ($($method:ident => $op:literal,)*) => {
        $(
            #[doc = concat!("`<expr> ", $op, " ?`")]
            #[must_use]
            pub fn $method<T: ToSqlValue>(self, value: T) -> ExprBuilder {
                ExprBuilder::from(self).infix($op, ExprBuilder::from(value.to_sql_value()))
            }
        )*
    };
}

impl Column {
    #[must_use]
    pub fn qualified(table: &str, name: &str) -> Self {
        Self {
            table: Some(String::from(table)),
            name: String::from(name),
        }
    }

    /// The quoted reference.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match &self.table {
            Some(t) => format!("{}.{}", quote_identifier(t), quote_identifier(&self.name)),
            None => quote_qualified(&self.name),
        }
    }

    /// Column-to-column equality, as in a join condition.
    #[must_use]
    pub fn eq_col(self, other: Self) -> ExprBuilder {
        ExprBuilder::from(self).infix("=", other.into())
    }

    predicates!();
}

/// A SQL fragment with the values bound to its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprBuilder {
    sql: String,
    params: Vec<SqlValue>,
}

impl ExprBuilder {
    /// A raw fragment; its bindings are kept in place.
    #[must_use]
    pub fn raw(raw: Raw) -> Self {
        let (sql, params) = raw.into_parts();
        Self { sql, params }
    }

    #[must_use]
    pub fn column(name: &str) -> Self {
        col(name).into()
    }

    #[must_use]
    pub fn value<T: ToSqlValue>(value: T) -> Self {
        value.to_sql_value().into()
    }

    fn infix(mut self, op: &str, right: Self) -> Self {
        self.sql = format!("{} {op} {}", self.sql, right.sql);
        self.params.extend(right.params);
        self
    }

    fn suffixed(mut self, op: &str) -> Self {
        self.sql.push(' ');
        self.sql.push_str(op);
        self
    }

    fn range(mut self, keyword: &str, low: SqlValue, high: SqlValue) -> Self {
        self.sql = format!("{} {keyword} ? and ?", self.sql);
        self.params.extend([low, high]);
        self
    }

    fn membership<T: ToSqlValue>(mut self, values: Vec<T>, negated: bool) -> Self {
        // `in ()` is a syntax error.
        if values.is_empty() {
            return Self {
                sql: String::from(if negated { "1 = 1" } else { "1 = 0" }),
                params: vec![],
            };
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let keyword = if negated { "not in" } else { "in" };
        self.sql = format!("{} {keyword} ({placeholders})", self.sql);
        self.params
            .extend(values.into_iter().map(ToSqlValue::to_sql_value));
        self
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.infix("and", other)
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.infix("or", other)
    }

    /// Parenthesizes the expression.
    #[must_use]
    pub fn paren(mut self) -> Self {
        self.sql = format!("({})", self.sql);
        self
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(mut self) -> Self {
        self.sql.insert_str(0, "not ");
        self
    }

    predicates!();

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Splits the expression into SQL text and values.
    #[must_use]
    pub fn build(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}

impl From<Column> for ExprBuilder {
    fn from(col: Column) -> Self {
        Self {
            sql: col.to_sql(),
            params: vec![],
        }
    }
}

impl From<SqlValue> for ExprBuilder {
    fn from(value: SqlValue) -> Self {
        Self {
            sql: String::from("?"),
            params: vec![value],
        }
    }
}

impl From<Raw> for ExprBuilder {
    fn from(raw: Raw) -> Self {
        Self::raw(raw)
    }
}
