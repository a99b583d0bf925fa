//! UPDATE statement builder using the typestate pattern.

use std::marker::PhantomData;

use super::expr::ExprBuilder;
use super::insert::Record;
use super::value::{SqlValue, ToSqlValue};
use crate::compiler::Operation;

// Typestate markers

/// Marker: No SET clause specified yet.
pub struct NoSet;
/// Marker: SET clause has been specified.
pub struct HasSet;

/// The collected state of an UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    pub(crate) table: String,
    pub(crate) assignments: Vec<(String, SqlValue)>,
    pub(crate) where_clause: Option<ExprBuilder>,
}

impl UpdateQuery {
    /// Returns the unquoted target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

/// An UPDATE statement builder.
pub struct Update<Set> {
    query: UpdateQuery,
    _state: PhantomData<Set>,
}

impl Update<NoSet> {
    /// Starts an update of `table`.
    #[must_use]
    pub fn table(table: &str) -> Self {
        Self {
            query: UpdateQuery {
                table: String::from(table),
                assignments: vec![],
                where_clause: None,
            },
            _state: PhantomData,
        }
    }
}

impl<Set> Update<Set> {
    /// Adds a SET assignment.
    #[must_use]
    pub fn set<T: ToSqlValue>(mut self, column: &str, value: T) -> Update<HasSet> {
        self.query
            .assignments
            .push((String::from(column), value.to_sql_value()));
        Update {
            query: self.query,
            _state: PhantomData,
        }
    }

    /// Adds one assignment per record entry, in column order.
    #[must_use]
    pub fn set_many(mut self, values: Record) -> Update<HasSet> {
        self.query.assignments.extend(values);
        Update {
            query: self.query,
            _state: PhantomData,
        }
    }

    /// Sets the WHERE clause.
    #[must_use]
    pub fn where_clause(mut self, expr: ExprBuilder) -> Self {
        self.query.where_clause = Some(expr);
        self
    }
}

impl Update<HasSet> {
    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Operation {
        Operation::Update(self.query)
    }
}

impl From<Update<HasSet>> for Operation {
    fn from(update: Update<HasSet>) -> Self {
        update.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{col, record};

    #[test]
    fn test_assignments_in_call_order() {
        let op = Update::table("users")
            .set("name", "Bob")
            .set("age", 30_i32)
            .where_clause(col("id").eq(1))
            .build();
        let Operation::Update(q) = op else {
            panic!("expected update");
        };
        let columns: Vec<&str> = q.assignments.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(columns, vec!["name", "age"]);
        assert!(q.where_clause.is_some());
    }

    #[test]
    fn test_set_many() {
        let op = Update::table("t").set_many(record([("b", 1_i64), ("a", 2_i64)])).build();
        let Operation::Update(q) = op else {
            panic!("expected update");
        };
        assert_eq!(q.assignments[0], (String::from("a"), SqlValue::Int(2)));
    }
}
