//! DELETE statement builder.

use super::expr::ExprBuilder;
use crate::compiler::Operation;

/// The collected state of a DELETE.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    pub(crate) table: String,
    pub(crate) where_clause: Option<ExprBuilder>,
}

impl DeleteQuery {
    /// Returns the unquoted target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns true if a WHERE clause is specified.
    #[must_use]
    pub const fn has_where_clause(&self) -> bool {
        self.where_clause.is_some()
    }
}

/// A DELETE statement builder.
///
/// **Warning**: without a WHERE clause every row of the table is deleted.
pub struct Delete {
    query: DeleteQuery,
}

impl Delete {
    /// Starts a delete from `table`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from(table: &str) -> Self {
        Self {
            query: DeleteQuery {
                table: String::from(table),
                where_clause: None,
            },
        }
    }

    /// Sets the WHERE clause.
    #[must_use]
    pub fn where_clause(mut self, expr: ExprBuilder) -> Self {
        self.query.where_clause = Some(expr);
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Operation {
        Operation::Delete(self.query)
    }
}

impl From<Delete> for Operation {
    fn from(delete: Delete) -> Self {
        delete.build()
    }
}
