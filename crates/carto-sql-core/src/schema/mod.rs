//! Schema operations.
//!
//! A [`SchemaBuilder`] records commands in call order; compiling replays the
//! sequence, one or more statements per command.

mod column;
mod compiler;
mod table;

pub use column::{ColumnBuilder, ColumnType, DefaultValue};
pub(crate) use compiler::compile_schema;
pub use table::{TableAction, TableBuilder};

use crate::builder::Raw;
use crate::compiler::Operation;

/// One recorded schema command.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaCommand {
    /// Create or alter a table.
    Table(TableBuilder),
    DropTable {
        name: String,
        if_exists: bool,
    },
    RenameTable {
        from: String,
        to: String,
    },
    CreateSchema {
        name: String,
        if_not_exists: bool,
    },
    DropSchema {
        name: String,
        if_exists: bool,
    },
    CreateExtension {
        name: String,
        if_not_exists: bool,
    },
    DropExtension {
        name: String,
        if_exists: bool,
    },
    /// Query `information_schema.tables`.
    HasTable(String),
    /// Query `information_schema.columns`.
    HasColumn {
        table: String,
        column: String,
    },
    Raw(Raw),
}

/// Records schema commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaBuilder {
    sequence: Vec<SchemaCommand>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, command: SchemaCommand) -> Self {
        self.sequence.push(command);
        self
    }

    fn table_command(self, name: &str, action: TableAction, define: impl FnOnce(&mut TableBuilder)) -> Self {
        let mut table = TableBuilder::new(name, action);
        define(&mut table);
        self.push(SchemaCommand::Table(table))
    }

    /// `create table`.
    #[must_use]
    pub fn create_table(self, name: &str, define: impl FnOnce(&mut TableBuilder)) -> Self {
        self.table_command(name, TableAction::Create, define)
    }

    /// `create table if not exists`.
    #[must_use]
    pub fn create_table_if_not_exists(self, name: &str, define: impl FnOnce(&mut TableBuilder)) -> Self {
        self.table_command(name, TableAction::CreateIfNotExists, define)
    }

    /// `alter table`.
    #[must_use]
    pub fn alter_table(self, name: &str, define: impl FnOnce(&mut TableBuilder)) -> Self {
        self.table_command(name, TableAction::Alter, define)
    }

    /// Alias of [`alter_table`](Self::alter_table).
    #[must_use]
    pub fn table(self, name: &str, define: impl FnOnce(&mut TableBuilder)) -> Self {
        self.alter_table(name, define)
    }

    #[must_use]
    pub fn drop_table(self, name: &str) -> Self {
        self.push(SchemaCommand::DropTable {
            name: String::from(name),
            if_exists: false,
        })
    }

    #[must_use]
    pub fn drop_table_if_exists(self, name: &str) -> Self {
        self.push(SchemaCommand::DropTable {
            name: String::from(name),
            if_exists: true,
        })
    }

    #[must_use]
    pub fn rename_table(self, from: &str, to: &str) -> Self {
        self.push(SchemaCommand::RenameTable {
            from: String::from(from),
            to: String::from(to),
        })
    }

    #[must_use]
    pub fn create_schema(self, name: &str) -> Self {
        self.push(SchemaCommand::CreateSchema {
            name: String::from(name),
            if_not_exists: false,
        })
    }

    #[must_use]
    pub fn create_schema_if_not_exists(self, name: &str) -> Self {
        self.push(SchemaCommand::CreateSchema {
            name: String::from(name),
            if_not_exists: true,
        })
    }

    #[must_use]
    pub fn drop_schema(self, name: &str) -> Self {
        self.push(SchemaCommand::DropSchema {
            name: String::from(name),
            if_exists: false,
        })
    }

    #[must_use]
    pub fn drop_schema_if_exists(self, name: &str) -> Self {
        self.push(SchemaCommand::DropSchema {
            name: String::from(name),
            if_exists: true,
        })
    }

    #[must_use]
    pub fn create_extension(self, name: &str) -> Self {
        self.push(SchemaCommand::CreateExtension {
            name: String::from(name),
            if_not_exists: false,
        })
    }

    #[must_use]
    pub fn create_extension_if_not_exists(self, name: &str) -> Self {
        self.push(SchemaCommand::CreateExtension {
            name: String::from(name),
            if_not_exists: true,
        })
    }

    #[must_use]
    pub fn drop_extension(self, name: &str) -> Self {
        self.push(SchemaCommand::DropExtension {
            name: String::from(name),
            if_exists: false,
        })
    }

    #[must_use]
    pub fn drop_extension_if_exists(self, name: &str) -> Self {
        self.push(SchemaCommand::DropExtension {
            name: String::from(name),
            if_exists: true,
        })
    }

    /// Checks whether a table exists; the rows returned answer the question.
    #[must_use]
    pub fn has_table(self, name: &str) -> Self {
        self.push(SchemaCommand::HasTable(String::from(name)))
    }

    /// Checks whether a column exists.
    #[must_use]
    pub fn has_column(self, table: &str, column: &str) -> Self {
        self.push(SchemaCommand::HasColumn {
            table: String::from(table),
            column: String::from(column),
        })
    }

    /// Appends a raw statement.
    #[must_use]
    pub fn raw(self, raw: Raw) -> Self {
        self.push(SchemaCommand::Raw(raw))
    }

    /// Returns the recorded commands.
    #[must_use]
    pub fn commands(&self) -> &[SchemaCommand] {
        &self.sequence
    }

    /// The last table created with [`create_table`](Self::create_table).
    ///
    /// The client finalizes it as a spatial table once the operation
    /// succeeds.
    #[must_use]
    pub fn created_table(&self) -> Option<&str> {
        self.sequence.iter().rev().find_map(|command| match command {
            SchemaCommand::Table(t) if t.action == TableAction::Create => Some(t.name()),
            _ => None,
        })
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Operation {
        Operation::Schema(self)
    }
}

impl From<SchemaBuilder> for Operation {
    fn from(schema: SchemaBuilder) -> Self {
        schema.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_recorded_in_order() {
        let schema = SchemaBuilder::new()
            .create_schema_if_not_exists("s")
            .drop_table("a")
            .table("b", |t| {
                t.drop_column("c");
            });
        assert_eq!(schema.commands().len(), 3);
        assert!(matches!(
            &schema.commands()[2],
            SchemaCommand::Table(t) if t.action == TableAction::Alter
        ));
    }

    #[test]
    fn test_created_table_is_last_create() {
        let schema = SchemaBuilder::new()
            .create_table("first", |t| {
                t.increments("id");
            })
            .create_table_if_not_exists("maybe", |t| {
                t.increments("id");
            })
            .create_table("second", |t| {
                t.text("x");
            })
            .alter_table("third", |t| {
                t.text("y");
            });
        assert_eq!(schema.created_table(), Some("second"));
        assert_eq!(SchemaBuilder::new().drop_table("t").created_table(), None);
    }
}
