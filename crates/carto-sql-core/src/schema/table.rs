//! Table definitions collected inside `create_table` / `alter_table`.

use super::column::{ColumnBuilder, ColumnType};

const DEFAULT_STRING_LENGTH: u32 = 255;
const DEFAULT_PRECISION: u32 = 8;
const DEFAULT_SCALE: u32 = 2;

/// Whether the table is being created or altered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAction {
    Create,
    CreateIfNotExists,
    Alter,
}

/// Collects columns and alterations for one table.
///
/// ```rust
/// use carto_sql_core::schema::SchemaBuilder;
///
/// let schema = SchemaBuilder::new().create_table("places", |t| {
///     t.increments("id");
///     t.string("name").not_nullable();
///     t.boolean("visited").default_to(false);
/// });
/// assert_eq!(schema.created_table(), Some("places"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableBuilder {
    pub(crate) name: String,
    pub(crate) action: TableAction,
    pub(crate) columns: Vec<ColumnBuilder>,
    pub(crate) dropped: Vec<String>,
    pub(crate) renamed: Vec<(String, String)>,
    pub(crate) comment: Option<String>,
}

impl TableBuilder {
    pub(crate) fn new(name: &str, action: TableAction) -> Self {
        Self {
            name: String::from(name),
            action,
            columns: vec![],
            dropped: vec![],
            renamed: vec![],
            comment: None,
        }
    }

    /// Returns the unquoted table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns added so far.
    #[must_use]
    pub fn columns(&self) -> &[ColumnBuilder] {
        &self.columns
    }

    /// Adds a column of any type.
    pub fn column(&mut self, name: &str, column_type: ColumnType) -> &mut ColumnBuilder {
        let index = self.columns.len();
        self.columns.push(ColumnBuilder::new(name, column_type));
        &mut self.columns[index]
    }

    /// `serial primary key`; an empty name defaults to `id`.
    pub fn increments(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Increments)
    }

    /// `bigserial primary key`; an empty name defaults to `id`.
    pub fn big_increments(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::BigIncrements)
    }

    pub fn integer(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Integer)
    }

    pub fn small_int(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::SmallInt)
    }

    pub fn tiny_int(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::TinyInt)
    }

    pub fn medium_int(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::MediumInt)
    }

    pub fn big_integer(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::BigInteger)
    }

    /// `varchar(255)`.
    pub fn string(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::String(DEFAULT_STRING_LENGTH))
    }

    /// `varchar(length)`.
    pub fn string_with_length(&mut self, name: &str, length: u32) -> &mut ColumnBuilder {
        self.column(name, ColumnType::String(length))
    }

    pub fn text(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Text)
    }

    pub fn float(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Float)
    }

    pub fn double(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Double)
    }

    /// `decimal(8, 2)`.
    pub fn decimal(&mut self, name: &str) -> &mut ColumnBuilder {
        self.decimal_with(name, DEFAULT_PRECISION, DEFAULT_SCALE)
    }

    pub fn decimal_with(&mut self, name: &str, precision: u32, scale: u32) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Decimal { precision, scale })
    }

    pub fn binary(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Binary)
    }

    pub fn boolean(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Boolean)
    }

    pub fn date(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Date)
    }

    /// `timestamptz`, or `timestamp` when `without_tz` is set.
    pub fn datetime(&mut self, name: &str, without_tz: bool) -> &mut ColumnBuilder {
        self.column(name, ColumnType::DateTime { without_tz })
    }

    /// `timestamptz`, or `timestamp` when `without_tz` is set.
    pub fn timestamp(&mut self, name: &str, without_tz: bool) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Timestamp { without_tz })
    }

    pub fn time(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Time)
    }

    /// `text check ("name" in (...))`.
    pub fn enumeration(&mut self, name: &str, values: &[&str]) -> &mut ColumnBuilder {
        let values = values.iter().map(|v| String::from(*v)).collect();
        self.column(name, ColumnType::Enumeration(values))
    }

    pub fn json(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Json { binary: false })
    }

    pub fn jsonb(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Json { binary: true })
    }

    pub fn uuid(&mut self, name: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Uuid)
    }

    /// A column whose type is written verbatim, e.g. `geometry(Point, 4326)`.
    pub fn specific_type(&mut self, name: &str, sql_type: &str) -> &mut ColumnBuilder {
        self.column(name, ColumnType::Specific(String::from(sql_type)))
    }

    /// Drops a column (alter only).
    pub fn drop_column(&mut self, name: &str) -> &mut Self {
        self.dropped.push(String::from(name));
        self
    }

    /// Renames a column (alter only).
    pub fn rename_column(&mut self, from: &str, to: &str) -> &mut Self {
        self.renamed.push((String::from(from), String::from(to)));
        self
    }

    /// Attaches a `comment on table` statement.
    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.comment = Some(String::from(text));
        self
    }
}
