//! Column definitions for `create table` and `alter table`.

use serde_json::Value;

use crate::builder::Raw;

/// A column type and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    /// `serial primary key`.
    Increments,
    /// `bigserial primary key`.
    BigIncrements,
    Integer,
    SmallInt,
    /// Stored as `smallint`.
    TinyInt,
    /// Stored as `integer`.
    MediumInt,
    BigInteger,
    /// `varchar(n)`.
    String(u32),
    Text,
    /// `real`.
    Float,
    /// `double precision`.
    Double,
    Decimal {
        precision: u32,
        scale: u32,
    },
    /// `bytea`.
    Binary,
    Boolean,
    Date,
    DateTime {
        without_tz: bool,
    },
    Timestamp {
        without_tz: bool,
    },
    Time,
    /// `text` restricted by a check constraint to the listed values.
    Enumeration(Vec<String>),
    Json {
        binary: bool,
    },
    Uuid,
    /// A type name passed through verbatim.
    Specific(String),
}

impl ColumnType {
    /// Auto-increment columns carry their own constraints and ignore modifiers.
    #[must_use]
    pub const fn is_increments(&self) -> bool {
        matches!(self, Self::Increments | Self::BigIncrements)
    }

    /// Name used in error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Increments => "increments",
            Self::BigIncrements => "big_increments",
            Self::Integer => "integer",
            Self::SmallInt => "small_int",
            Self::TinyInt => "tiny_int",
            Self::MediumInt => "medium_int",
            Self::BigInteger => "big_integer",
            Self::String(_) => "string",
            Self::Text => "text",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal { .. } => "decimal",
            Self::Binary => "binary",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime { .. } => "datetime",
            Self::Timestamp { .. } => "timestamp",
            Self::Time => "time",
            Self::Enumeration(_) => "enumeration",
            Self::Json { .. } => "json",
            Self::Uuid => "uuid",
            Self::Specific(_) => "specific_type",
        }
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// `default null`.
    Null,
    /// Rendered as `'1'` or `'0'`.
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Rendered as quoted JSON text.
    Json(Value),
    /// SQL expression such as `now()`, spliced as written.
    Raw(Raw),
}

impl From<bool> for DefaultValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for DefaultValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for DefaultValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for DefaultValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for DefaultValue {
    fn from(s: &str) -> Self {
        Self::String(String::from(s))
    }
}

impl From<String> for DefaultValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Value> for DefaultValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::Null,
            other => Self::Json(other),
        }
    }
}

impl From<Raw> for DefaultValue {
    fn from(raw: Raw) -> Self {
        Self::Raw(raw)
    }
}

/// One column of a table definition.
///
/// Obtained from the column methods of
/// [`TableBuilder`](super::table::TableBuilder); modifiers chain on the
/// returned reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBuilder {
    pub(crate) name: String,
    pub(crate) column_type: ColumnType,
    pub(crate) nullable: Option<bool>,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) comment: Option<String>,
}

impl ColumnBuilder {
    /// Creates a column with no modifiers.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: None,
            default: None,
            comment: None,
        }
    }

    /// Emits `null`.
    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = Some(true);
        self
    }

    /// Emits `not null`.
    pub fn not_nullable(&mut self) -> &mut Self {
        self.nullable = Some(false);
        self
    }

    /// Sets the column default.
    pub fn default_to(&mut self, value: impl Into<DefaultValue>) -> &mut Self {
        self.default = Some(value.into());
        self
    }

    /// Attaches a `comment on column` statement.
    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.comment = Some(String::from(text));
        self
    }

    /// Returns the column name, which may be empty for increments.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column type.
    #[must_use]
    pub const fn column_type(&self) -> &ColumnType {
        &self.column_type
    }
}
