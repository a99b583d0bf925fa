//! Error types for encoding and compiling statements.
//!
//! Both kinds are raised before any network call is made.

use thiserror::Error;

/// A value could not be turned into a SQL literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// NaN and the infinities have no numeric literal.
    #[error("cannot encode non-finite number {0}")]
    NonFiniteNumber(String),

    /// Timezone string is neither `local`, `Z`, nor a `+HH:MM` offset.
    #[error("invalid timezone '{0}'")]
    InvalidTimeZone(String),

    /// A nested raw statement only makes sense spliced into a placeholder.
    #[error("nested raw statement cannot be encoded as a standalone literal")]
    NestedRaw,
}

/// A builder state could not be lowered to SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// INSERT without any rows.
    #[error("insert into '{table}' has no values")]
    EmptyInsert {
        /// Target table.
        table: String,
    },

    /// UPDATE without any assignments.
    #[error("update of '{table}' has no assignments")]
    EmptyUpdate {
        /// Target table.
        table: String,
    },

    /// Number of placeholders and bindings disagree.
    #[error("expected {expected} bindings, saw {actual}")]
    BindingCount {
        /// Number of bindings supplied.
        expected: usize,
        /// Number of placeholders found.
        actual: usize,
    },

    /// A `:name` placeholder has no value.
    #[error("no value bound for named placeholder ':{0}'")]
    MissingNamedBinding(String),

    /// An identifier placeholder (`??`) was bound to something other than text.
    #[error("identifier binding must be text, got {0}")]
    InvalidIdentifier(&'static str),

    /// Only auto-increment columns may omit their name.
    #[error("no column name specified for the {0} column")]
    MissingColumnName(&'static str),
}

/// Any failure raised while turning an operation into executable SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Value encoding failed.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Statement compilation failed.
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Result type for compilation and materialization.
pub type Result<T> = std::result::Result<T, Error>;
