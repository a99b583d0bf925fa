//! # carto-sql-core
//!
//! Compiles builder operations into literal, injection-safe SQL for
//! endpoints that take one opaque SQL string per request and offer no
//! parameter binding.
//!
//! The pipeline has three stages, none of which performs I/O:
//!
//! 1. a [`builder`] collects an [`Operation`];
//! 2. [`compile`] lowers it to [`CompiledStatement`]s carrying `?`/`??`
//!    placeholders and typed values;
//! 3. [`materialize_all`] renders the values as literals, wrapping anything
//!    with values in a `PREPARE`/`EXECUTE`/`DEALLOCATE` block.
//!
//! ## SQL Injection Prevention
//!
//! Strings are dollar-quoted with a tag negotiated against their content and
//! identifiers are always double-quoted:
//!
//! ```rust
//! use carto_sql_core::builder::{col, table};
//! use carto_sql_core::{compile, materialize_all, Envelope, TimeZone};
//!
//! let user_input = "'; DROP TABLE users; --";
//! let op = table("users").select(&["id"]).where_clause(col("name").eq(user_input)).build();
//! let sql = materialize_all(&compile(&op).unwrap(), TimeZone::Local, Envelope::Bare).unwrap();
//!
//! assert!(sql.contains("($cartodb$'; DROP TABLE users; --$cartodb$);"));
//! ```

pub mod builder;
pub mod compiler;
pub mod encode;
pub mod error;
pub mod ident;
pub mod materialize;
pub mod schema;

pub use builder::{col, raw, table, Geometry, Raw, SqlValue, ToSqlValue};
pub use compiler::{compile, Bindings, CompiledStatement, Method, Operation};
pub use encode::{encode, TimeZone};
pub use error::{CompileError, EncodingError, Error, Result};
pub use ident::quote_identifier;
pub use materialize::{materialize, materialize_all, Envelope};
pub use schema::SchemaBuilder;
