//! # carto-sql
//!
//! Async client for SQL-over-HTTP endpoints that take one literal SQL string
//! per request.
//!
//! Operations are built with [`carto_sql_core`], compiled to literal SQL
//! before any I/O, and sent by a [`Client`] which can
//!
//! - collect or stream the rows of a result ([`Client::query`],
//!   [`Client::stream`]);
//! - submit a batch job and poll it to completion ([`Client::execute`] with
//!   [`ExecOptions::batch`]);
//! - load a stream of features with bounded concurrency
//!   ([`Client::bulk_insert`]).
//!
//! ```rust,no_run
//! use carto_sql_core::builder::{col, table};
//! use carto_sql::{Client, ClientConfig};
//!
//! # async fn run() -> carto_sql::Result<()> {
//! let client = Client::new(ClientConfig::for_user("acme", "api-key"))?;
//! let rows = client
//!     .query(table("places").select(&["name"]).where_clause(col("visited").eq(true)))
//!     .await?;
//! println!("{} places visited", rows.len());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod bulk;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod transport;

pub use batch::{JobStatus, JobSummary};
pub use bulk::{features_from_geojson, BulkOptions, BulkSummary, Feature};
pub use client::{Client, ExecOptions, Execution};
pub use config::ClientConfig;
pub use decode::{Row, RowScanner, RowStream};
pub use error::{Error, Result};
pub use transport::{SqlResponse, Transport};
