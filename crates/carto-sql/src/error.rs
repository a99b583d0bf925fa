//! Error type for the client.

use carto_sql_core::{CompileError, EncodingError};
use thiserror::Error;

/// Errors raised by [`Client`](crate::Client) calls.
///
/// Encoding and compile errors are always returned before a request is sent.
#[derive(Debug, Error)]
pub enum Error {
    /// A value could not be encoded as a literal.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The operation could not be compiled.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The request failed after its retry, or the response body broke off.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("remote error ({status}): {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body as text.
        body: String,
    },

    /// A batch job finished in a state other than `done`.
    #[error("batch job failed: {0}")]
    JobFailed(String),

    /// A response body was not the JSON the endpoint promises.
    #[error("decode error: {0}")]
    Decode(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<carto_sql_core::Error> for Error {
    fn from(err: carto_sql_core::Error) -> Self {
        match err {
            carto_sql_core::Error::Encoding(e) => Self::Encoding(e),
            carto_sql_core::Error::Compile(e) => Self::Compile(e),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
