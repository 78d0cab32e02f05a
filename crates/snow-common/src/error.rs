//! Error types for identifiers shared across crates.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised while interpreting shared identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommonError {
    #[error("Unknown data source: {0}")]
    UnknownDataSource(String),

    #[error("Data source '{0}' has no ingest of its own")]
    NotRunnable(String),
}
