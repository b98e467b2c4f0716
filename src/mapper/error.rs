//! Error types for the mapper core

use thiserror::Error;

use crate::driver::traits::DriverError;

/// Mapper error enumeration
#[derive(Debug, Error)]
pub enum MapperError {
    /// Persisted record is missing required fields or is not a record at all
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Unrecoverable driver failure (browser or page crashed)
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Saved record file not found
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
