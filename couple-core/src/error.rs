//! Error types for region editor operations.

use thiserror::Error;

/// Result type for region editor operations.
pub type CoupleResult<T> = Result<T, CoupleError>;

/// Errors that can occur in region editor operations.
#[derive(Debug, Error)]
pub enum CoupleError {
    /// Region not found in the store.
    #[error("Region not found: {0}")]
    RegionNotFound(u64),

    /// Table row index out of range.
    #[error("Row out of range: {0}")]
    RowOutOfRange(usize),

    /// Column cannot be edited from the table.
    #[error("Column is read-only: {0}")]
    ReadOnlyColumn(&'static str),

    /// Invalid editor operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Document or mapping serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
