//! Error types for sync operations.

use std::time::Duration;

use couple_core::{CoupleError, MappingSlot};
use thiserror::Error;
use uuid::Uuid;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors from a mapping store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The slot's target is not mounted yet. The write is skipped, not retried.
    #[error("Mapping target for {0} is not ready")]
    NotReady(MappingSlot),

    /// The target refused the value.
    #[error("Mapping target rejected the write: {0}")]
    Rejected(String),
}

/// Errors from the request bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// No response arrived in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The other side is gone.
    #[error("Request bus closed")]
    Closed,

    /// The responder reported a failure.
    #[error("Request failed: {0}")]
    Failed(String),

    /// A response arrived for a request nobody is waiting on.
    #[error("No pending request with id {0}")]
    UnknownRequest(Uuid),
}

/// Errors that can occur in the sync layer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Mapping store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Request bus error.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Editor operation error.
    #[error(transparent)]
    Core(#[from] CoupleError),

    /// Rendering error.
    #[error(transparent)]
    Render(#[from] couple_renderer::RenderError),
}
