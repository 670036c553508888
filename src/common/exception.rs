use thiserror::Error;

use crate::common::config::Address;

/// Errors reported by a scatter-task backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScatterError {
    #[error("Scatter range rejected at {address:#x} (size {size}): {reason}")]
    PrepareRejected {
        address: Address,
        size: u32,
        reason: String,
    },
    #[error("Scatter execute failed: {0}")]
    ExecuteFailed(String),
    #[error("Backend returned {got} read buffers for {expected} registered reads")]
    ResultMismatch { expected: usize, got: usize },
    #[error("Scatter task already closed")]
    Closed,
}

/// Errors surfaced by the coalescer to its callers and through result handles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquireError {
    #[error("Request size must be greater than zero")]
    ZeroSize,
    #[error("Coalescer is closed")]
    Closed,
    #[error("Scatter backend error: {0}")]
    Scatter(#[from] ScatterError),
    #[error("Result handle dropped before delivery")]
    Canceled,
}
