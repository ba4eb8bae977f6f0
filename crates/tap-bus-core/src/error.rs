//! Errors a subscription can fail to open with (`spec.md` §4.8).

use tap_store_core::StorageError;
use tap_types::{ResourceId, TapError};

/// Failure opening a stream subscription.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A `resume` watermark is older than what the log still retains for
    /// that resource; the client must fall back to cut+snapshot.
    #[error("requested position for {resource} is older than the retained log")]
    Retired {
        /// The resource whose watermark predates the retained log.
        resource: ResourceId,
    },
    /// The backing event log failed while resolving a starting watermark.
    #[error("event log failure while opening stream: {0}")]
    Storage(#[from] tap_store_core::StorageError),
}

/// `open()`'s public error surface is `TapError`, not this crate's own
/// `StreamError` — a retired watermark is a domain-meaningful `not_found`
/// (`spec.md:158`), not an opaque internal failure, and callers should
/// match on the same closed error set every other command surfaces.
impl From<StreamError> for TapError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Retired { resource } => {
                TapError::NotFound(format!("{resource} has been retired from the retained log"))
            }
            StreamError::Storage(StorageError::Retired { resource }) => {
                TapError::NotFound(format!("{resource} has been retired from the retained log"))
            }
            StreamError::Storage(other) => TapError::Internal(other.to_string()),
        }
    }
}
