//! Storage-layer failure taxonomy (`spec.md` §4.2 "Failure semantics").

/// Errors a backing store can raise. `AppendFailed`, `IntentFailed` and
/// `IdempotencyFailed` are retried with bounded backoff by the Engine before
/// being surfaced to the caller as `TapError::Internal` (`spec.md` §7); they
/// never represent a domain rejection. `Retired` is the one exception — it
/// names a real outcome the caller must be told apart from a storage hiccup,
/// and is surfaced as `TapError::NotFound` (`spec.md` §4.2 "not_found").
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The append failed leaving state unchanged; retryable.
    #[error("append failed: {0}")]
    AppendFailed(String),
    /// A multi-resource append's intent could not be journaled or resolved.
    #[error("intent journal failure: {0}")]
    IntentFailed(String),
    /// The idempotency store failed to read or write its mapping.
    #[error("idempotency store failure: {0}")]
    IdempotencyFailed(String),
    /// A resumed stream position predates what the log still retains.
    #[error("requested position for {resource} is older than the retained log")]
    Retired {
        /// The resource whose tail was requested.
        resource: String,
    },
}
