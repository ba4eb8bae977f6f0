//! The closed error-code set (`spec.md` §6, §7).

use serde::{Deserialize, Serialize};

/// Discriminant for [`TapError`], mirroring the closed wire error-code set.
///
/// This set is closed by design: new codes must never be added silently,
/// since clients pattern-match on them (§6 "Evolution rules").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Schema violation.
    BadRequest,
    /// Authentication failed (handled by an external collaborator; carried
    /// here only so the code is representable end-to-end).
    Unauthorized,
    /// Authorization denied (same caveat as `Unauthorized`).
    Forbidden,
    /// Referenced id does not exist, or a resumed stream position has aged
    /// out of the retained log.
    NotFound,
    /// An idempotency key was reused with a different command payload.
    Conflict,
    /// The command would drive availability negative at some instant.
    CapacityViolation,
    /// `hold.confirm` was attempted after `expiresAt`.
    ExpiredHold,
    /// Not an error: surfaces the event from the first application of this
    /// idempotency key. See [`TapError`] doc comment.
    IdempotencyReplay,
    /// Caller exceeded a configured rate limit.
    RateLimited,
    /// Append-log or idempotency-store failure after bounded retry.
    Internal,
}

/// The engine's single closed error type.
///
/// `IdempotencyReplay` is deliberately *not* a variant here: `spec.md` §7
/// states it "is not an error — it surfaces the original event", so a
/// replay is represented as `Ok` with the original event, never as `Err`.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum TapError {
    /// Schema violation, malformed id, or an interval with `start >= end`.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Referenced hold, allocation, cut, or resume position was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// An idempotency key was reused with a different command hash.
    #[error("idempotency key reused with a different command: {0}")]
    Conflict(String),
    /// The command would drive availability negative.
    #[error("capacity violation on {resource}: requested {requested}, available {available}")]
    CapacityViolation {
        /// Offending resource.
        resource: String,
        /// Demand that could not be satisfied.
        requested: i64,
        /// Minimum availability observed over the requested interval.
        available: i64,
    },
    /// `hold.confirm` observed `expiresAt <= now`.
    #[error("hold {0} has expired")]
    ExpiredHold(String),
    /// Caller exceeded a configured rate limit.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Append-log or idempotency-store failure after bounded retry.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TapError {
    /// The wire discriminant for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            TapError::BadRequest(_) => ErrorCode::BadRequest,
            TapError::NotFound(_) => ErrorCode::NotFound,
            TapError::Conflict(_) => ErrorCode::Conflict,
            TapError::CapacityViolation { .. } => ErrorCode::CapacityViolation,
            TapError::ExpiredHold(_) => ErrorCode::ExpiredHold,
            TapError::RateLimited(_) => ErrorCode::RateLimited,
            TapError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Convenience alias used throughout the core crates.
pub type TapResult<T> = Result<T, TapError>;
