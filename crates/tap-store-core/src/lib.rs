#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tap-store-core** – Event Log and Idempotency Store abstractions for
//! the TAP engine.
//!
//! This crate defines the contracts for event persistence and idempotency
//! without providing a concrete implementation: backend drivers (in-memory,
//! and whatever durable store an integrator chooses) implement these traits
//! in separate crates. See `tap-store-memory` for the reference driver this
//! workspace ships.

mod cut;
mod error;
mod event;
mod idempotency;
mod log;
mod projection;

pub use cut::Cut;
pub use error::StorageError;
pub use event::{
    EventBody, EventRecord, TYPE_ALLOC_CANCELED, TYPE_ALLOC_COMMITTED, TYPE_HOLD_PLACED,
    TYPE_HOLD_RELEASED, TYPE_SUPPLY_DELTA_APPLIED,
};
pub use idempotency::{IdempotencyLookup, IdempotencyStore};
pub use log::{EventLog, PendingEvent};
pub use projection::{Allocation, AllocationState, Hold, HoldState};

/// Compute a stable digest of a command for idempotency-conflict
/// detection. The engine is the only caller; it passes in the command's
/// canonical JSON text and this module treats it as an opaque fingerprint,
/// per `spec.md` §4.3 ("fail with `conflict`" only on digest mismatch).
pub fn command_digest(canonical_json: &str) -> String {
    canonical_json.to_owned()
}
