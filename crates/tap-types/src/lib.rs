#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tap-types** – Shared primitive data structures for the TAP engine.
//!
//! The crate is dependency-light and sits at the very bottom of the crate
//! graph so that every other crate can depend on it without causing cycles.
//! It defines the brand-typed identifier kinds, the canonical UTC instant
//! and interval types, the closed error taxonomy, and the wire envelope plus
//! command discriminants — nothing about storage, locking, or I/O.

mod envelope;
mod error;
mod id;
mod interval;

pub use envelope::{
    canonical_lock_order, AllocCancelCmd, Command, Envelope, HoldConfirmCmd, HoldPlaceCmd,
    HoldReleaseCmd, Kind, SupplyDeltaCmd, TYPE_ALLOC_CANCEL, TYPE_HOLD_CONFIRM, TYPE_HOLD_PLACE,
    TYPE_HOLD_RELEASE, TYPE_SUPPLY_DELTA,
};
pub use error::{ErrorCode, TapError, TapResult};
pub use id::{
    ActorId, AllocationId, CutId, HoldId, IdempotencyKey, InvalidResourceUrn, OrderId, ResourceId,
    SlotId, RESOURCE_URN_MAX_LEN,
};
pub use interval::{EmptyInterval, Instant, Interval};
