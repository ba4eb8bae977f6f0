//! The events the Event Log exclusively owns (`spec.md` §3 "Ownership").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tap_types::{AllocationId, HoldId, IdempotencyKey, Interval, ResourceId};

/// Discriminant for [`EventBody::SupplyDeltaApplied`].
pub const TYPE_SUPPLY_DELTA_APPLIED: &str = "supply.delta.applied";
/// Discriminant for [`EventBody::HoldPlaced`].
pub const TYPE_HOLD_PLACED: &str = "hold.placed";
/// Discriminant for [`EventBody::HoldReleased`].
pub const TYPE_HOLD_RELEASED: &str = "hold.released";
/// Discriminant for [`EventBody::AllocCommitted`].
pub const TYPE_ALLOC_COMMITTED: &str = "alloc.committed";
/// Discriminant for [`EventBody::AllocCanceled`].
pub const TYPE_ALLOC_CANCELED: &str = "alloc.canceled";

/// The five authoritative event bodies the Allocation Engine emits
/// (`spec.md` §6). Like [`tap_types::Command`], these discriminants are
/// forever-verbs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum EventBody {
    /// `supply.delta.applied` — a `supply.delta` command was accepted.
    #[serde(rename = "supply.delta.applied")]
    SupplyDeltaApplied {
        /// Interval the delta applies to.
        interval: Interval,
        /// Signed capacity delta.
        delta: i64,
    },
    /// `hold.placed` — emitted once per resource a `hold.place` spans.
    #[serde(rename = "hold.placed")]
    HoldPlaced {
        /// The hold minted by this command.
        hold_id: HoldId,
        /// Interval the hold spans on this resource.
        interval: Interval,
        /// Demand reserved on this resource.
        demand: i64,
        /// Absolute expiry instant.
        expires_at: DateTime<Utc>,
    },
    /// `hold.released` — emitted once per resource the released hold
    /// spanned. `reason` is `"expired"` for lazily-observed TTL expiry
    /// (`spec.md` §4.4), or the caller-supplied reason otherwise.
    #[serde(rename = "hold.released")]
    HoldReleased {
        /// The hold that was released.
        hold_id: HoldId,
        /// Release reason.
        reason: String,
    },
    /// `alloc.committed` — emitted once per resource of a confirmed hold.
    #[serde(rename = "alloc.committed")]
    AllocCommitted {
        /// The allocation minted by this command.
        allocation_id: AllocationId,
        /// The hold this allocation was confirmed from.
        hold_id: HoldId,
        /// Interval the allocation spans on this resource.
        interval: Interval,
        /// Demand committed on this resource.
        demand: i64,
    },
    /// `alloc.canceled` — emitted once per resource of a canceled
    /// allocation.
    #[serde(rename = "alloc.canceled")]
    AllocCanceled {
        /// The allocation that was canceled.
        allocation_id: AllocationId,
        /// Cancellation reason.
        reason: String,
    },
}

impl EventBody {
    /// The wire discriminant for this event.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventBody::SupplyDeltaApplied { .. } => TYPE_SUPPLY_DELTA_APPLIED,
            EventBody::HoldPlaced { .. } => TYPE_HOLD_PLACED,
            EventBody::HoldReleased { .. } => TYPE_HOLD_RELEASED,
            EventBody::AllocCommitted { .. } => TYPE_ALLOC_COMMITTED,
            EventBody::AllocCanceled { .. } => TYPE_ALLOC_CANCELED,
        }
    }
}

/// An immutable, per-resource ordered record in the Event Log.
///
/// `seq` is assigned by the log on append and is strictly increasing with
/// no gaps within one resource's open log (`spec.md` §3 "Sequence
/// monotonicity").
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    /// The resource this record belongs to.
    pub resource: ResourceId,
    /// Per-resource monotone sequence number, starting at 0.
    pub seq: u64,
    /// Wall-clock commit time, from the Clock the Engine was given.
    pub ts: DateTime<Utc>,
    /// Idempotency key of the command that produced this record, if any.
    pub source_idem: Option<IdempotencyKey>,
    /// The event payload.
    pub body: EventBody,
}
