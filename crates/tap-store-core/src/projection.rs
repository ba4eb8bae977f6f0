//! Projected state derived from events: Holds and Allocations (`spec.md`
//! §3). The Event Log owns the events; the Hold Table / Allocation Index
//! own these projections but they are fully reconstructable by replay
//! (`SPEC_FULL.md` §3a).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tap_types::{AllocationId, HoldId, Interval, ResourceId};

/// Lifecycle state of a [`Hold`]. Once `Released` or `Expired` it never
/// transitions again (`spec.md` §3 "Terminal immutability").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldState {
    /// Reserving capacity; can still be confirmed or released.
    Active,
    /// Converted into an Allocation via `hold.confirm`.
    Confirmed,
    /// Abandoned via `hold.release`.
    Released,
    /// TTL elapsed before confirmation or release.
    Expired,
}

impl HoldState {
    /// Whether the hold is in a state from which it can never transition
    /// again.
    pub fn is_terminal(self) -> bool {
        matches!(self, HoldState::Confirmed | HoldState::Released | HoldState::Expired)
    }
}

/// A short-lived, multi-resource reservation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Hold {
    /// Identifier minted on `hold.place`.
    pub hold_id: HoldId,
    /// Resources this hold spans.
    pub resources: Vec<ResourceId>,
    /// Interval the hold spans on every resource.
    pub interval: Interval,
    /// Per-resource demand, positionally matched to `resources`.
    pub demands: Vec<i64>,
    /// Absolute expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: HoldState,
}

impl Hold {
    /// The demand this hold places on `resource`, if it spans it.
    pub fn demand_for(&self, resource: &ResourceId) -> Option<i64> {
        self.resources
            .iter()
            .position(|r| r == resource)
            .map(|idx| self.demands[idx])
    }

    /// Whether this hold still reduces availability at `now`: active and
    /// not yet past its TTL (`spec.md` §4.4 "Hold exclusivity").
    pub fn is_effectively_active(&self, now: DateTime<Utc>) -> bool {
        self.state == HoldState::Active && self.expires_at > now
    }
}

/// Lifecycle state of an [`Allocation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationState {
    /// Committed capacity, counted against the Allocation timeline.
    Committed,
    /// Canceled via `alloc.cancel`; no longer counted.
    Canceled,
}

/// A committed reservation, minted from a confirmed [`Hold`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Allocation {
    /// Identifier minted on `hold.confirm`.
    pub allocation_id: AllocationId,
    /// The hold this allocation was confirmed from.
    pub hold_id: HoldId,
    /// Resources this allocation spans.
    pub resources: Vec<ResourceId>,
    /// Interval the allocation spans on every resource.
    pub interval: Interval,
    /// Per-resource demand, positionally matched to `resources`.
    pub demands: Vec<i64>,
    /// Current lifecycle state.
    pub state: AllocationState,
}

impl Allocation {
    /// The demand this allocation places on `resource`, if it spans it.
    pub fn demand_for(&self, resource: &ResourceId) -> Option<i64> {
        self.resources
            .iter()
            .position(|r| r == resource)
            .map(|idx| self.demands[idx])
    }
}
