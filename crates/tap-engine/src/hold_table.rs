//! Hold Table (`spec.md` §4.4): `{holdId → Hold}` plus a `{resource →
//! set<holdId>}` secondary index for availability queries.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use tap_store_core::{Hold, HoldState};
use tap_types::{HoldId, Interval, ResourceId};

/// Reconstructable-by-replay projection of every Hold the engine has ever
/// seen. `resources`/`demands` on a [`Hold`] accumulate one entry at a
/// time as each resource's `hold.placed` event is folded in, since that
/// event is emitted once per resource rather than once per hold
/// (`spec.md` §4.5.2).
#[derive(Debug, Default)]
pub(crate) struct HoldTable {
    holds: DashMap<HoldId, Hold>,
    by_resource: DashMap<ResourceId, BTreeSet<HoldId>>,
}

impl HoldTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fold one resource's `hold.placed` event into the table, creating
    /// the [`Hold`] on first sight.
    pub(crate) fn apply_placed(
        &self,
        hold_id: HoldId,
        resource: ResourceId,
        interval: Interval,
        demand: i64,
        expires_at: DateTime<Utc>,
    ) {
        let mut hold = self.holds.entry(hold_id.clone()).or_insert_with(|| Hold {
            hold_id: hold_id.clone(),
            resources: Vec::new(),
            interval,
            demands: Vec::new(),
            expires_at,
            state: HoldState::Active,
        });
        hold.resources.push(resource.clone());
        hold.demands.push(demand);
        self.by_resource.entry(resource).or_default().insert(hold_id);
    }

    /// Fold a `hold.released` event (including lazily-observed expiry,
    /// `reason == "expired"`) into the table.
    pub(crate) fn apply_released(&self, hold_id: &HoldId, reason: &str) {
        if let Some(mut hold) = self.holds.get_mut(hold_id) {
            hold.state = if reason == "expired" {
                HoldState::Expired
            } else {
                HoldState::Released
            };
        }
    }

    /// Mark a hold Confirmed, folding the confirm side effect of an
    /// `alloc.committed` event (`spec.md` §4.5.3: confirm emits no event
    /// of its own).
    pub(crate) fn apply_confirmed(&self, hold_id: &HoldId) {
        if let Some(mut hold) = self.holds.get_mut(hold_id) {
            hold.state = HoldState::Confirmed;
        }
    }

    pub(crate) fn get(&self, hold_id: &HoldId) -> Option<Hold> {
        self.holds.get(hold_id).map(|entry| entry.value().clone())
    }

    /// Every hold touching `resource` that is still `Active` and not past
    /// its TTL as of `now` (`spec.md` §4.4 "ActiveHolds").
    pub(crate) fn active_for_resource(&self, resource: &ResourceId, now: DateTime<Utc>) -> Vec<Hold> {
        let Some(ids) = self.by_resource.get(resource) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.holds.get(id).map(|e| e.value().clone()))
            .filter(|hold| hold.is_effectively_active(now))
            .collect()
    }

    /// Holds touching any of `resources` that are nominally `Active` but
    /// have passed their TTL — candidates for lazy expiry emission.
    pub(crate) fn stale_for_resources(&self, resources: &[ResourceId], now: DateTime<Utc>) -> Vec<HoldId> {
        let mut seen = BTreeSet::new();
        for resource in resources {
            if let Some(ids) = self.by_resource.get(resource) {
                for id in ids.iter() {
                    if seen.contains(id) {
                        continue;
                    }
                    if let Some(hold) = self.holds.get(id) {
                        if hold.state == HoldState::Active && hold.expires_at <= now {
                            seen.insert(id.clone());
                        }
                    }
                }
            }
        }
        seen.into_iter().collect()
    }

    /// All holds currently `Active` and past TTL, for the background
    /// sweeper (`SPEC_FULL.md` §4.4).
    pub(crate) fn all_stale(&self, now: DateTime<Utc>) -> Vec<HoldId> {
        self.holds
            .iter()
            .filter(|entry| entry.state == HoldState::Active && entry.expires_at <= now)
            .map(|entry| entry.hold_id.clone())
            .collect()
    }
}
