//! Allocation Index: `{allocationId → Allocation}`, owned by the
//! Allocation Engine, reconstructable by replay (`spec.md` §3).

use dashmap::DashMap;

use tap_store_core::{Allocation, AllocationState};
use tap_types::{AllocationId, HoldId, Interval, ResourceId};

#[derive(Debug, Default)]
pub(crate) struct AllocationIndex {
    allocations: DashMap<AllocationId, Allocation>,
}

impl AllocationIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fold one resource's `alloc.committed` event, creating the
    /// [`Allocation`] on first sight (emitted once per resource, same as
    /// `hold.placed`).
    pub(crate) fn apply_committed(
        &self,
        allocation_id: AllocationId,
        hold_id: HoldId,
        resource: ResourceId,
        interval: Interval,
        demand: i64,
    ) {
        let mut alloc = self
            .allocations
            .entry(allocation_id.clone())
            .or_insert_with(|| Allocation {
                allocation_id,
                hold_id,
                resources: Vec::new(),
                interval,
                demands: Vec::new(),
                state: AllocationState::Committed,
            });
        alloc.resources.push(resource);
        alloc.demands.push(demand);
    }

    pub(crate) fn apply_canceled(&self, allocation_id: &AllocationId) {
        if let Some(mut alloc) = self.allocations.get_mut(allocation_id) {
            alloc.state = AllocationState::Canceled;
        }
    }

    pub(crate) fn get(&self, allocation_id: &AllocationId) -> Option<Allocation> {
        self.allocations.get(allocation_id).map(|e| e.value().clone())
    }
}
