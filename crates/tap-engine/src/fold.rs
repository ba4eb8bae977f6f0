//! The single function both the live command path and replay fold an
//! [`EventRecord`] through (`SPEC_FULL.md` §3a: "replay and live-apply
//! must share one code path").

use tap_store_core::{EventBody, EventRecord};

use crate::allocation_index::AllocationIndex;
use crate::hold_table::HoldTable;
use crate::resource::ResourceState;

/// Fold one already-committed event into projected state. Never fails:
/// by the time an event exists in the log, it has already been validated.
pub(crate) fn fold_event(
    resource_state: &mut ResourceState,
    holds: &HoldTable,
    allocations: &AllocationIndex,
    record: &EventRecord,
) {
    match &record.body {
        EventBody::SupplyDeltaApplied { interval, delta } => {
            resource_state.supply.add_interval_delta(*interval, *delta);
        }
        EventBody::HoldPlaced { hold_id, interval, demand, expires_at } => {
            holds.apply_placed(hold_id.clone(), record.resource.clone(), *interval, *demand, *expires_at);
        }
        EventBody::HoldReleased { hold_id, reason } => {
            holds.apply_released(hold_id, reason);
        }
        EventBody::AllocCommitted { allocation_id, hold_id, interval, demand } => {
            resource_state.allocation.add_interval_delta(*interval, *demand);
            holds.apply_confirmed(hold_id);
            allocations.apply_committed(
                allocation_id.clone(),
                hold_id.clone(),
                record.resource.clone(),
                *interval,
                *demand,
            );
        }
        EventBody::AllocCanceled { allocation_id, reason: _ } => {
            if let Some(alloc) = allocations.get(allocation_id) {
                if let Some(demand) = alloc.demand_for(&record.resource) {
                    resource_state.allocation.add_interval_delta(alloc.interval, -demand);
                }
            }
            allocations.apply_canceled(allocation_id);
        }
    }
}
