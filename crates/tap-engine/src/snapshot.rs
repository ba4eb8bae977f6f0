//! Snapshot Projector (`spec.md` §4.7): serves `state.snapshot` as-of a
//! cut, paginated.

use std::sync::Arc;

use tap_store_core::EventLog;
use tap_timeline::DeltaTimeline;
use tap_types::{Instant, Interval, ResourceId, TapError};

use crate::allocation_index::AllocationIndex;
use crate::fold::fold_event;
use crate::hold_table::HoldTable;
use crate::resource::ResourceState;

/// One page of a resource's projected timelines as of a cut.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotPage {
    /// Resource this page describes.
    pub resource: ResourceId,
    /// The `seqHi` this page was projected as of, echoed from the cut.
    pub seq_hi: u64,
    /// Supply baseline at `window.start`.
    pub supply_baseline: i64,
    /// Supply deltas within `window`, strictly after `window.start`.
    pub supply: Vec<(Instant, i64)>,
    /// Allocation baseline at `window.start`.
    pub allocation_baseline: i64,
    /// Allocation deltas within `window`, strictly after `window.start`.
    pub allocation: Vec<(Instant, i64)>,
    /// The last emitted instant, if either series was truncated to
    /// `page_size`. Feed back as `page_after` to continue.
    pub next_page_after: Option<Instant>,
}

/// Replay `resource`'s full event tail through `fold_event` into fresh,
/// ephemeral projections, then clip and paginate.
///
/// This reconstructs state independent of the live, shared
/// `ResourceState`/`HoldTable`/`AllocationIndex` the engine holds for
/// current commands — a historical cut may ask for a `seqHi` well behind
/// the live tail, and the live projections only ever reflect the present
/// (`SPEC_FULL.md` §3a).
pub(crate) async fn reconstruct_as_of(
    log: &Arc<dyn EventLog>,
    resource: &ResourceId,
    seq_hi: u64,
    window: Interval,
    page_after: Option<Instant>,
    page_size: usize,
) -> Result<SnapshotPage, TapError> {
    let mut state = ResourceState::new();
    let holds = HoldTable::new();
    let allocations = AllocationIndex::new();

    let mut after = None;
    loop {
        let batch = log
            .read(resource, after, 1024)
            .await
            .map_err(|e| TapError::Internal(e.to_string()))?;
        if batch.is_empty() {
            break;
        }
        let got_full_page = batch.len() == 1024;
        for record in &batch {
            if record.seq > seq_hi {
                break;
            }
            fold_event(&mut state, &holds, &allocations, record);
            after = Some(record.seq);
        }
        if batch.last().map(|r| r.seq >= seq_hi).unwrap_or(false) || !got_full_page {
            break;
        }
    }

    let supply = state.supply.clip(window);
    let allocation = state.allocation.clip(window);
    Ok(paginate(resource.clone(), seq_hi, &supply, &allocation, page_after, page_size))
}

fn paginate(
    resource: ResourceId,
    seq_hi: u64,
    supply: &DeltaTimeline,
    allocation: &DeltaTimeline,
    page_after: Option<Instant>,
    page_size: usize,
) -> SnapshotPage {
    let page_size = page_size.max(1);

    let (supply_page, supply_truncated_at) = take_page(supply.deltas_after(page_after), page_size);
    let (allocation_page, allocation_truncated_at) = take_page(allocation.deltas_after(page_after), page_size);

    let next_page_after = match (supply_truncated_at, allocation_truncated_at) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };

    SnapshotPage {
        resource,
        seq_hi,
        supply_baseline: supply.baseline(),
        supply: supply_page,
        allocation_baseline: allocation.baseline(),
        allocation: allocation_page,
        next_page_after,
    }
}

/// Take up to `page_size` items, peeking one extra to detect truncation
/// without a separate count query.
fn take_page(
    iter: impl Iterator<Item = (Instant, i64)>,
    page_size: usize,
) -> (Vec<(Instant, i64)>, Option<Instant>) {
    let mut items: Vec<(Instant, i64)> = iter.take(page_size + 1).collect();
    if items.len() > page_size {
        items.truncate(page_size);
        let truncated_at = items.last().map(|(t, _)| *t);
        (items, truncated_at)
    } else {
        (items, None)
    }
}
