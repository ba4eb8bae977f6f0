//! Pure query operations (`SPEC_FULL.md` §4.9): `feasible.check` and
//! `freebusy.get`. Neither mutates state, mints a hold, or touches the
//! Event Log.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tap_timeline::DeltaTimeline;
use tap_types::{Instant, Interval, ResourceId};

use crate::hold_table::HoldTable;
use crate::resource::{negate, ResourceState};

/// Per-resource shortfall reported by a failed [`FeasibleResult`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shortfall {
    /// The resource that could not satisfy its requested demand.
    pub resource: ResourceId,
    /// How much short of the requested demand the minimum availability was.
    pub deficit: i64,
}

/// Reply to `feasible.check`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeasibleResult {
    /// True only if every resource's minimum availability over the
    /// interval met its requested demand.
    pub ok: bool,
    /// One entry per resource whose minimum availability fell short.
    pub shortfalls: Vec<Shortfall>,
}

/// Check `(resource, demand)` pairs against `Supply − Allocation −
/// ActiveHolds` over `interval`, the same validation `hold.place` itself
/// performs (`spec.md` §4.5.2), exposed standalone so callers can probe
/// before committing to a hold.
pub(crate) fn feasible_check(
    views: &[(ResourceId, &ResourceState, &HoldTable)],
    interval: Interval,
    demands: &[i64],
    now: DateTime<Utc>,
) -> FeasibleResult {
    let mut shortfalls = Vec::new();
    for ((resource, state, holds), demand) in views.iter().zip(demands) {
        let available = available_timeline(state, holds, resource, now);
        let minimum = available.min_over(interval);
        if minimum < *demand {
            shortfalls.push(Shortfall {
                resource: resource.clone(),
                deficit: demand - minimum,
            });
        }
    }
    FeasibleResult {
        ok: shortfalls.is_empty(),
        shortfalls,
    }
}

/// `Supply − Allocation − ActiveHolds` for one resource, at query time.
/// Exposed to `crate::engine` so `hold.place`'s own admissibility check
/// reuses this exact computation rather than duplicating it.
pub(crate) fn available_timeline(
    state: &ResourceState,
    holds: &HoldTable,
    resource: &ResourceId,
    now: DateTime<Utc>,
) -> DeltaTimeline {
    let active_holds = active_hold_demand_timeline(holds, resource, now);
    state
        .supply
        .merge(&negate(&state.allocation))
        .merge(&negate(&active_holds))
}

fn active_hold_demand_timeline(holds: &HoldTable, resource: &ResourceId, now: DateTime<Utc>) -> DeltaTimeline {
    let mut timeline = DeltaTimeline::with_baseline(0);
    for hold in holds.active_for_resource(resource, now) {
        if let Some(demand) = hold.demand_for(resource) {
            timeline.add_interval_delta(hold.interval, demand);
        }
    }
    timeline
}

/// What drove a `freebusy.get` busy interval: committed allocation demand
/// or an active hold, whichever was larger at the interval's point of
/// lowest availability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyKind {
    /// Committed allocation was the larger contributor.
    Allocation,
    /// An active hold was the larger contributor.
    Hold,
}

/// One maximal busy interval within a `freebusy.get` window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Busy {
    /// The busy interval.
    pub interval: Interval,
    /// Dominant cause at the point of lowest availability in `interval`.
    pub kind: BusyKind,
}

/// Reply to `freebusy.get`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FreeBusyResult {
    /// Maximal coalesced busy intervals within the requested window.
    pub busy: Vec<Busy>,
}

/// Sweep `Allocation + ActiveHolds` over `window`, emitting maximal
/// intervals where it is above zero (i.e. availability is below full
/// supply capacity) tagged by whichever of the two contributed more at
/// the run's point of lowest availability (`SPEC_FULL.md` §4.9).
pub(crate) fn freebusy(state: &ResourceState, holds: &HoldTable, resource: &ResourceId, window: Interval, now: DateTime<Utc>) -> FreeBusyResult {
    let allocation = state.allocation.clip(window);
    let active_holds = active_hold_demand_timeline(holds, resource, now).clip(window);

    let alloc_deltas: BTreeMap<Instant, i64> = allocation.deltas().collect();
    let hold_deltas: BTreeMap<Instant, i64> = active_holds.deltas().collect();
    let instants: BTreeSet<Instant> = alloc_deltas.keys().chain(hold_deltas.keys()).copied().collect();

    let mut alloc_running = allocation.baseline();
    let mut hold_running = active_holds.baseline();
    let mut combined = alloc_running + hold_running;

    let mut busy = Vec::new();
    let mut run_start = (combined > 0).then_some(window.start);
    let mut peak = (combined, alloc_running, hold_running);

    for t in instants {
        if combined > 0 {
            if combined > peak.0 {
                peak = (combined, alloc_running, hold_running);
            }
        } else if let Some(start) = run_start.take() {
            busy.push(close_run(start, t, peak));
        }

        alloc_running += alloc_deltas.get(&t).copied().unwrap_or(0);
        hold_running += hold_deltas.get(&t).copied().unwrap_or(0);
        combined = alloc_running + hold_running;

        if combined > 0 && run_start.is_none() {
            run_start = Some(t);
            peak = (combined, alloc_running, hold_running);
        }
    }
    if let Some(start) = run_start {
        busy.push(close_run(start, window.end, peak));
    }

    FreeBusyResult { busy }
}

fn close_run(start: Instant, end: Instant, peak: (i64, i64, i64)) -> Busy {
    let (_, alloc_at_peak, hold_at_peak) = peak;
    let kind = if alloc_at_peak >= hold_at_peak {
        BusyKind::Allocation
    } else {
        BusyKind::Hold
    };
    Busy {
        interval: Interval::new(start, end).expect("run start strictly precedes its end"),
        kind,
    }
}
