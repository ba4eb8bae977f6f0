#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tap-timeline** – Delta Timeline (`spec.md` §4.1).
//!
//! Represents a piecewise-constant integer-valued function of time as a
//! baseline plus a sorted, coalesced list of signed deltas. Avoids
//! materializing an availability value per minute: a single ordered
//! structure composes cheaply under `merge`/`clip` and answers point and
//! windowed-minimum queries in `O(log n)` / `O(k)` where `k` is the number
//! of deltas inside the query window.

use std::collections::BTreeMap;
use std::ops::Neg;

use serde::{Deserialize, Serialize};

use tap_types::{Instant, Interval};

/// A sorted, coalesced step-function timeline: `value_at(t) = baseline +
/// Σ { delta | instant <= t }`.
///
/// Deltas at coincident instants are always summed on insert (`spec.md`
/// §4.1 "Edge-case policy"), so the map never holds two entries for the
/// same `Instant` and iteration order is always chronological.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaTimeline {
    baseline: i64,
    deltas: BTreeMap<Instant, i64>,
}

impl DeltaTimeline {
    /// An empty timeline with the given baseline value.
    pub fn with_baseline(baseline: i64) -> Self {
        Self {
            baseline,
            deltas: BTreeMap::new(),
        }
    }

    /// The baseline value, i.e. `value_at` of any instant before the first
    /// delta.
    pub fn baseline(&self) -> i64 {
        self.baseline
    }

    /// Insert (or coalesce into an existing) delta at `instant`.
    ///
    /// A delta that coalesces to exactly zero is removed rather than kept
    /// as a no-op entry, so two timelines built by different insertion
    /// orders that describe the same function always compare equal.
    pub fn insert_delta(&mut self, instant: Instant, delta: i64) {
        match self.deltas.get_mut(&instant) {
            Some(existing) => {
                *existing += delta;
                if *existing == 0 {
                    self.deltas.remove(&instant);
                }
            }
            None if delta != 0 => {
                self.deltas.insert(instant, delta);
            }
            None => {}
        }
    }

    /// `value_at(t) = baseline + Σ d_i for t_i <= t`. `O(log n)`.
    pub fn value_at(&self, t: Instant) -> i64 {
        self.baseline + self.deltas.range(..=t).map(|(_, d)| *d).sum::<i64>()
    }

    /// Minimum value over `[window.start, window.end)`.
    ///
    /// Computed by evaluating `value_at(window.start)` and then sweeping
    /// every delta strictly inside the window, tracking a running sum
    /// (`spec.md` §4.1). An empty timeline (no deltas at all) returns the
    /// baseline, since the function is constant everywhere.
    pub fn min_over(&self, window: Interval) -> i64 {
        let mut running = self.value_at(window.start);
        let mut minimum = running;
        for delta in self
            .deltas
            .range((
                std::ops::Bound::Excluded(window.start),
                std::ops::Bound::Excluded(window.end),
            ))
            .map(|(_, d)| *d)
        {
            running += delta;
            minimum = minimum.min(running);
        }
        minimum
    }

    /// `add_interval_delta`: add `+delta` at `interval.start` and `-delta`
    /// at `interval.end`.
    pub fn add_interval_delta(&mut self, interval: Interval, delta: i64) {
        self.insert_delta(interval.start, delta);
        self.insert_delta(interval.end, delta.neg());
    }

    /// Union of deltas with `other`, summing at coincident instants.
    /// Baselines are summed too, so `merge` models pointwise addition of
    /// the two underlying step functions.
    pub fn merge(&self, other: &DeltaTimeline) -> DeltaTimeline {
        let mut out = DeltaTimeline::with_baseline(self.baseline + other.baseline);
        for (instant, delta) in self.deltas.iter().chain(other.deltas.iter()) {
            out.insert_delta(*instant, *delta);
        }
        out
    }

    /// Project the timeline onto `window`, preserving the total integral:
    /// the new baseline becomes `value_at(window.start)` (folding in
    /// everything before the window), deltas at or after `window.end` are
    /// dropped, and the interior deltas are kept unchanged.
    pub fn clip(&self, window: Interval) -> DeltaTimeline {
        let mut out = DeltaTimeline::with_baseline(self.value_at(window.start));
        for (instant, delta) in self
            .deltas
            .range((std::ops::Bound::Excluded(window.start), std::ops::Bound::Excluded(window.end)))
        {
            out.insert_delta(*instant, *delta);
        }
        out
    }

    /// Iterate the raw `(instant, delta)` pairs in chronological order,
    /// e.g. for snapshot pagination (`spec.md` §4.7).
    pub fn deltas(&self) -> impl Iterator<Item = (Instant, i64)> + '_ {
        self.deltas.iter().map(|(t, d)| (*t, *d))
    }

    /// Deltas strictly after `after`, in chronological order, for paginated
    /// snapshot reads.
    pub fn deltas_after(&self, after: Option<Instant>) -> impl Iterator<Item = (Instant, i64)> + '_ {
        let bound = match after {
            Some(t) => std::ops::Bound::Excluded(t),
            None => std::ops::Bound::Unbounded,
        };
        self.deltas
            .range((bound, std::ops::Bound::Unbounded))
            .map(|(t, d)| (*t, *d))
    }
}
