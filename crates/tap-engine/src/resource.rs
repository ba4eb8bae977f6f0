//! Per-resource projected state: the supply and allocation Delta
//! Timelines (`spec.md` §3, §4.1). ActiveHolds is deliberately not stored
//! here — it is swept fresh from the Hold Table on every read, since a
//! hold's contribution disappears the instant it expires without needing
//! an event (`spec.md` §4.4, §9 "Hold expiration as lazy event emission").

use tap_timeline::DeltaTimeline;

/// One resource's projected supply and committed-allocation timelines.
#[derive(Debug, Default, Clone)]
pub(crate) struct ResourceState {
    pub(crate) supply: DeltaTimeline,
    pub(crate) allocation: DeltaTimeline,
}

impl ResourceState {
    pub(crate) fn new() -> Self {
        Self {
            supply: DeltaTimeline::with_baseline(0),
            allocation: DeltaTimeline::with_baseline(0),
        }
    }
}

/// `-timeline`, built from its public accessors since its fields are
/// private: negating lets [`DeltaTimeline::merge`] model subtraction.
pub(crate) fn negate(timeline: &DeltaTimeline) -> DeltaTimeline {
    let mut out = DeltaTimeline::with_baseline(-timeline.baseline());
    for (instant, delta) in timeline.deltas() {
        out.insert_delta(instant, -delta);
    }
    out
}
