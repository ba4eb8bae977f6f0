//! Cut Manager (`spec.md` §4.6): issues cross-resource watermarks without
//! blocking writers.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tap_clock::Clock;
use tap_store_core::{Cut, EventLog, StorageError};
use tap_types::{CutId, ResourceId};

/// Issues and retains [`Cut`]s so the Snapshot Projector can resolve a
/// `cutId` back to the `seqHi` it captured.
///
/// Retention is unbounded here: this reference engine keeps every cut for
/// the life of the process. `spec.md` §4.6 only requires retention "at
/// least long enough for a snapshot+tail handshake"; a production
/// integrator wanting bounded retention configures eviction in
/// `tap-runtime` (`SPEC_FULL.md` §9, Open Question resolved in
/// `DESIGN.md`).
#[derive(Debug)]
pub(crate) struct CutManager {
    log: Arc<dyn EventLog>,
    clock: Arc<dyn Clock>,
    cuts: DashMap<CutId, Cut>,
}

impl CutManager {
    pub(crate) fn new(log: Arc<dyn EventLog>, clock: Arc<dyn Clock>) -> Self {
        Self { log, clock, cuts: DashMap::new() }
    }

    /// Capture each listed resource's `seqHi` independently (no
    /// cross-resource coordination — a consistent cut only needs to be
    /// strictly-before any later observation, `spec.md` §5) and mint a
    /// fresh [`Cut`].
    pub(crate) async fn create(&self, resources: &[ResourceId]) -> Result<Cut, StorageError> {
        let mut seq_hi = std::collections::BTreeMap::new();
        for resource in resources {
            let hi = self.log.seq_hi(resource).await?.unwrap_or(0);
            seq_hi.insert(resource.clone(), hi);
        }
        let cut = Cut {
            cut_id: CutId::fresh(),
            seq_hi,
            issued_at: self.clock.now(),
        };
        self.cuts.insert(cut.cut_id.clone(), cut.clone());
        Ok(cut)
    }

    pub(crate) fn get(&self, cut_id: &CutId) -> Option<Cut> {
        self.cuts.get(cut_id).map(|e| e.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tap_clock::TestClock;
    use tap_store_core::EventBody;
    use tap_store_memory::MemoryEventLog;
    use tap_types::{Instant, Interval};

    #[tokio::test]
    async fn create_captures_current_seq_hi_per_resource() {
        let log = Arc::new(MemoryEventLog::new());
        let clock = Arc::new(TestClock::new(Utc::now()));
        let r1 = ResourceId::from_opaque("r1").unwrap();
        let r2 = ResourceId::from_opaque("r2").unwrap();
        let interval = Interval::new(
            Instant::try_from("2026-07-30T09:00:00Z".to_string()).unwrap(),
            Instant::try_from("2026-07-30T10:00:00Z".to_string()).unwrap(),
        )
        .unwrap();
        for _ in 0..3 {
            log.append(&r1, EventBody::SupplyDeltaApplied { interval, delta: 1 }, None, Utc::now())
                .await
                .unwrap();
        }

        let manager = CutManager::new(log, clock as Arc<dyn Clock>);
        let cut = manager.create(&[r1.clone(), r2.clone()]).await.unwrap();
        assert_eq!(cut.seq_for(&r1), Some(2));
        assert_eq!(cut.seq_for(&r2), Some(0));
        assert_eq!(manager.get(&cut.cut_id).unwrap(), cut);
    }
}
