//! Boot-time replay (`SPEC_FULL.md` §3a).

use std::sync::Arc;

use tap_engine::AllocationEngine;
use tap_store_core::EventLog;

const REPLAY_PAGE: usize = 1024;

/// Read every known resource's full event tail, in `seq` order, and fold
/// each record into `engine`'s projected state via
/// [`AllocationEngine::apply_replayed`] — the same function the live path
/// uses after an append, so replay and live application are one code path
/// (`other_examples/028850f2_open-tap-deltat`'s `Engine::new`).
///
/// Must run to completion before the engine accepts any command; the
/// caller ([`crate::Runtime::boot`]) enforces that ordering.
pub(crate) async fn replay_all(
    engine: &AllocationEngine,
    log: &Arc<dyn EventLog>,
) -> Result<(), tap_store_core::StorageError> {
    for resource in log.known_resources().await? {
        let mut after = None;
        loop {
            let batch = log.read(&resource, after, REPLAY_PAGE).await?;
            if batch.is_empty() {
                break;
            }
            let got_full_page = batch.len() == REPLAY_PAGE;
            for record in &batch {
                engine.apply_replayed(record).await;
                after = Some(record.seq);
            }
            if !got_full_page {
                break;
            }
        }
    }
    Ok(())
}
