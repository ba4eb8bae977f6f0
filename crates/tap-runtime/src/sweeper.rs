//! Background hold-expiry sweeper (`SPEC_FULL.md` §4.4), grounded in
//! `toka-runtime::Runtime::spawn_persistence_task`'s lifecycle-task-spawn
//! pattern: a detached `tokio::task` holding the only strong reference
//! needed to keep running, aborted on `Runtime` drop.

use std::sync::Arc;
use std::time::Duration;

use tap_engine::AllocationEngine;
use tracing::warn;

/// Spawn the sweeper if `interval_sec > 0`. Returns `None` when disabled
/// (`interval_sec == 0`), leaving hold expiry purely lazy —
/// `Hold::is_effectively_active` still keeps every availability
/// computation correct either way.
pub(crate) fn spawn(engine: Arc<AllocationEngine>, interval_sec: u64) -> Option<tokio::task::JoinHandle<()>> {
    if interval_sec == 0 {
        return None;
    }
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_sec));
    Some(tokio::spawn(async move {
        loop {
            ticker.tick().await;
            if let Err(err) = engine.sweep_expired_holds().await {
                warn!(%err, "hold-expiry sweep failed");
            }
        }
    }))
}
