#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tap-runtime** – glue crate: wires the Allocation Engine to a store and
//! bus, replays history at boot, runs the background hold-expiry sweeper,
//! and owns configuration loading and tracing initialization
//! (`SPEC_FULL.md` §2a, §2, §8). Grounded in `toka-runtime::Runtime`'s
//! shape: a `RuntimeConfig` with sane defaults, a constructor that wires
//! every component and optionally spawns a background task, and a
//! `shutdown` that aborts it.

mod config;
mod replay;
mod sweeper;
mod telemetry;

pub use config::{ConfigError, RuntimeConfig};
pub use telemetry::init_tracing;

use std::sync::Arc;

use tap_bus_core::StreamMultiplexer;
use tap_clock::Clock;
use tap_engine::AllocationEngine;
use tap_store_core::EventLog;
use tap_store_core::IdempotencyStore;
use tap_store_memory::{MemoryEventLog, MemoryIdempotencyStore};
use tracing::info;

/// A fully wired TAP engine instance: the Allocation Engine plus the
/// background sweeper task, if configured.
///
/// `Runtime` owns the only handle needed to keep the sweeper alive; dropping
/// it (or calling [`Runtime::shutdown`]) stops the sweeper.
pub struct Runtime {
    engine: Arc<AllocationEngine>,
    bus: Arc<StreamMultiplexer>,
    config: RuntimeConfig,
    sweeper: Option<tokio::task::JoinHandle<()>>,
}

impl Runtime {
    /// Boot a runtime over the reference in-memory backend: replay any
    /// existing history (a no-op on a fresh log), then start the
    /// background sweeper per `config.sweep_interval_sec`.
    ///
    /// Callers integrating a different [`EventLog`]/[`IdempotencyStore`]
    /// pair should use [`Runtime::boot_with`] instead; this constructor
    /// exists because the in-memory backend is the only one this workspace
    /// ships (`spec.md` §1).
    pub async fn boot(config: RuntimeConfig) -> Result<Self, tap_store_core::StorageError> {
        let log: Arc<dyn EventLog> = Arc::new(MemoryEventLog::new());
        let idempotency: Arc<dyn IdempotencyStore> = Arc::new(MemoryIdempotencyStore::new());
        let clock: Arc<dyn Clock> = Arc::new(tap_clock::SystemClock);
        Self::boot_with(config, clock, log, idempotency).await
    }

    /// Boot a runtime over caller-supplied backends. Always replays the
    /// log's full history into the engine before returning, so the
    /// returned `Runtime` never accepts a command against stale projected
    /// state (`SPEC_FULL.md` §3a).
    pub async fn boot_with(
        config: RuntimeConfig,
        clock: Arc<dyn Clock>,
        log: Arc<dyn EventLog>,
        idempotency: Arc<dyn IdempotencyStore>,
    ) -> Result<Self, tap_store_core::StorageError> {
        let bus = Arc::new(StreamMultiplexer::new());
        let engine = Arc::new(AllocationEngine::new(clock, log.clone(), idempotency, bus.clone()));

        replay::replay_all(&engine, &log).await?;
        info!("boot replay complete");

        let sweeper = sweeper::spawn(engine.clone(), config.sweep_interval_sec);

        Ok(Self { engine, bus, config, sweeper })
    }

    /// The wired Allocation Engine. Commands are submitted through this
    /// handle (`tap_engine::AllocationEngine::submit`).
    pub fn engine(&self) -> &Arc<AllocationEngine> {
        &self.engine
    }

    /// The wired Stream Multiplexer, for opening `stream.open` subscriptions
    /// against the same [`EventLog`] the engine appends to.
    pub fn bus(&self) -> &Arc<StreamMultiplexer> {
        &self.bus
    }

    /// The configuration this runtime was booted with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Stop the background sweeper, if one is running, and wait for it to
    /// finish its current tick.
    pub async fn shutdown(self) {
        if let Some(handle) = self.sweeper {
            handle.abort();
            let _ = handle.await;
        }
        info!("runtime shutdown complete");
    }
}
