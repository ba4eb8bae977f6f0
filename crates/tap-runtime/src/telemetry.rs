//! Tracing initialization (`SPEC_FULL.md` §2a), grounded in
//! `toka-orchestration-service::init_logging`: an `EnvFilter` built from a
//! default directive plus whatever `RUST_LOG` overrides, layered with the
//! `fmt` subscriber.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `default_directive` sets the
/// level when `RUST_LOG` is unset, e.g. `"tap_engine=debug,tap_runtime=info"`.
///
/// Idempotent-ish in practice: a second call only errors if a subscriber is
/// already installed, which `tracing`'s own `try_init` surfaces rather than
/// panicking on (unlike `init`).
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
