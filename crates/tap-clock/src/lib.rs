#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tap-clock** – Injectable wall-clock facade.
//!
//! `spec.md` §9 is explicit: "Clock injection is mandatory — the core never
//! reads a system clock directly." The teacher workspace does not follow
//! this rule (`toka-kernel` calls `chrono::Utc::now()` inline in its
//! handlers); this crate is the deliberate fix, generalizing the pattern
//! `toka-auth`'s JWT validator uses internally for expiry checks into a
//! first-class, swappable dependency every TTL/expiry computation in
//! `tap-engine` takes as a constructor argument.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Abstract source of wall-clock time.
///
/// Every place the core needs "now" — hold TTL expiry, event timestamps,
/// cut `issuedAt` — takes `&dyn Clock` rather than calling `Utc::now()`
/// directly, so tests can advance time deterministically (scenario S2:
/// "After clock advances 2s").
pub trait Clock: Send + Sync {
    /// The current wall-clock instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock whose value is set explicitly by the test and only ever moves
/// forward when the test tells it to.
///
/// Cloning shares the same underlying instant (it is reference-counted),
/// so a single `TestClock` can be handed to every component under test and
/// advanced once to move the whole system forward.
#[derive(Debug, Clone)]
pub struct TestClock {
    millis_since_epoch: Arc<AtomicI64>,
}

impl TestClock {
    /// Start the clock at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis_since_epoch: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Move the clock forward by `duration`. Panics if `duration` is negative
    /// — a `TestClock` only ever advances, matching the monotonic reads the
    /// core assumes.
    pub fn advance(&self, duration: chrono::Duration) {
        assert!(duration >= chrono::Duration::zero(), "TestClock cannot move backward");
        self.millis_since_epoch
            .fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
    }

    /// Set the clock to an absolute instant. Used by replay/boot tests that
    /// need to pin "now" to a specific value rather than advance relatively.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.millis_since_epoch
            .store(instant.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis_since_epoch.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).expect("TestClock millis always in range")
    }
}
