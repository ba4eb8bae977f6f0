#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tap-store-memory** – the in-memory reference [`EventLog`] and
//! [`IdempotencyStore`] drivers this workspace ships.
//!
//! Durable backends (sled, a SQL store, whatever an integrator chooses) are
//! out of this core's scope (`spec.md` §1); this crate exists so the engine
//! and its tests have a concrete, dependency-free implementation to run
//! against.
//!
//! [`EventLog`]: tap_store_core::EventLog
//! [`IdempotencyStore`]: tap_store_core::IdempotencyStore

mod idempotency;
mod log;

pub use idempotency::MemoryIdempotencyStore;
pub use log::MemoryEventLog;
