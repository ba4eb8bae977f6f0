//! In-memory [`IdempotencyStore`] driver.
//!
//! Grounded in the same `DashMap`-per-key pattern as
//! [`crate::log::MemoryEventLog`]: a single map from [`IdempotencyKey`] to
//! the digest and events of the command that first claimed it.

use dashmap::DashMap;

use tap_store_core::{EventRecord, IdempotencyLookup, IdempotencyStore, StorageError};
use tap_types::IdempotencyKey;

#[derive(Debug, Clone)]
struct Entry {
    digest: String,
    events: Vec<EventRecord>,
}

/// An in-memory, non-persistent idempotency store.
///
/// First write wins: the digest recorded by the first [`record`] call for a
/// key is authoritative for the lifetime of the process (`spec.md` §4.3).
///
/// [`record`]: IdempotencyStore::record
#[derive(Debug, Default)]
pub struct MemoryIdempotencyStore {
    entries: DashMap<IdempotencyKey, Entry>,
}

impl MemoryIdempotencyStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl IdempotencyStore for MemoryIdempotencyStore {
    async fn lookup(
        &self,
        key: &IdempotencyKey,
        command_digest: &str,
    ) -> Result<Option<IdempotencyLookup>, StorageError> {
        Ok(self.entries.get(key).map(|entry| {
            if entry.digest == command_digest {
                IdempotencyLookup::Replay(entry.events.clone())
            } else {
                IdempotencyLookup::Conflict
            }
        }))
    }

    async fn record(
        &self,
        key: &IdempotencyKey,
        command_digest: &str,
        events: Vec<EventRecord>,
    ) -> Result<(), StorageError> {
        self.entries.insert(
            key.clone(),
            Entry {
                digest: command_digest.to_owned(),
                events,
            },
        );
        Ok(())
    }
}
