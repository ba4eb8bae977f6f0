//! In-memory [`EventLog`] driver.
//!
//! Grounded in `toka-store-memory::MemoryBackend`: a `DashMap` keyed by
//! partition (there, `EventId`; here, `ResourceId`) guarding per-partition
//! state behind an async lock. Generalized here to support the
//! all-or-nothing multi-resource append `spec.md` §5 requires by acquiring
//! every touched resource's lock in lexicographic order before mutating
//! any of them.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;

use tap_store_core::{EventLog, EventRecord, PendingEvent, StorageError};
use tap_types::{IdempotencyKey, ResourceId};

/// An in-memory, non-persistent event log.
///
/// All data is lost when the process terminates; durable backends are an
/// integrator concern out of this core's scope (`spec.md` §1).
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    resources: DashMap<ResourceId, Arc<RwLock<Vec<EventRecord>>>>,
}

impl MemoryEventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, resource: &ResourceId) -> Arc<RwLock<Vec<EventRecord>>> {
        self.resources
            .entry(resource.clone())
            .or_insert_with(|| Arc::new(RwLock::new(Vec::new())))
            .value()
            .clone()
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn append_atomic(
        &self,
        events: Vec<PendingEvent>,
        source_idem: Option<IdempotencyKey>,
        ts: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, StorageError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        // Resolve every touched resource's partition up front, keyed in a
        // BTreeMap so iteration below acquires locks in canonical
        // (lexicographic) order and can never deadlock against a
        // concurrent multi-resource append (spec.md §5).
        let mut partitions: BTreeMap<ResourceId, Arc<RwLock<Vec<EventRecord>>>> = BTreeMap::new();
        for e in &events {
            partitions
                .entry(e.resource.clone())
                .or_insert_with(|| self.partition(&e.resource));
        }

        let mut guards = BTreeMap::new();
        for (resource, partition) in &partitions {
            guards.insert(resource.clone(), partition.write().await);
        }

        let mut committed = Vec::with_capacity(events.len());
        for pending in events {
            let guard = guards
                .get_mut(&pending.resource)
                .expect("partition resolved above");
            let seq = guard.len() as u64;
            let record = EventRecord {
                resource: pending.resource,
                seq,
                ts,
                source_idem: source_idem.clone(),
                body: pending.body,
            };
            guard.push(record.clone());
            committed.push(record);
        }
        Ok(committed)
    }

    async fn read(
        &self,
        resource: &ResourceId,
        after_seq: Option<u64>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, StorageError> {
        let Some(partition) = self.resources.get(resource).map(|e| e.value().clone()) else {
            return Ok(Vec::new());
        };
        let guard = partition.read().await;
        Ok(guard
            .iter()
            .filter(|record| after_seq.map_or(true, |after| record.seq > after))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn seq_hi(&self, resource: &ResourceId) -> Result<Option<u64>, StorageError> {
        let Some(partition) = self.resources.get(resource).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        let guard = partition.read().await;
        Ok(guard.last().map(|record| record.seq))
    }

    async fn known_resources(&self) -> Result<Vec<ResourceId>, StorageError> {
        Ok(self.resources.iter().map(|e| e.key().clone()).collect())
    }
}
