//! Event Log contract (`spec.md` §4.2).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tap_types::{IdempotencyKey, ResourceId};

use crate::error::StorageError;
use crate::event::{EventBody, EventRecord};

/// One event body destined for a specific resource, prior to sequence
/// assignment. Used to describe a multi-resource append request.
#[derive(Clone, Debug)]
pub struct PendingEvent {
    /// Target resource.
    pub resource: ResourceId,
    /// Event payload.
    pub body: EventBody,
}

/// Append-only, per-resource ordered log of immutable events.
///
/// Implementations must guarantee:
/// * **durable-before-ack** — `append`/`append_atomic` return only after
///   the records are durable in the backing store.
/// * **strict-successor ordering** — concurrent appends to the same
///   resource serialize such that assigned `seq` values have no gaps.
/// * **all-or-nothing multi-resource commit** — `append_atomic` either
///   commits every pending event or none of them (`spec.md` §5).
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append a single event to `resource`'s log, returning its assigned
    /// sequence number.
    async fn append(
        &self,
        resource: &ResourceId,
        body: EventBody,
        source_idem: Option<IdempotencyKey>,
        ts: DateTime<Utc>,
    ) -> Result<EventRecord, StorageError> {
        let mut committed = self
            .append_atomic(vec![PendingEvent {
                resource: resource.clone(),
                body,
            }], source_idem, ts)
            .await?;
        Ok(committed.remove(0))
    }

    /// Atomically append one event per listed resource. Either every event
    /// commits (each resource's log advances by exactly one record) or none
    /// do. Records are returned in the same order as `events`.
    async fn append_atomic(
        &self,
        events: Vec<PendingEvent>,
        source_idem: Option<IdempotencyKey>,
        ts: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, StorageError>;

    /// Events for `resource` strictly after `after_seq`, in order, capped
    /// at `limit`. `after_seq = None` reads from the very beginning of the
    /// log (seq 0 inclusive) — the genesis case `u64` alone cannot express.
    async fn read(
        &self,
        resource: &ResourceId,
        after_seq: Option<u64>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, StorageError>;

    /// The latest committed sequence number for `resource`, or `None` if
    /// the resource has no events yet.
    async fn seq_hi(&self, resource: &ResourceId) -> Result<Option<u64>, StorageError>;

    /// Every resource with at least one committed event, in no particular
    /// order. Boot-time replay (`SPEC_FULL.md` §3a) uses this to discover
    /// what to replay without an integrator having to enumerate resources
    /// up front.
    async fn known_resources(&self) -> Result<Vec<ResourceId>, StorageError>;
}
