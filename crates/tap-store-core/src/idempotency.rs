//! Idempotency Store contract (`spec.md` §4.3).

use async_trait::async_trait;

use tap_types::IdempotencyKey;

use crate::error::StorageError;
use crate::event::EventRecord;

/// Result of looking up a previously-seen idempotency key.
#[derive(Debug)]
pub enum IdempotencyLookup {
    /// This key was already recorded with an identical command digest: the
    /// original events are returned and no new side effects should occur.
    Replay(Vec<EventRecord>),
    /// This key was already recorded with a *different* command digest:
    /// the caller must reject with `TapError::Conflict`.
    Conflict,
}

/// Mapping from [`IdempotencyKey`] to the event(s) previously emitted for
/// it. First write wins; replays return the original outcome (`spec.md`
/// §4.3).
///
/// Only successful commands are recorded: a command that fails domain
/// validation never reaches [`Self::record`], so its idempotency key
/// remains free for the caller to retry with the same or a corrected
/// payload (`spec.md` §7 "no partial state change is visible"). The
/// engine calls [`Self::lookup`] and [`Self::record`] while holding the
/// command's resource lock(s), so no additional claim/unclaim protocol is
/// needed to prevent concurrent double-application.
///
/// `command_digest` is an opaque, caller-computed fingerprint of the
/// canonical command (the engine uses the command's canonical JSON
/// serialization); the store only ever compares digests for equality and
/// never interprets them.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Look up `key`. Returns `None` if it has never been recorded.
    async fn lookup(
        &self,
        key: &IdempotencyKey,
        command_digest: &str,
    ) -> Result<Option<IdempotencyLookup>, StorageError>;

    /// Record the events produced by the command that owns `key`. Must be
    /// called at most once per key; callers only invoke this after a
    /// command has fully succeeded.
    async fn record(
        &self,
        key: &IdempotencyKey,
        command_digest: &str,
        events: Vec<EventRecord>,
    ) -> Result<(), StorageError>;
}
