//! Wire envelope and command discriminants (`spec.md` §6).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id::{ActorId, HoldId, IdempotencyKey, ResourceId};
use crate::interval::Interval;

/// The envelope's top-level message category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// A mutation request.
    Cmd,
    /// An authoritative, immutable fact emitted by the core.
    Evt,
    /// A read-only request.
    Qry,
    /// A reply to a query.
    Rpy,
    /// A closed-set error response.
    Err,
}

/// Every exchanged message carries this envelope around a typed payload.
///
/// Discriminants (the `type` field, populated by callers from the `TYPE`
/// constant of the concrete payload) are forever-verbs: §6 "Evolution
/// rules" forbids renaming or reusing them, only appending new ones.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<P> {
    /// Envelope wire-format version.
    pub v: u32,
    /// Unique message id.
    pub id: Uuid,
    /// Wall-clock timestamp the message was produced, supplied by the
    /// caller's Clock (§9: the core never reads a system clock directly).
    pub ts: chrono::DateTime<chrono::Utc>,
    /// Originating actor.
    pub issuer: ActorId,
    /// Optional subject the message concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subj: Option<String>,
    /// Correlates a reply to its originating request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corr: Option<Uuid>,
    /// Identifies the message that causally produced this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caus: Option<Uuid>,
    /// Free-form metadata, opaque to the core.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    /// Out-of-band signature, verified by an external collaborator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
    /// Top-level message category.
    pub kind: Kind,
    /// Discriminant selecting the payload shape (a forever-verb).
    #[serde(rename = "type")]
    pub ty: &'static str,
    /// The typed payload.
    pub payload: P,
}

impl<P> Envelope<P> {
    /// Wrap a payload in a `cmd` envelope.
    pub fn command(id: Uuid, ts: chrono::DateTime<chrono::Utc>, issuer: ActorId, ty: &'static str, payload: P) -> Self {
        Self {
            v: 1,
            id,
            ts,
            issuer,
            subj: None,
            corr: None,
            caus: None,
            meta: None,
            sig: None,
            kind: Kind::Cmd,
            ty,
            payload,
        }
    }
}

/// Discriminant string for [`Command::SupplyDelta`].
pub const TYPE_SUPPLY_DELTA: &str = "supply.delta";
/// Discriminant string for [`Command::HoldPlace`].
pub const TYPE_HOLD_PLACE: &str = "hold.place";
/// Discriminant string for [`Command::HoldConfirm`].
pub const TYPE_HOLD_CONFIRM: &str = "hold.confirm";
/// Discriminant string for [`Command::HoldRelease`].
pub const TYPE_HOLD_RELEASE: &str = "hold.release";
/// Discriminant string for [`Command::AllocCancel`].
pub const TYPE_ALLOC_CANCEL: &str = "alloc.cancel";

/// `supply.delta` — adjust a resource's published supply over an interval.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SupplyDeltaCmd {
    /// Target resource.
    pub resource: ResourceId,
    /// Interval the delta applies to.
    pub interval: Interval,
    /// Signed capacity delta.
    pub delta: i64,
    /// Idempotency key.
    pub idem: IdempotencyKey,
}

/// `hold.place` — reserve capacity on one or more resources without
/// committing it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HoldPlaceCmd {
    /// Resources the hold spans. `|resources| == |demands|`.
    pub resources: Vec<ResourceId>,
    /// Interval the hold spans on every listed resource.
    pub interval: Interval,
    /// Per-resource demand, positionally matched to `resources`.
    pub demands: Vec<i64>,
    /// Seconds until the hold expires if not confirmed or released.
    pub ttl_sec: u64,
    /// Idempotency key.
    pub idem: IdempotencyKey,
}

/// `hold.confirm` — convert an active hold into a committed allocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HoldConfirmCmd {
    /// Hold to confirm.
    pub hold_id: HoldId,
    /// Idempotency key.
    pub idem: IdempotencyKey,
}

/// `hold.release` — abandon an active hold before it is confirmed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HoldReleaseCmd {
    /// Hold to release.
    pub hold_id: HoldId,
    /// Optional caller-supplied reason.
    pub reason: Option<String>,
    /// Idempotency key.
    pub idem: IdempotencyKey,
}

/// `alloc.cancel` — release a previously committed allocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AllocCancelCmd {
    /// Allocation to cancel.
    pub allocation_id: crate::id::AllocationId,
    /// Optional caller-supplied reason.
    pub reason: Option<String>,
    /// Idempotency key.
    pub idem: IdempotencyKey,
}

/// The five mutation commands the Allocation Engine accepts (`spec.md`
/// §4.5, §6). Discriminants are forever-verbs: new commands may be added
/// as new variants, but existing ones are never renamed or repurposed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// See [`SupplyDeltaCmd`].
    #[serde(rename = "supply.delta")]
    SupplyDelta(SupplyDeltaCmd),
    /// See [`HoldPlaceCmd`].
    #[serde(rename = "hold.place")]
    HoldPlace(HoldPlaceCmd),
    /// See [`HoldConfirmCmd`].
    #[serde(rename = "hold.confirm")]
    HoldConfirm(HoldConfirmCmd),
    /// See [`HoldReleaseCmd`].
    #[serde(rename = "hold.release")]
    HoldRelease(HoldReleaseCmd),
    /// See [`AllocCancelCmd`].
    #[serde(rename = "alloc.cancel")]
    AllocCancel(AllocCancelCmd),
}

impl Command {
    /// The idempotency key every command carries (§4.5 "All commands
    /// share preconditions ... idempotency check").
    pub fn idem(&self) -> &IdempotencyKey {
        match self {
            Command::SupplyDelta(c) => &c.idem,
            Command::HoldPlace(c) => &c.idem,
            Command::HoldConfirm(c) => &c.idem,
            Command::HoldRelease(c) => &c.idem,
            Command::AllocCancel(c) => &c.idem,
        }
    }

    /// The wire discriminant for this command.
    pub fn type_name(&self) -> &'static str {
        match self {
            Command::SupplyDelta(_) => TYPE_SUPPLY_DELTA,
            Command::HoldPlace(_) => TYPE_HOLD_PLACE,
            Command::HoldConfirm(_) => TYPE_HOLD_CONFIRM,
            Command::HoldRelease(_) => TYPE_HOLD_RELEASE,
            Command::AllocCancel(_) => TYPE_ALLOC_CANCEL,
        }
    }

    /// The resources a command touches, in the canonical lock-acquisition
    /// order required for multi-resource commands (§5: "globally
    /// consistent order (by resource urn lexicographic)").
    ///
    /// Returns `None` for commands that address a hold/allocation by id
    /// rather than by resource list directly; callers resolve those via
    /// the Hold Table / Allocation Index first.
    pub fn resources(&self) -> Option<&[ResourceId]> {
        match self {
            Command::SupplyDelta(c) => Some(std::slice::from_ref(&c.resource)),
            Command::HoldPlace(c) => Some(&c.resources),
            Command::HoldConfirm(_) | Command::HoldRelease(_) | Command::AllocCancel(_) => None,
        }
    }
}

/// Order a resource list into the canonical multi-resource lock order:
/// lexicographic by URN, de-duplicated (§5).
pub fn canonical_lock_order(resources: &[ResourceId]) -> Vec<ResourceId> {
    let mut ordered: Vec<ResourceId> = resources.to_vec();
    ordered.sort();
    ordered.dedup();
    ordered
}
