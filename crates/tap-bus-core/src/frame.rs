//! Frames a subscriber receives from an opened stream (`spec.md` §4.8).

use tap_store_core::EventRecord;
use tap_types::ResourceId;

/// One resource's starting watermark for resume mode: only events with
/// `seq` strictly greater than `seq_hi` are delivered for this resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResumeWatermark {
    /// The resource to resume.
    pub resource: ResourceId,
    /// The highest `seq` the caller has already observed for this resource.
    pub seq_hi: u64,
}

/// A resource's bootstrap seed: the window an integrator's Snapshot
/// Projector produced as-of a just-issued Cut, paired with the watermark
/// subsequent live events must exceed.
#[derive(Clone, Debug, PartialEq)]
pub struct BootstrapSeed {
    /// The resource this seed describes.
    pub resource: ResourceId,
    /// `seqHi` of the implicit cut issued for this subscription.
    pub as_of_seq: u64,
    /// The snapshot window, opaque to the multiplexer. Callers pass
    /// whatever their Snapshot Projector returned for this resource.
    pub window: serde_json::Value,
}

/// How a stream subscription is opened (`spec.md` §4.8).
#[derive(Clone, Debug, PartialEq)]
pub enum OpenMode {
    /// `includeBootstrap=true` with no `after`: one [`StreamFrame::Bootstrap`]
    /// per resource, then live events strictly after each seed's
    /// `as_of_seq`.
    Bootstrap {
        /// One seed per subscribed resource.
        seeds: Vec<BootstrapSeed>,
    },
    /// `after=[{resource,seqHi}]`: no bootstrap frame, just events strictly
    /// after each listed watermark.
    Resume {
        /// One watermark per subscribed resource.
        after: Vec<ResumeWatermark>,
    },
}

/// A single frame delivered to a stream subscriber.
///
/// This is the multiplexer's internal representation; encoding it onto a
/// wire transport (the envelope in `spec.md` §6) is an integrator concern
/// outside this core's scope.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamFrame {
    /// Emitted once per bootstrapped resource before any live events.
    Bootstrap {
        /// The resource this bootstrap frame describes.
        resource: ResourceId,
        /// `seqHi` at the moment the implicit cut was issued.
        as_of_seq: u64,
        /// The snapshot window, echoed from the seed.
        window: serde_json::Value,
    },
    /// A single ordered, per-resource event.
    Event(EventRecord),
    /// Sent when no event has been emitted for the subscription's
    /// `heartbeatSec`.
    Heartbeat,
}
