//! Cross-resource watermarks (`spec.md` §4.6).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tap_types::{CutId, ResourceId};

/// An immutable cross-resource watermark: each listed resource mapped to
/// its `seqHi` at the moment the cut was issued.
///
/// Cuts do not block writers (`spec.md` §4.6): a consistent cut only needs
/// to be strictly-before any later observation, not coordinated across
/// resources.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Cut {
    /// Fresh identifier for this cut.
    pub cut_id: CutId,
    /// Per-resource sequence watermark.
    pub seq_hi: BTreeMap<ResourceId, u64>,
    /// Wall-clock instant the cut was issued.
    pub issued_at: DateTime<Utc>,
}

impl Cut {
    /// The watermark for `resource`, or `None` if it was not part of this
    /// cut (or had no events yet).
    pub fn seq_for(&self, resource: &ResourceId) -> Option<u64> {
        self.seq_hi.get(resource).copied()
    }
}
