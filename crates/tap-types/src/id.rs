//! Strongly-typed identifier kinds.
//!
//! Every identifier kind in the protocol is a distinct tagged wrapper around
//! an opaque string so that, for example, a `HoldId` can never be passed
//! where an `AllocationId` is expected even though both are plain strings on
//! the wire. This mirrors the `EntityId` newtype in the teacher workspace,
//! generalized to many id kinds via a macro instead of one tuple struct.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a brand of opaque string identifier.
macro_rules! brand_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Mint a fresh identifier from a random UUIDv4.
            pub fn fresh() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Borrow the underlying opaque string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

brand_id!(ActorId, "Identifies the caller/issuer of a command.");
brand_id!(SlotId, "Identifies a bookable sub-unit of a resource.");
brand_id!(HoldId, "Identifies a single hold, fresh-minted on `hold.place`.");
brand_id!(OrderId, "Identifies a caller-supplied order grouping multiple holds.");
brand_id!(
    AllocationId,
    "Identifies a committed allocation, fresh-minted on `hold.confirm`."
);
brand_id!(CutId, "Identifies a cross-resource watermark minted by `cut.create`.");
brand_id!(
    IdempotencyKey,
    "Client-supplied token binding a command attempt to a single outcome."
);

/// Maximum length of the opaque segment of a resource URN.
pub const RESOURCE_URN_MAX_LEN: usize = 128;

/// Identifies a bookable resource via its `urn:tap:resource:<opaque>` URN.
///
/// Unlike the other id kinds, a `ResourceId` is validated on construction:
/// the opaque segment must be 1–128 bytes of printable ASCII (§6).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

/// A `ResourceId` failed URN validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid resource urn: {0}")]
pub struct InvalidResourceUrn(pub String);

const RESOURCE_URN_PREFIX: &str = "urn:tap:resource:";

impl ResourceId {
    /// Parse and validate a resource URN.
    pub fn parse(urn: impl Into<String>) -> Result<Self, InvalidResourceUrn> {
        let urn = urn.into();
        let Some(opaque) = urn.strip_prefix(RESOURCE_URN_PREFIX) else {
            return Err(InvalidResourceUrn(urn));
        };
        if opaque.is_empty()
            || opaque.len() > RESOURCE_URN_MAX_LEN
            || !opaque.bytes().all(|b| b.is_ascii_graphic() || b == b' ')
        {
            return Err(InvalidResourceUrn(urn));
        }
        Ok(Self(urn))
    }

    /// Construct a resource URN from a bare opaque segment, e.g. `"room-42"`.
    pub fn from_opaque(opaque: impl AsRef<str>) -> Result<Self, InvalidResourceUrn> {
        Self::parse(format!("{RESOURCE_URN_PREFIX}{}", opaque.as_ref()))
    }

    /// The full URN string, e.g. `"urn:tap:resource:room-42"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = InvalidResourceUrn;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ResourceId> for String {
    fn from(value: ResourceId) -> Self {
        value.0
    }
}
