#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tap-engine** – the Allocation Engine: the five mutation commands
//! (`spec.md` §4.5), the Hold Table (§4.4), the Allocation Index, the Cut
//! Manager (§4.6), the Snapshot Projector (§4.7), and the two pure query
//! operations `feasible.check`/`freebusy.get` (`SPEC_FULL.md` §4.9).
//!
//! The per-resource actor model — one `Arc<RwLock<ResourceState>>` per
//! resource in a `DashMap`, locked in canonical URN order for
//! multi-resource commands — is grounded in
//! `other_examples/028850f2_open-tap-deltat`'s `Engine::state:
//! DashMap<Ulid, SharedResourceState>`, generalized from single-resource
//! to globally-ordered multi-resource locking (`spec.md` §5).

mod allocation_index;
mod cut;
mod engine;
mod fold;
mod hold_table;
mod query;
mod resource;
mod snapshot;

pub use engine::AllocationEngine;
pub use query::{Busy, BusyKind, FeasibleResult, FreeBusyResult, Shortfall};
pub use snapshot::SnapshotPage;
