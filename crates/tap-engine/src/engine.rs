//! Allocation Engine (`spec.md` §4.5): wires the Event Log, Idempotency
//! Store, Hold Table, Allocation Index, Cut Manager and Stream
//! Multiplexer together and dispatches the five mutation commands plus
//! the two pure queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::info;

use dashmap::DashMap;
use tap_bus_core::StreamMultiplexer;
use tap_clock::Clock;
use tap_store_core::{
    command_digest, Cut, EventBody, EventLog, EventRecord, IdempotencyLookup, IdempotencyStore,
    PendingEvent, StorageError,
};
use tap_types::{
    canonical_lock_order, AllocCancelCmd, AllocationId, Command, HoldConfirmCmd, HoldId,
    HoldPlaceCmd, HoldReleaseCmd, Interval, ResourceId, SupplyDeltaCmd, TapError, TapResult,
};

use crate::allocation_index::AllocationIndex;
use crate::cut::CutManager;
use crate::fold::fold_event;
use crate::hold_table::HoldTable;
use crate::query::{self, FeasibleResult, FreeBusyResult};
use crate::resource::{negate, ResourceState};
use crate::snapshot::{self, SnapshotPage};

fn store_err(e: StorageError) -> TapError {
    match e {
        // The only variant that names a domain-meaningful outcome rather
        // than a retryable storage hiccup (`spec.md` §4.2 "not_found").
        StorageError::Retired { resource } => {
            TapError::NotFound(format!("{resource} has been retired from the retained log"))
        }
        other => TapError::Internal(other.to_string()),
    }
}

/// Everything the Allocation Engine needs injected: a [`Clock`], an
/// [`EventLog`], an [`IdempotencyStore`], and a [`StreamMultiplexer`] to
/// publish committed events to.
pub struct AllocationEngine {
    clock: Arc<dyn Clock>,
    log: Arc<dyn EventLog>,
    idempotency: Arc<dyn IdempotencyStore>,
    bus: Arc<StreamMultiplexer>,
    resources: DashMap<ResourceId, Arc<RwLock<ResourceState>>>,
    holds: HoldTable,
    allocations: AllocationIndex,
    cuts: CutManager,
}

impl AllocationEngine {
    /// Build an engine over the given backends. Callers that already have
    /// a non-empty [`EventLog`] (i.e. are booting, not starting fresh)
    /// must replay its full tail through [`AllocationEngine::apply_replayed`]
    /// before accepting commands (`SPEC_FULL.md` §3a) — `tap-runtime` owns
    /// that sequencing.
    pub fn new(
        clock: Arc<dyn Clock>,
        log: Arc<dyn EventLog>,
        idempotency: Arc<dyn IdempotencyStore>,
        bus: Arc<StreamMultiplexer>,
    ) -> Self {
        let cuts = CutManager::new(log.clone(), clock.clone());
        Self {
            clock,
            log,
            idempotency,
            bus,
            resources: DashMap::new(),
            holds: HoldTable::new(),
            allocations: AllocationIndex::new(),
            cuts,
        }
    }

    fn resource_handle(&self, resource: &ResourceId) -> Arc<RwLock<ResourceState>> {
        self.resources
            .entry(resource.clone())
            .or_insert_with(|| Arc::new(RwLock::new(ResourceState::new())))
            .value()
            .clone()
    }

    /// Fold one already-committed event into live projected state, without
    /// appending or publishing anything. Used by boot-time replay and by
    /// [`AllocationEngine::submit`] after its own successful appends.
    pub async fn apply_replayed(&self, record: &EventRecord) {
        let handle = self.resource_handle(&record.resource);
        let mut state = handle.write().await;
        fold_event(&mut state, &self.holds, &self.allocations, record);
    }

    /// Acquire write locks on `resources` in canonical (lexicographic)
    /// order, matching `tap-store-memory::MemoryEventLog::append_atomic`'s
    /// deadlock-free acquisition discipline (`spec.md` §5).
    async fn lock_resources(
        &self,
        resources: &[ResourceId],
    ) -> BTreeMap<ResourceId, OwnedRwLockWriteGuard<ResourceState>> {
        let ordered = canonical_lock_order(resources);
        let mut guards = BTreeMap::new();
        for resource in ordered {
            let handle = self.resource_handle(&resource);
            guards.insert(resource, handle.write_owned().await);
        }
        guards
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Submit one command. On success, returns the events it produced (one
    /// per touched resource) in commit order. A replayed idempotency key
    /// returns the original events without re-validating or re-appending
    /// anything (`spec.md` §4.5: "share preconditions ... idempotency
    /// check").
    pub async fn submit(&self, command: Command) -> TapResult<Vec<EventRecord>> {
        match command {
            Command::SupplyDelta(cmd) => self.submit_supply_delta(cmd).await,
            Command::HoldPlace(cmd) => self.submit_hold_place(cmd).await,
            Command::HoldConfirm(cmd) => self.submit_hold_confirm(cmd).await,
            Command::HoldRelease(cmd) => self.submit_hold_release(cmd).await,
            Command::AllocCancel(cmd) => self.submit_alloc_cancel(cmd).await,
        }
    }

    async fn submit_supply_delta(&self, cmd: SupplyDeltaCmd) -> TapResult<Vec<EventRecord>> {
        let digest = command_digest(&serde_json::to_string(&Command::SupplyDelta(cmd.clone())).unwrap());
        let mut guards = self.lock_resources(std::slice::from_ref(&cmd.resource)).await;

        match self.idempotency.lookup(&cmd.idem, &digest).await.map_err(store_err)? {
            Some(IdempotencyLookup::Replay(events)) => return Ok(events),
            Some(IdempotencyLookup::Conflict) => return Err(TapError::Conflict(cmd.idem.to_string())),
            None => {}
        }

        let state = guards.get(&cmd.resource).expect("locked above");
        if cmd.delta < 0 {
            let mut projected = state.supply.clone();
            projected.add_interval_delta(cmd.interval, cmd.delta);
            let available = projected.merge(&negate(&state.allocation));
            let minimum = available.min_over(cmd.interval);
            if minimum < 0 {
                return Err(TapError::CapacityViolation {
                    resource: cmd.resource.to_string(),
                    requested: -cmd.delta,
                    available: minimum,
                });
            }
        }

        let events = self
            .log
            .append_atomic(
                vec![PendingEvent {
                    resource: cmd.resource.clone(),
                    body: EventBody::SupplyDeltaApplied { interval: cmd.interval, delta: cmd.delta },
                }],
                Some(cmd.idem.clone()),
                self.now(),
            )
            .await
            .map_err(store_err)?;

        self.commit(&mut guards, &events, &cmd.idem, &digest).await?;
        Ok(events)
    }

    async fn submit_hold_place(&self, cmd: HoldPlaceCmd) -> TapResult<Vec<EventRecord>> {
        let digest = command_digest(&serde_json::to_string(&Command::HoldPlace(cmd.clone())).unwrap());
        let mut guards = self.lock_resources(&cmd.resources).await;

        match self.idempotency.lookup(&cmd.idem, &digest).await.map_err(store_err)? {
            Some(IdempotencyLookup::Replay(events)) => return Ok(events),
            Some(IdempotencyLookup::Conflict) => return Err(TapError::Conflict(cmd.idem.to_string())),
            None => {}
        }

        self.lazy_expire_contained_holds(&mut guards).await?;

        for (resource, demand) in cmd.resources.iter().zip(&cmd.demands) {
            let state = guards.get(resource).expect("locked above");
            let available = query::available_timeline(state, &self.holds, resource, self.now());
            let minimum = available.min_over(cmd.interval);
            if minimum < *demand {
                return Err(TapError::CapacityViolation {
                    resource: resource.to_string(),
                    requested: *demand,
                    available: minimum,
                });
            }
        }

        let hold_id = HoldId::fresh();
        let expires_at = self.now() + chrono::Duration::seconds(cmd.ttl_sec as i64);
        let pending = cmd
            .resources
            .iter()
            .zip(&cmd.demands)
            .map(|(resource, demand)| PendingEvent {
                resource: resource.clone(),
                body: EventBody::HoldPlaced {
                    hold_id: hold_id.clone(),
                    interval: cmd.interval,
                    demand: *demand,
                    expires_at,
                },
            })
            .collect();

        let events = self
            .log
            .append_atomic(pending, Some(cmd.idem.clone()), self.now())
            .await
            .map_err(store_err)?;

        self.commit(&mut guards, &events, &cmd.idem, &digest).await?;
        Ok(events)
    }

    async fn submit_hold_confirm(&self, cmd: HoldConfirmCmd) -> TapResult<Vec<EventRecord>> {
        let digest = command_digest(&serde_json::to_string(&Command::HoldConfirm(cmd.clone())).unwrap());
        let Some(hold) = self.holds.get(&cmd.hold_id) else {
            return Err(TapError::NotFound(format!("hold {}", cmd.hold_id)));
        };
        let mut guards = self.lock_resources(&hold.resources).await;

        match self.idempotency.lookup(&cmd.idem, &digest).await.map_err(store_err)? {
            Some(IdempotencyLookup::Replay(events)) => return Ok(events),
            Some(IdempotencyLookup::Conflict) => return Err(TapError::Conflict(cmd.idem.to_string())),
            None => {}
        }

        let Some(hold) = self.holds.get(&cmd.hold_id) else {
            return Err(TapError::NotFound(format!("hold {}", cmd.hold_id)));
        };
        if hold.state != tap_store_core::HoldState::Active {
            return Err(TapError::NotFound(format!("hold {} is not active", cmd.hold_id)));
        }
        if hold.expires_at <= self.now() {
            return Err(TapError::ExpiredHold(cmd.hold_id.to_string()));
        }

        let allocation_id = AllocationId::fresh();
        let pending = hold
            .resources
            .iter()
            .zip(&hold.demands)
            .map(|(resource, demand)| PendingEvent {
                resource: resource.clone(),
                body: EventBody::AllocCommitted {
                    allocation_id: allocation_id.clone(),
                    hold_id: cmd.hold_id.clone(),
                    interval: hold.interval,
                    demand: *demand,
                },
            })
            .collect();

        let events = self
            .log
            .append_atomic(pending, Some(cmd.idem.clone()), self.now())
            .await
            .map_err(store_err)?;

        self.commit(&mut guards, &events, &cmd.idem, &digest).await?;
        Ok(events)
    }

    async fn submit_hold_release(&self, cmd: HoldReleaseCmd) -> TapResult<Vec<EventRecord>> {
        let digest = command_digest(&serde_json::to_string(&Command::HoldRelease(cmd.clone())).unwrap());
        let Some(hold) = self.holds.get(&cmd.hold_id) else {
            return Err(TapError::NotFound(format!("hold {}", cmd.hold_id)));
        };
        let mut guards = self.lock_resources(&hold.resources).await;

        match self.idempotency.lookup(&cmd.idem, &digest).await.map_err(store_err)? {
            Some(IdempotencyLookup::Replay(events)) => return Ok(events),
            Some(IdempotencyLookup::Conflict) => return Err(TapError::Conflict(cmd.idem.to_string())),
            None => {}
        }

        let Some(hold) = self.holds.get(&cmd.hold_id) else {
            return Err(TapError::NotFound(format!("hold {}", cmd.hold_id)));
        };
        if hold.state != tap_store_core::HoldState::Active {
            return Err(TapError::NotFound(format!("hold {} is not active", cmd.hold_id)));
        }

        let reason = cmd.reason.clone().unwrap_or_else(|| "released".to_owned());
        let pending = hold
            .resources
            .iter()
            .map(|resource| PendingEvent {
                resource: resource.clone(),
                body: EventBody::HoldReleased { hold_id: cmd.hold_id.clone(), reason: reason.clone() },
            })
            .collect();

        let events = self
            .log
            .append_atomic(pending, Some(cmd.idem.clone()), self.now())
            .await
            .map_err(store_err)?;

        self.commit(&mut guards, &events, &cmd.idem, &digest).await?;
        Ok(events)
    }

    async fn submit_alloc_cancel(&self, cmd: AllocCancelCmd) -> TapResult<Vec<EventRecord>> {
        let digest = command_digest(&serde_json::to_string(&Command::AllocCancel(cmd.clone())).unwrap());
        let Some(alloc) = self.allocations.get(&cmd.allocation_id) else {
            return Err(TapError::NotFound(format!("allocation {}", cmd.allocation_id)));
        };
        let mut guards = self.lock_resources(&alloc.resources).await;

        match self.idempotency.lookup(&cmd.idem, &digest).await.map_err(store_err)? {
            Some(IdempotencyLookup::Replay(events)) => return Ok(events),
            Some(IdempotencyLookup::Conflict) => return Err(TapError::Conflict(cmd.idem.to_string())),
            None => {}
        }

        let Some(alloc) = self.allocations.get(&cmd.allocation_id) else {
            return Err(TapError::NotFound(format!("allocation {}", cmd.allocation_id)));
        };
        if alloc.state != tap_store_core::AllocationState::Committed {
            return Err(TapError::NotFound(format!("allocation {} is not committed", cmd.allocation_id)));
        }

        let reason = cmd.reason.clone().unwrap_or_else(|| "canceled".to_owned());
        let pending = alloc
            .resources
            .iter()
            .map(|resource| PendingEvent {
                resource: resource.clone(),
                body: EventBody::AllocCanceled { allocation_id: cmd.allocation_id.clone(), reason: reason.clone() },
            })
            .collect();

        let events = self
            .log
            .append_atomic(pending, Some(cmd.idem.clone()), self.now())
            .await
            .map_err(store_err)?;

        self.commit(&mut guards, &events, &cmd.idem, &digest).await?;
        Ok(events)
    }

    /// Fold freshly-committed events into live state, publish them, then
    /// record the idempotency key — in that order, so a crash between
    /// append and record simply means the next retry replays from the log
    /// instead of the idempotency store (both observably equivalent).
    async fn commit(
        &self,
        guards: &mut BTreeMap<ResourceId, OwnedRwLockWriteGuard<ResourceState>>,
        events: &[EventRecord],
        idem: &tap_types::IdempotencyKey,
        digest: &str,
    ) -> TapResult<()> {
        for record in events {
            let state = guards.get_mut(&record.resource).expect("locked above");
            fold_event(state, &self.holds, &self.allocations, record);
            self.bus.publish(record.clone());
        }
        self.idempotency
            .record(idem, digest, events.to_vec())
            .await
            .map_err(store_err)?;
        Ok(())
    }

    /// Emit `hold.released{reason="expired"}` for every stale hold whose
    /// full resource span is contained in `guards` — the locks we already
    /// hold. Holds spanning a resource outside this command's set are left
    /// for the background sweeper, which locks a hold's full span itself
    /// (`SPEC_FULL.md` §5); `is_effectively_active`'s TTL filter already
    /// keeps such holds out of every availability computation regardless.
    async fn lazy_expire_contained_holds(
        &self,
        guards: &mut BTreeMap<ResourceId, OwnedRwLockWriteGuard<ResourceState>>,
    ) -> TapResult<()> {
        let locked: Vec<ResourceId> = guards.keys().cloned().collect();
        let now = self.now();
        let stale = self.holds.stale_for_resources(&locked, now);

        let mut pending = Vec::new();
        for hold_id in &stale {
            let Some(hold) = self.holds.get(hold_id) else { continue };
            if !hold.resources.iter().all(|r| guards.contains_key(r)) {
                continue;
            }
            for resource in &hold.resources {
                pending.push(PendingEvent {
                    resource: resource.clone(),
                    body: EventBody::HoldReleased { hold_id: hold_id.clone(), reason: "expired".to_owned() },
                });
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let events = self.log.append_atomic(pending, None, now).await.map_err(store_err)?;
        for record in &events {
            let state = guards.get_mut(&record.resource).expect("subset of locked resources");
            fold_event(state, &self.holds, &self.allocations, record);
            self.bus.publish(record.clone());
        }
        Ok(())
    }

    /// Background sweeper entry point (`SPEC_FULL.md` §4.4): lazily expire
    /// every stale hold in the table, locking each hold's full resource
    /// span itself. Run on a `tokio::time::interval` by `tap-runtime`, or
    /// disabled (zero interval) for deterministic lazy-expiry tests.
    pub async fn sweep_expired_holds(&self) -> TapResult<()> {
        let now = self.now();
        for hold_id in self.holds.all_stale(now) {
            let Some(hold) = self.holds.get(&hold_id) else { continue };
            // Re-check staleness under lock: another path may have already
            // released or confirmed this hold since `all_stale` snapshotted it.
            let mut guards = self.lock_resources(&hold.resources).await;
            let Some(hold) = self.holds.get(&hold_id) else { continue };
            if hold.state != tap_store_core::HoldState::Active || hold.expires_at > now {
                continue;
            }
            let pending = hold
                .resources
                .iter()
                .map(|resource| PendingEvent {
                    resource: resource.clone(),
                    body: EventBody::HoldReleased { hold_id: hold_id.clone(), reason: "expired".to_owned() },
                })
                .collect();
            let events = self.log.append_atomic(pending, None, now).await.map_err(store_err)?;
            for record in &events {
                let state = guards.get_mut(&record.resource).expect("locked above");
                fold_event(state, &self.holds, &self.allocations, record);
                self.bus.publish(record.clone());
            }
            info!(hold = %hold_id, "swept expired hold");
        }
        Ok(())
    }

    /// `cut.create` (`spec.md` §4.6).
    pub async fn create_cut(&self, resources: &[ResourceId]) -> TapResult<Cut> {
        self.cuts.create(resources).await.map_err(store_err)
    }

    /// `state.snapshot` (`spec.md` §4.7): reconstruct `resource`'s
    /// timelines as of `cut`'s `seqHi`, clipped to `window` and paginated.
    pub async fn snapshot(
        &self,
        cut_id: &tap_types::CutId,
        resource: &ResourceId,
        window: Interval,
        page_after: Option<tap_types::Instant>,
        page_size: usize,
    ) -> TapResult<SnapshotPage> {
        let cut = self.cuts.get(cut_id).ok_or_else(|| TapError::NotFound(format!("cut {cut_id}")))?;
        let Some(seq_hi) = cut.seq_for(resource) else {
            return Err(TapError::NotFound(format!("resource {resource} not part of cut {cut_id}")));
        };
        snapshot::reconstruct_as_of(&self.log, resource, seq_hi, window, page_after, page_size).await
    }

    /// `feasible.check` (`SPEC_FULL.md` §4.9).
    pub async fn feasible_check(
        &self,
        resources: &[ResourceId],
        interval: Interval,
        demands: &[i64],
    ) -> TapResult<FeasibleResult> {
        if resources.len() != demands.len() {
            return Err(TapError::BadRequest("resources and demands length mismatch".to_owned()));
        }
        let mut handles = Vec::with_capacity(resources.len());
        for resource in resources {
            handles.push((resource.clone(), self.resource_handle(resource)));
        }
        let mut guards = Vec::with_capacity(handles.len());
        for (resource, handle) in &handles {
            guards.push((resource.clone(), handle.read().await));
        }
        let views: Vec<_> = guards.iter().map(|(r, g)| (r.clone(), &**g, &self.holds)).collect();
        Ok(query::feasible_check(&views, interval, demands, self.now()))
    }

    /// `freebusy.get` (`SPEC_FULL.md` §4.9).
    pub async fn freebusy(&self, resource: &ResourceId, window: Interval) -> TapResult<FreeBusyResult> {
        let handle = self.resource_handle(resource);
        let state = handle.read().await;
        Ok(query::freebusy(&state, &self.holds, resource, window, self.now()))
    }
}
