#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tap-bus-core** – the Stream Multiplexer (`spec.md` §4.8).
//!
//! Grounded in `toka-bus-core::InMemoryBus`: a broadcast channel per
//! publishable partition, generalized here from one global channel to one
//! channel per [`ResourceId`] (the same partitioning
//! `tap-store-memory::MemoryEventLog` uses), and extended with catch-up
//! reads from the [`EventLog`] so a subscriber never misses events appended
//! between computing its starting watermark and subscribing live.

mod error;
mod frame;

pub use error::StreamError;
pub use frame::{BootstrapSeed, OpenMode, ResumeWatermark, StreamFrame};

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tap_store_core::{EventLog, EventRecord};
use tap_types::{ResourceId, TapError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

const CATCH_UP_PAGE: usize = 256;

/// Fan-out point for per-resource event broadcasting and stream opening.
///
/// One [`StreamMultiplexer`] is shared across all subscribers of a runtime;
/// the Allocation Engine calls [`StreamMultiplexer::publish`] after every
/// successful append, and each open subscription is an independent
/// [`Subscription`] handle.
#[derive(Debug, Default)]
pub struct StreamMultiplexer {
    channels: DashMap<ResourceId, broadcast::Sender<EventRecord>>,
}

impl StreamMultiplexer {
    /// A multiplexer with no subscribers yet.
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, resource: &ResourceId) -> broadcast::Sender<EventRecord> {
        self.channels
            .entry(resource.clone())
            .or_insert_with(|| broadcast::channel(1024).0)
            .value()
            .clone()
    }

    /// Broadcast `record` to every live subscriber of its resource. Events
    /// with no current subscribers are simply dropped; catch-up for late
    /// subscribers comes from the [`EventLog`], not this channel.
    pub fn publish(&self, record: EventRecord) {
        let tx = self.sender_for(&record.resource);
        let _ = tx.send(record);
    }

    /// Open a subscription over `resources` in the given [`OpenMode`].
    ///
    /// `heartbeat_sec` is clamped to `[1, 300]`; the clamped value is
    /// returned on the subscription so the caller can echo it in
    /// `stream.opened` (`spec.md` §4.8).
    ///
    /// Fails with [`TapError::NotFound`] when a `resume` watermark is older
    /// than what the log still retains for that resource (`spec.md:158`);
    /// any other backing-store failure surfaces as [`TapError::Internal`].
    pub async fn open(
        &self,
        log: Arc<dyn EventLog>,
        resources: Vec<ResourceId>,
        mode: OpenMode,
        heartbeat_sec: u32,
        buffer: usize,
    ) -> Result<Subscription, TapError> {
        let heartbeat_sec = heartbeat_sec.clamp(1, 300);
        let starts = self.resolve_starts(&log, &resources, &mode).await?;

        let (tx, rx) = mpsc::channel(buffer.max(1));

        if let OpenMode::Bootstrap { seeds } = &mode {
            for seed in seeds {
                // Subscription open is best-effort on a still-starting
                // channel; a full buffer here means the caller is not
                // draining, which is their own failure to handle.
                let _ = tx
                    .send(StreamFrame::Bootstrap {
                        resource: seed.resource.clone(),
                        as_of_seq: seed.as_of_seq,
                        window: seed.window.clone(),
                    })
                    .await;
            }
        }

        let mut handles = Vec::with_capacity(starts.len());
        for (resource, after_seq) in starts {
            // Subscribe to live broadcast *before* the catch-up read so no
            // event committed after this point can be missed; the driver
            // task dedupes anything the read and the broadcast both deliver.
            let live = self.sender_for(&resource).subscribe();
            let log = log.clone();
            let out = tx.clone();
            handles.push(tokio::spawn(drive_resource(resource, after_seq, log, live, out)));
        }

        handles.push(tokio::spawn(heartbeat_task(tx, heartbeat_sec)));

        Ok(Subscription {
            frames: rx,
            heartbeat_sec,
            handles,
        })
    }

    async fn resolve_starts(
        &self,
        log: &Arc<dyn EventLog>,
        resources: &[ResourceId],
        mode: &OpenMode,
    ) -> Result<Vec<(ResourceId, u64)>, StreamError> {
        match mode {
            OpenMode::Bootstrap { seeds } => Ok(seeds
                .iter()
                .map(|seed| (seed.resource.clone(), seed.as_of_seq))
                .collect()),
            OpenMode::Resume { after } => {
                let mut starts = Vec::with_capacity(after.len());
                for watermark in after {
                    // A gap between what's requested and what the log can
                    // still produce means the tail was retired.
                    if watermark.seq_hi > 0 {
                        let probe = log.read(&watermark.resource, None, 1).await?;
                        if let Some(first) = probe.first() {
                            if first.seq > watermark.seq_hi {
                                return Err(StreamError::Retired {
                                    resource: watermark.resource.clone(),
                                });
                            }
                        }
                    }
                    starts.push((watermark.resource.clone(), watermark.seq_hi));
                }
                let _ = resources;
                Ok(starts)
            }
        }
    }
}

async fn drive_resource(
    resource: ResourceId,
    after_seq: u64,
    log: Arc<dyn EventLog>,
    mut live: broadcast::Receiver<EventRecord>,
    out: mpsc::Sender<StreamFrame>,
) {
    let mut last_seq = after_seq;
    if !catch_up(&resource, &mut last_seq, &log, &out).await {
        return;
    }

    loop {
        match live.recv().await {
            Ok(record) => {
                if record.seq <= last_seq {
                    continue;
                }
                // The broadcast may have delivered out of order relative to
                // a concurrent catch-up read; re-catch-up to close any gap
                // before forwarding this record live.
                if record.seq > last_seq + 1
                    && !catch_up(&resource, &mut last_seq, &log, &out).await
                {
                    return;
                }
                if record.seq <= last_seq {
                    continue;
                }
                last_seq = record.seq;
                if out.send(StreamFrame::Event(record)).await.is_err() {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => {
                if !catch_up(&resource, &mut last_seq, &log, &out).await {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Read and forward everything after `*last_seq`, advancing it in place.
/// Returns `false` if the output channel closed and the caller should stop.
async fn catch_up(
    resource: &ResourceId,
    last_seq: &mut u64,
    log: &Arc<dyn EventLog>,
    out: &mpsc::Sender<StreamFrame>,
) -> bool {
    loop {
        let batch = match log.read(resource, Some(*last_seq), CATCH_UP_PAGE).await {
            Ok(batch) => batch,
            Err(_) => return false,
        };
        if batch.is_empty() {
            return true;
        }
        let got_full_page = batch.len() == CATCH_UP_PAGE;
        for record in batch {
            *last_seq = record.seq;
            if out.send(StreamFrame::Event(record)).await.is_err() {
                return false;
            }
        }
        if !got_full_page {
            return true;
        }
    }
}

async fn heartbeat_task(out: mpsc::Sender<StreamFrame>, heartbeat_sec: u32) {
    let period = Duration::from_secs(heartbeat_sec as u64);
    loop {
        tokio::time::sleep(period).await;
        if out.send(StreamFrame::Heartbeat).await.is_err() {
            return;
        }
    }
}

/// A live, open subscription. Dropping it cancels all underlying work
/// immediately (`spec.md` §4.8 "Cancellation").
#[derive(Debug)]
pub struct Subscription {
    /// Frames delivered to this subscriber, in the order produced.
    pub frames: mpsc::Receiver<StreamFrame>,
    /// The heartbeat interval actually in effect, after clamping.
    pub heartbeat_sec: u32,
    handles: Vec<JoinHandle<()>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
