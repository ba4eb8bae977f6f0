//! tap-cli – operator CLI for exercising the Allocation Engine end-to-end
//! against the in-memory backend.
//!
//! Grounded in `toka-cli`'s `Playground` subcommand: a REPL over a runtime
//! booted once for the process lifetime, since the in-memory backend has no
//! state to reconnect to across separate invocations. Each line typed is
//! parsed as one engine command and submitted immediately.
//!
//! ```text
//! $ cargo run -p tap-cli
//! tap> supply-delta room-1 2026-07-30T08:00:00Z 2026-07-30T20:00:00Z 5
//! tap> hold-place room-1 2026-07-30T09:00:00Z 2026-07-30T10:00:00Z 3 60
//! tap> hold-confirm <hold-id from above>
//! tap> exit
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::io::{self, AsyncBufReadExt};
use tracing::info;

use tap_engine::AllocationEngine;
use tap_runtime::{init_tracing, Runtime, RuntimeConfig};
use tap_types::{HoldId, Instant, Interval, ResourceId};

#[derive(Parser)]
#[command(name = "tap", no_binary_name = true, propagate_version = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Apply a supply delta to a resource over an interval.
    SupplyDelta {
        resource: String,
        start: String,
        end: String,
        delta: i64,
    },
    /// Place a hold on a single resource over an interval.
    HoldPlace {
        resource: String,
        start: String,
        end: String,
        demand: i64,
        ttl_sec: u64,
    },
    /// Confirm a previously placed hold into a committed allocation.
    HoldConfirm { hold_id: String },
    /// Release an active hold.
    HoldRelease {
        hold_id: String,
        #[arg(default_value = "released")]
        reason: String,
    },
    /// Cancel a committed allocation.
    AllocCancel {
        allocation_id: String,
        #[arg(default_value = "canceled")]
        reason: String,
    },
    /// Check whether a demand would be admissible over an interval.
    FeasibleCheck {
        resource: String,
        start: String,
        end: String,
        demand: i64,
    },
    /// Report busy/free intervals for a resource over a window.
    Freebusy { resource: String, start: String, end: String },
    /// Mint a cross-resource cut over the listed resources.
    CutCreate { resources: Vec<String> },
    /// Exit the REPL.
    Exit,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("tap_cli=info,tap_engine=info,tap_runtime=info");

    let runtime = Runtime::boot(RuntimeConfig::default()).await.context("booting runtime")?;
    println!("tap-cli ready (in-memory backend). Type 'exit' to quit.");

    let mut lines = io::BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        match Line::try_parse_from(&words) {
            Ok(parsed) => {
                if matches!(parsed.command, Command::Exit) {
                    break;
                }
                if let Err(err) = run_command(runtime.engine(), parsed.command).await {
                    println!("error: {err:#}");
                }
            }
            Err(err) => println!("{err}"),
        }
    }

    runtime.shutdown().await;
    info!("tap-cli exiting");
    Ok(())
}

async fn run_command(engine: &AllocationEngine, command: Command) -> Result<()> {
    match command {
        Command::SupplyDelta { resource, start, end, delta } => {
            let events = engine
                .submit(tap_types::Command::SupplyDelta(tap_types::SupplyDeltaCmd {
                    resource: resource_id(&resource)?,
                    interval: interval(&start, &end)?,
                    delta,
                    idem: tap_types::IdempotencyKey::fresh(),
                }))
                .await?;
            println!("ok: {} event(s)", events.len());
        }
        Command::HoldPlace { resource, start, end, demand, ttl_sec } => {
            let events = engine
                .submit(tap_types::Command::HoldPlace(tap_types::HoldPlaceCmd {
                    resources: vec![resource_id(&resource)?],
                    interval: interval(&start, &end)?,
                    demands: vec![demand],
                    ttl_sec,
                    idem: tap_types::IdempotencyKey::fresh(),
                }))
                .await?;
            match events.first().map(|e| &e.body) {
                Some(tap_store_core::EventBody::HoldPlaced { hold_id, .. }) => {
                    println!("ok: hold {hold_id}");
                }
                _ => println!("ok: {} event(s)", events.len()),
            }
        }
        Command::HoldConfirm { hold_id } => {
            let events = engine
                .submit(tap_types::Command::HoldConfirm(tap_types::HoldConfirmCmd {
                    hold_id: HoldId::from(hold_id),
                    idem: tap_types::IdempotencyKey::fresh(),
                }))
                .await?;
            match events.first().map(|e| &e.body) {
                Some(tap_store_core::EventBody::AllocCommitted { allocation_id, .. }) => {
                    println!("ok: allocation {allocation_id}");
                }
                _ => println!("ok: {} event(s)", events.len()),
            }
        }
        Command::HoldRelease { hold_id, reason } => {
            let events = engine
                .submit(tap_types::Command::HoldRelease(tap_types::HoldReleaseCmd {
                    hold_id: HoldId::from(hold_id),
                    reason: Some(reason),
                    idem: tap_types::IdempotencyKey::fresh(),
                }))
                .await?;
            println!("ok: {} event(s)", events.len());
        }
        Command::AllocCancel { allocation_id, reason } => {
            let events = engine
                .submit(tap_types::Command::AllocCancel(tap_types::AllocCancelCmd {
                    allocation_id: tap_types::AllocationId::from(allocation_id),
                    reason: Some(reason),
                    idem: tap_types::IdempotencyKey::fresh(),
                }))
                .await?;
            println!("ok: {} event(s)", events.len());
        }
        Command::FeasibleCheck { resource, start, end, demand } => {
            let result = engine.feasible_check(&[resource_id(&resource)?], interval(&start, &end)?, &[demand]).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Freebusy { resource, start, end } => {
            let result = engine.freebusy(&resource_id(&resource)?, interval(&start, &end)?).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::CutCreate { resources } => {
            let resources = resources.iter().map(|r| resource_id(r)).collect::<Result<Vec<_>>>()?;
            let cut = engine.create_cut(&resources).await?;
            println!("ok: cut {}", cut.cut_id);
        }
        Command::Exit => unreachable!("handled by caller"),
    }
    Ok(())
}

fn resource_id(s: &str) -> Result<ResourceId> {
    ResourceId::from_opaque(s).map_err(|e| anyhow!("invalid resource id '{s}': {e}"))
}

fn interval(start: &str, end: &str) -> Result<Interval> {
    let start = Instant::try_from(start.to_owned()).map_err(|e| anyhow!("invalid start timestamp: {e}"))?;
    let end = Instant::try_from(end.to_owned()).map_err(|e| anyhow!("invalid end timestamp: {e}"))?;
    Interval::new(start, end).map_err(|e| anyhow!("invalid interval: {e}"))
}
