//! The six named invariants from `spec.md` §8 "Invariants (property-based)",
//! plus `spec.md:47`'s referential-integrity invariant, each given one
//! concrete black-box test. The broader random-sequence form of invariant 1
//! lives in `property_based.rs`; these are the directed, easy-to-read
//! counterparts.

use chrono::Utc;
use tap_types::TapError;

use tap_integration_tests::common::*;

/// 1. Zero-sum: no accepted command may drive availability negative.
#[tokio::test]
async fn zero_sum_rejects_a_hold_exceeding_available_capacity() {
    let runtime = boot().await;
    let engine = runtime.engine();
    let r = resource("room-1");
    engine.submit(supply_delta(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 2)).await.unwrap();

    let over = engine.submit(hold_place(&r, iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), 3, 600)).await;
    assert!(matches!(over, Err(TapError::CapacityViolation { resource: _, requested: 3, available: 2 })));

    let exact = engine.submit(hold_place(&r, iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), 2, 600)).await;
    assert!(exact.is_ok(), "exactly the available amount must be admissible");

    runtime.shutdown().await;
}

/// 2. Sequence monotonicity: per-resource event seqs are strictly
/// increasing starting at 0, with no gaps.
#[tokio::test]
async fn sequence_numbers_are_strictly_increasing_with_no_gaps() {
    let runtime = boot().await;
    let engine = runtime.engine();
    let r = resource("room-1");

    let mut seqs = Vec::new();
    for i in 0..10i64 {
        let events = engine.submit(supply_delta(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T10:00:00Z"), i + 1)).await.unwrap();
        seqs.push(events[0].seq);
    }
    let expected: Vec<u64> = (0..10).collect();
    assert_eq!(seqs, expected);

    runtime.shutdown().await;
}

/// 3. Idempotency: identical replay emits no new event and returns the
/// original outcome; a differing replay returns `conflict`.
#[tokio::test]
async fn identical_idempotent_replay_is_a_no_op_and_differing_replay_conflicts() {
    let runtime = boot().await;
    let engine = runtime.engine();
    let r = resource("room-1");
    let idem = tap_types::IdempotencyKey::from("replay-key");

    let first = engine.submit(supply_delta_with_idem(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T10:00:00Z"), 5, &idem)).await.unwrap();
    assert_eq!(first.len(), 1);

    let replay = engine.submit(supply_delta_with_idem(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T10:00:00Z"), 5, &idem)).await.unwrap();
    assert!(replay.is_empty());

    let conflicting = engine.submit(supply_delta_with_idem(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T10:00:00Z"), 6, &idem)).await;
    assert!(matches!(conflicting, Err(TapError::Conflict(_))));

    runtime.shutdown().await;
}

/// 4. Snapshot+tail join: `cut.create` then `state.snapshot` then a
/// resumed stream from the cut's watermark together reconstruct the same
/// state a full replay of the log would.
#[tokio::test]
async fn cut_snapshot_and_resumed_tail_together_match_a_full_replay() {
    let (runtime, log) = boot_with_log().await;
    let engine = runtime.engine();
    let r = resource("room-1");

    engine.submit(supply_delta(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 5)).await.unwrap();
    engine.submit(supply_delta(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 3)).await.unwrap();

    let cut = engine.create_cut(&[r.clone()]).await.unwrap();
    // A window tight around the probe instant, and strictly inside both
    // commands' intervals, so no boundary delta (e.g. the interval-end
    // negation at 17:00) falls inside it — the window's total stays
    // constant throughout, regardless of whether a delta exactly at
    // `window.start` is folded into `supply_baseline` or listed separately.
    let window = iv("2026-07-30T09:00:00Z", "2026-07-30T10:00:00Z");
    let snapshot = engine.snapshot(&cut.cut_id, &r, window, None, 1024).await.unwrap();

    engine.submit(supply_delta(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 2)).await.unwrap();

    let mut subscription = runtime
        .bus()
        .open(
            log.clone(),
            vec![r.clone()],
            tap_bus_core::OpenMode::Resume {
                after: vec![tap_bus_core::ResumeWatermark { resource: r.clone(), seq_hi: cut.seq_for(&r).unwrap() }],
            },
            60,
            16,
        )
        .await
        .unwrap();
    let tail_frame = tokio::time::timeout(std::time::Duration::from_secs(1), subscription.frames.recv()).await.unwrap().unwrap();
    let tail_delta = match tail_frame {
        tap_bus_core::StreamFrame::Event(record) => match record.body {
            tap_store_core::EventBody::SupplyDeltaApplied { delta, .. } => delta,
            other => panic!("expected supply.delta.applied, got {other:?}"),
        },
        other => panic!("expected an event frame, got {other:?}"),
    };

    let joined_total: i64 = snapshot.supply_baseline + snapshot.supply.iter().map(|(_, d)| d).sum::<i64>() + tail_delta;

    let probe = iv("2026-07-30T09:00:00Z", "2026-07-30T10:00:00Z");
    let at_joined_total = engine.feasible_check(&[r.clone()], probe.clone(), &[joined_total]).await.unwrap();
    assert!(at_joined_total.ok, "snapshot + tail total must match the live engine's own state");
    let one_more = engine.feasible_check(&[r], probe, &[joined_total + 1]).await.unwrap();
    assert!(!one_more.ok, "snapshot + tail total must equal, not merely bound, the live engine's state");

    runtime.shutdown().await;
}

/// 5. Hold expiration: a hold past its `expiresAt` never blocks admission
/// of a new hold, even without the background sweeper running.
#[tokio::test]
async fn an_expired_hold_never_blocks_a_new_holds_admission() {
    let (runtime, clock) = boot_with_clock(Utc::now()).await;
    let engine = runtime.engine();
    let r = resource("room-1");
    engine.submit(supply_delta(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 1)).await.unwrap();
    engine.submit(hold_place(&r, iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), 1, 1)).await.unwrap();

    clock.advance(chrono::Duration::seconds(5));

    let admitted = engine.submit(hold_place(&r, iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), 1, 600)).await;
    assert!(admitted.is_ok(), "an expired hold must never be counted against new admission");

    runtime.shutdown().await;
}

/// 6. Multi-resource atomicity: a failed multi-resource command leaves no
/// partial state on any resource it touched.
#[tokio::test]
async fn failed_multi_resource_hold_leaves_no_partial_state_on_either_resource() {
    let runtime = boot().await;
    let engine = runtime.engine();
    let r1 = resource("room-1");
    let r2 = resource("room-2");
    engine.submit(supply_delta(&r1, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 5)).await.unwrap();
    engine.submit(supply_delta(&r2, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 1)).await.unwrap();

    let failed = engine
        .submit(hold_place_multi(&[r1.clone(), r2.clone()], iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), &[1, 2], 600))
        .await;
    assert!(matches!(failed, Err(TapError::CapacityViolation { .. })));

    let r1_full = engine.feasible_check(&[r1.clone()], iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), &[5]).await.unwrap();
    assert!(r1_full.ok, "r1's full supply must remain untouched");
    let r2_full = engine.feasible_check(&[r2.clone()], iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), &[1]).await.unwrap();
    assert!(r2_full.ok, "r2's full supply must remain untouched");

    let r1_cut = engine.create_cut(&[r1]).await.unwrap();
    assert_eq!(r1_cut.seq_for(&resource("room-1")), Some(0), "only the supply.delta event, nothing from the failed hold");

    runtime.shutdown().await;
}

/// 7. Referential integrity: `alloc.cancel` reverses a Committed allocation's
/// availability hit, and rejects an id that names no known allocation.
#[tokio::test]
async fn alloc_cancel_reverses_the_allocation_and_rejects_an_unknown_id() {
    let runtime = boot().await;
    let engine = runtime.engine();
    let r = resource("room-1");
    let window = iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z");

    engine.submit(supply_delta(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 1)).await.unwrap();
    let placed = engine.submit(hold_place(&r, window.clone(), 1, 600)).await.unwrap();
    let hold_id = hold_id_of(&placed);
    let confirmed = engine.submit(hold_confirm(&hold_id)).await.unwrap();
    let allocation_id = allocation_id_of(&confirmed);

    let before_cancel = engine.feasible_check(&[r.clone()], window.clone(), &[1]).await.unwrap();
    assert!(!before_cancel.ok, "the committed allocation must still be holding its capacity");

    let canceled = engine.submit(alloc_cancel(&allocation_id, "no longer needed")).await.unwrap();
    assert!(!canceled.is_empty());

    let after_cancel = engine.feasible_check(&[r], window, &[1]).await.unwrap();
    assert!(after_cancel.ok, "canceling the allocation must reverse its delta on the allocation timeline");

    let unknown = engine.submit(alloc_cancel(&tap_types::AllocationId::fresh(), "stale")).await;
    assert!(matches!(unknown, Err(TapError::NotFound(_))), "canceling an unknown allocation id must fail not_found");

    runtime.shutdown().await;
}
