//! Concrete scenarios S1-S6 (`spec.md` §8), exercising `tap_runtime::Runtime`
//! as a single black box: every assertion goes through `engine()`, `bus()`
//! or a fresh boot over the same log, never through a crate-internal type.

use chrono::Utc;
use tap_types::TapError;

use tap_integration_tests::common::*;

#[tokio::test]
async fn s1_single_hold_then_confirm() {
    let runtime = boot().await;
    let engine = runtime.engine();
    let r = resource("room-1");

    let supply = engine.submit(supply_delta(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 1)).await.unwrap();
    assert_eq!(supply[0].seq, 0);

    let placed = engine
        .submit(hold_place(&r, iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), 1, 600))
        .await
        .unwrap();
    assert_eq!(placed[0].seq, 1);
    let hold_id = hold_id_of(&placed);

    let confirmed = engine.submit(hold_confirm(&hold_id)).await.unwrap();
    assert_eq!(confirmed[0].seq, 2);

    let second = engine.submit(hold_place(&r, iv("2026-07-30T10:30:00Z", "2026-07-30T10:45:00Z"), 1, 600)).await;
    assert!(matches!(second, Err(TapError::CapacityViolation { .. })));

    runtime.shutdown().await;
}

#[tokio::test]
async fn s2_expiry_frees_capacity() {
    let start = Utc::now();
    let (runtime, clock) = boot_with_clock(start).await;
    let engine = runtime.engine();
    let r = resource("room-1");

    engine.submit(supply_delta(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 1)).await.unwrap();
    let placed = engine.submit(hold_place(&r, iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), 1, 1)).await.unwrap();
    assert!(!placed.is_empty());

    let immediate = engine.submit(hold_place(&r, iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), 1, 600)).await;
    assert!(matches!(immediate, Err(TapError::CapacityViolation { .. })));

    clock.advance(chrono::Duration::seconds(2));

    let after_expiry = engine.submit(hold_place(&r, iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), 1, 600)).await;
    assert!(after_expiry.is_ok());

    runtime.shutdown().await;
}

#[tokio::test]
async fn s3_idempotent_replay() {
    let runtime = boot().await;
    let engine = runtime.engine();
    let r = resource("room-1");
    engine.submit(supply_delta(&r, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 1)).await.unwrap();

    let idem = tap_types::IdempotencyKey::from("K1");
    let interval = iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z");

    let first = engine.submit(hold_place_with_idem(&r, interval.clone(), 1, 600, &idem)).await.unwrap();
    let hold_id = hold_id_of(&first);

    let replay = engine.submit(hold_place_with_idem(&r, interval.clone(), 1, 600, &idem)).await.unwrap();
    assert_eq!(hold_id_of(&replay), hold_id);
    assert!(replay.is_empty(), "a replayed idempotency key must mint no new event");

    let different = iv("2026-07-30T12:00:00Z", "2026-07-30T13:00:00Z");
    let conflict = engine.submit(hold_place_with_idem(&r, different, 1, 600, &idem)).await;
    assert!(matches!(conflict, Err(TapError::Conflict(_))));

    runtime.shutdown().await;
}

#[tokio::test]
async fn s4_cut_snapshot_and_tail() {
    let (runtime, log) = boot_with_log().await;
    let engine = runtime.engine();
    let r = resource("room-1");

    for i in 0..100i64 {
        let start = format!("2026-07-30T{:02}:00:00Z", 8 + (i as u32 % 14));
        let end = format!("2026-07-30T{:02}:00:00Z", 9 + (i as u32 % 14));
        engine.submit(supply_delta(&r, iv(&start, &end), 1)).await.unwrap();
    }

    let cut = engine.create_cut(&[r.clone()]).await.unwrap();
    assert_eq!(cut.seq_for(&r), Some(99));

    let page = engine
        .snapshot(&cut.cut_id, &r, iv("2026-07-30T00:00:00Z", "2026-07-31T00:00:00Z"), None, 1024)
        .await
        .unwrap();
    assert_eq!(page.seq_hi, 99);
    assert!(!page.supply.is_empty());

    let mut subscription = runtime
        .bus()
        .open(
            log,
            vec![r.clone()],
            tap_bus_core::OpenMode::Resume { after: vec![tap_bus_core::ResumeWatermark { resource: r.clone(), seq_hi: 99 }] },
            60,
            16,
        )
        .await
        .unwrap();

    engine.submit(supply_delta(&r, iv("2026-07-30T08:00:00Z", "2026-07-30T08:30:00Z"), 1)).await.unwrap();

    let frame = tokio::time::timeout(std::time::Duration::from_secs(1), subscription.frames.recv())
        .await
        .expect("a frame for the seq-100 event must arrive")
        .expect("channel stays open while the subscription is alive");
    match frame {
        tap_bus_core::StreamFrame::Event(record) => assert_eq!(record.seq, 100),
        other => panic!("expected the seq-100 event frame, got {other:?}"),
    }

    runtime.shutdown().await;
}

#[tokio::test]
async fn s5_multi_resource_hold_atomicity() {
    let runtime = boot().await;
    let engine = runtime.engine();
    let r1 = resource("room-1");
    let r2 = resource("room-2");

    engine.submit(supply_delta(&r1, iv("2026-07-30T09:00:00Z", "2026-07-30T17:00:00Z"), 5)).await.unwrap();
    // r2 deliberately has no supply: any positive demand is a shortfall.

    let result = engine
        .submit(hold_place_multi(&[r1.clone(), r2.clone()], iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), &[1, 1], 600))
        .await;
    assert!(matches!(result, Err(TapError::CapacityViolation { .. })));

    let r1_check = engine.feasible_check(&[r1], iv("2026-07-30T10:00:00Z", "2026-07-30T11:00:00Z"), &[1]).await.unwrap();
    assert!(r1_check.ok, "the failed multi-resource hold must not have reserved anything on r1");

    runtime.shutdown().await;
}

#[tokio::test]
async fn s6_per_resource_ordering_under_concurrency() {
    let runtime = boot().await;
    let engine = runtime.engine().clone();
    let r = resource("room-1");

    let e1 = engine.clone();
    let r1 = r.clone();
    let task1 = tokio::spawn(async move { e1.submit(supply_delta(&r1, iv("2026-07-30T09:00:00Z", "2026-07-30T10:00:00Z"), 1)).await });

    let e2 = engine.clone();
    let r2 = r.clone();
    let task2 = tokio::spawn(async move { e2.submit(supply_delta(&r2, iv("2026-07-30T11:00:00Z", "2026-07-30T12:00:00Z"), 1)).await });

    let (res1, res2) = tokio::join!(task1, task2);
    let seq1 = res1.unwrap().unwrap()[0].seq;
    let seq2 = res2.unwrap().unwrap()[0].seq;

    assert_ne!(seq1, seq2);
    let mut seqs = [seq1, seq2];
    seqs.sort();
    assert_eq!(seqs, [0, 1]);

    runtime.shutdown().await;
}
