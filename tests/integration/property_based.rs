//! Model-based property test for the zero-sum invariant (`spec.md` §8,
//! invariant 1: "no accepted event may drive Availability negative").
//!
//! Grounded in the teacher's `property_based.rs` state-machine style (an
//! independent model replayed alongside a sequence of random operations),
//! narrowed from a generic kernel-operation model to hourly supply/hold
//! deltas on a single resource, since that is the only state shape the
//! zero-sum invariant is actually about.

use std::ops::Range;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use tap_types::HoldId;

use tap_integration_tests::common::*;

const HOURS: usize = 24;

#[derive(Clone, Debug)]
enum Op {
    /// Adjust supply over `[hour, hour + len)` by `delta`.
    SupplyDelta { hour: usize, len: usize, delta: i64 },
    /// Attempt to place a hold of `demand` over `[hour, hour + len)`.
    HoldPlace { hour: usize, len: usize, demand: i64 },
    /// Release the `n`-th still-active hold, if one exists.
    ReleaseNth { n: usize },
}

fn arbitrary_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        (0..HOURS, 1..6usize, -3i64..6).prop_map(|(hour, len, delta)| Op::SupplyDelta {
            hour,
            len: len.min(HOURS - hour).max(1),
            delta
        }),
        (0..HOURS, 1..6usize, 1i64..4).prop_map(|(hour, len, demand)| Op::HoldPlace {
            hour,
            len: len.min(HOURS - hour).max(1),
            demand
        }),
        (0..8usize).prop_map(|n| Op::ReleaseNth { n }),
    ];
    prop::collection::vec(op, 1..60)
}

fn hour_interval(day_start: chrono::DateTime<Utc>, hour: usize, len: usize) -> tap_types::Interval {
    let start = day_start + chrono::Duration::hours(hour as i64);
    let end = day_start + chrono::Duration::hours((hour + len) as i64);
    tap_types::Interval::new(
        tap_types::Instant::try_from(start.to_rfc3339()).unwrap(),
        tap_types::Instant::try_from(end.to_rfc3339()).unwrap(),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn zero_sum_invariant_holds_across_random_operation_sequences(ops in arbitrary_ops()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let day_start = Utc.with_ymd_and_hms(2026, 7, 30, 0, 0, 0).unwrap();
            let (runtime, _clock) = boot_with_clock(day_start).await;
            let engine = runtime.engine();
            let r = resource("room-1");

            // model[i] = available units in hour i = supply[i] - allocation[i] - active_hold_demand[i]
            let mut model = [0i64; HOURS];
            let mut active_holds: Vec<(HoldId, Range<usize>, i64)> = Vec::new();

            for op in ops {
                match op {
                    Op::SupplyDelta { hour, len, delta } => {
                        let interval = hour_interval(day_start, hour, len);
                        let result = engine.submit(supply_delta(&r, interval, delta)).await;
                        prop_assert!(result.is_ok(), "supply.delta must never be rejected");
                        for h in hour..hour + len {
                            model[h] += delta;
                        }
                    }
                    Op::HoldPlace { hour, len, demand } => {
                        let interval = hour_interval(day_start, hour, len);
                        let min_available = model[hour..hour + len].iter().copied().min().unwrap();
                        let result = engine.submit(hold_place(&r, interval, demand, 100_000)).await;
                        if demand <= min_available {
                            let events = result.expect("model predicted admission");
                            let hold_id = hold_id_of(&events);
                            for h in hour..hour + len {
                                model[h] -= demand;
                            }
                            active_holds.push((hold_id, hour..hour + len, demand));
                        } else {
                            prop_assert!(
                                matches!(result, Err(tap_types::TapError::CapacityViolation { .. })),
                                "model predicted a shortfall of {}",
                                demand - min_available
                            );
                        }
                    }
                    Op::ReleaseNth { n } => {
                        if let Some((hold_id, range, demand)) = active_holds.get(n).cloned() {
                            active_holds.remove(n);
                            engine.submit(hold_release(&hold_id, "property-test release")).await.unwrap();
                            for h in range {
                                model[h] += demand;
                            }
                        }
                    }
                }

                for h in 0..HOURS {
                    prop_assert!(model[h] >= 0, "model itself went negative at hour {h}, generator is unsound");
                    let interval = hour_interval(day_start, h, 1);
                    let at_model_min = engine.feasible_check(&[r.clone()], interval.clone(), &[model[h]]).await.unwrap();
                    prop_assert!(at_model_min.ok, "engine disagrees with model at hour {h}: model says {} is available", model[h]);
                    if model[h] < i64::MAX {
                        let one_more = engine.feasible_check(&[r.clone()], interval, &[model[h] + 1]).await.unwrap();
                        prop_assert!(!one_more.ok, "engine allowed {} at hour {h} when model says only {} is available", model[h] + 1, model[h]);
                    }
                }
            }

            runtime.shutdown().await;
            Ok(())
        })?;
    }
}
