//! Property-based tests for the aggregation invariants.

use proptest::prelude::*;

use crate::aggregator::WalkAggregator;
use crate::config::WalkmeterConfig;
use crate::sample::{ActivityKind, ActivitySample};
use crate::store::MemoryStore;

fn arb_kind() -> impl Strategy<Value = ActivityKind> {
    prop_oneof![
        Just(ActivityKind::InVehicle),
        Just(ActivityKind::OnBicycle),
        Just(ActivityKind::OnFoot),
        Just(ActivityKind::Still),
        Just(ActivityKind::Unknown),
        Just(ActivityKind::Tilting),
    ]
}

/// Streams of valid samples: non-negative deltas (occasionally zero or
/// far past the reset gap), full kind and confidence ranges.
fn arb_stream() -> impl Strategy<Value = Vec<ActivitySample>> {
    prop::collection::vec((0i64..300_000, arb_kind(), 0u8..=100), 1..80).prop_map(|steps| {
        let mut ts = 0i64;
        steps
            .into_iter()
            .map(|(delta, kind, confidence)| {
                ts += delta;
                ActivitySample::new(ts, kind, confidence)
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn best_count_is_monotonic(samples in arb_stream()) {
        let mut agg = WalkAggregator::open(MemoryStore::new(), WalkmeterConfig::default()).unwrap();
        let mut last_best = 0u32;
        for s in &samples {
            agg.ingest(s).unwrap();
            let best = agg.summary().best_count;
            prop_assert!(best >= last_best, "best_count regressed: {} -> {}", last_best, best);
            last_best = best;
        }
    }

    #[test]
    fn bucket_anchor_never_decreases(samples in arb_stream()) {
        let mut agg = WalkAggregator::open(MemoryStore::new(), WalkmeterConfig::default()).unwrap();
        let mut last_anchor = i64::MIN;
        for s in &samples {
            agg.ingest(s).unwrap();
            let anchor = agg.state().unwrap().bucket.start_ms;
            prop_assert!(anchor >= last_anchor);
            last_anchor = anchor;
        }
    }

    #[test]
    fn today_tracks_closed_walking_buckets(samples in arb_stream()) {
        let mut agg = WalkAggregator::open(MemoryStore::new(), WalkmeterConfig::default()).unwrap();
        let mut walking_closes = 0u32;
        for s in &samples {
            if let Some(bucket) = agg.ingest(s).unwrap() {
                if bucket.kind == ActivityKind::OnFoot {
                    walking_closes += 1;
                }
            }
            let sum = agg.summary();
            // Today's count can reset at rollover but can never exceed
            // the walking buckets actually closed.
            prop_assert!(sum.walked_today <= walking_closes);
            prop_assert!(sum.best_count <= walking_closes);
        }
    }

    #[test]
    fn every_sample_is_committed(samples in arb_stream()) {
        let mut agg = WalkAggregator::open(MemoryStore::new(), WalkmeterConfig::default()).unwrap();
        for s in &samples {
            agg.ingest(s).unwrap();
            let committed = agg.store().snapshot().expect("commit after every ingest");
            prop_assert_eq!(committed, agg.state().unwrap());
        }
    }
}
