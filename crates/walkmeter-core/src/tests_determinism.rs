//! Restart idempotence and state-hash determinism.

use crate::aggregator::WalkAggregator;
use crate::config::WalkmeterConfig;
use crate::sample::ActivityKind::{OnBicycle, OnFoot, Still};
use crate::sample::ActivitySample;
use crate::store::{MemoryStore, StateStore};

fn walk_of_a_day() -> Vec<ActivitySample> {
    vec![
        ActivitySample::new(0, OnFoot, 75),
        ActivitySample::new(20_000, Still, 50),
        ActivitySample::new(45_000, OnFoot, 90),
        ActivitySample::new(61_000, OnFoot, 80),
        ActivitySample::new(95_000, OnBicycle, 85),
        ActivitySample::new(130_000, Still, 60),
        ActivitySample::new(400_000, OnFoot, 70),
        ActivitySample::new(465_000, OnFoot, 82),
    ]
}

#[test]
fn identical_streams_produce_identical_hashes() {
    let run = || {
        let mut agg =
            WalkAggregator::open(MemoryStore::new(), WalkmeterConfig::default()).unwrap();
        for s in walk_of_a_day() {
            agg.ingest(&s).unwrap();
        }
        agg.state().unwrap().hash()
    };
    assert_eq!(run(), run());
}

#[test]
fn restart_mid_stream_is_idempotent() {
    let samples = walk_of_a_day();
    for cut in 1..samples.len() {
        // Uninterrupted run.
        let mut straight =
            WalkAggregator::open(MemoryStore::new(), WalkmeterConfig::default()).unwrap();
        for s in &samples {
            straight.ingest(s).unwrap();
        }

        // Run with a simulated process restart after `cut` samples: the
        // second aggregator resumes purely from the committed snapshot.
        let mut first =
            WalkAggregator::open(MemoryStore::new(), WalkmeterConfig::default()).unwrap();
        for s in &samples[..cut] {
            first.ingest(s).unwrap();
        }
        let mut resumed =
            WalkAggregator::open(first.store().clone(), WalkmeterConfig::default()).unwrap();
        for s in &samples[cut..] {
            resumed.ingest(s).unwrap();
        }

        assert_eq!(
            straight.state().unwrap().hash(),
            resumed.state().unwrap().hash(),
            "restart after sample {} diverged",
            cut
        );
    }
}

#[test]
fn committed_snapshot_matches_in_memory_state() {
    let mut agg = WalkAggregator::open(MemoryStore::new(), WalkmeterConfig::default()).unwrap();
    for s in walk_of_a_day() {
        agg.ingest(&s).unwrap();
        let committed = agg.store().load().unwrap().unwrap();
        assert_eq!(&committed, agg.state().unwrap());
    }
}
