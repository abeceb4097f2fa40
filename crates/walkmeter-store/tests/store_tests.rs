use tempfile::NamedTempFile;

use walkmeter_core::aggregator::AggregatorState;
use walkmeter_core::bucket::BucketState;
use walkmeter_core::day::DayCounters;
use walkmeter_core::record::BestRecord;
use walkmeter_core::sample::{ActivityCandidate, ActivityKind, ActivitySample};
use walkmeter_core::store::{StateStore, StoreError};
use walkmeter_store::SqliteStateStore;

fn snapshot() -> AggregatorState {
    AggregatorState {
        bucket: BucketState {
            start_ms: 120_000,
            kind: ActivityKind::OnFoot,
            confidence: 87,
        },
        days: DayCounters {
            day_start_ms: 60_000,
            walked_today: 14,
            walked_yesterday: 9,
        },
        record: BestRecord {
            best_count: 21,
            best_date: "2026-08-27 18:04:11".into(),
        },
    }
}

#[test]
fn commit_and_load_roundtrip() {
    let tf = NamedTempFile::new().unwrap();
    let mut store = SqliteStateStore::open(tf.path()).unwrap();

    let state = snapshot();
    store.commit(&state).unwrap();

    let loaded = store.load().unwrap().expect("snapshot present");
    assert_eq!(loaded, state);
}

#[test]
fn empty_store_loads_as_none() {
    let tf = NamedTempFile::new().unwrap();
    let store = SqliteStateStore::open(tf.path()).unwrap();
    assert!(store.load().unwrap().is_none());
}

#[test]
fn partial_store_is_incomplete_not_default() {
    let tf = NamedTempFile::new().unwrap();
    let mut store = SqliteStateStore::open(tf.path()).unwrap();
    store.commit(&snapshot()).unwrap();
    drop(store);

    // Simulate a state file damaged by an external tool.
    let db = rusqlite::Connection::open(tf.path()).unwrap();
    db.execute(
        "DELETE FROM aggregation_state WHERE key = 'walked_today'",
        (),
    )
    .unwrap();
    drop(db);

    let store = SqliteStateStore::open(tf.path()).unwrap();
    match store.load() {
        Err(StoreError::Incomplete(missing)) => assert!(missing.contains("walked_today")),
        other => panic!("expected Incomplete, got {other:?}"),
    }
}

#[test]
fn corrupt_value_is_a_read_error() {
    let tf = NamedTempFile::new().unwrap();
    let mut store = SqliteStateStore::open(tf.path()).unwrap();
    store.commit(&snapshot()).unwrap();
    drop(store);

    let db = rusqlite::Connection::open(tf.path()).unwrap();
    db.execute(
        "UPDATE aggregation_state SET value = 'not-a-number' WHERE key = 'best_count'",
        (),
    )
    .unwrap();
    drop(db);

    let store = SqliteStateStore::open(tf.path()).unwrap();
    assert!(matches!(store.load(), Err(StoreError::Read(_))));
}

#[test]
fn recommit_replaces_previous_snapshot() {
    let tf = NamedTempFile::new().unwrap();
    let mut store = SqliteStateStore::open(tf.path()).unwrap();

    let mut state = snapshot();
    store.commit(&state).unwrap();

    state.days.walked_today += 1;
    state.bucket.start_ms = 180_000;
    store.commit(&state).unwrap();

    let loaded = store.load().unwrap().expect("snapshot present");
    assert_eq!(loaded, state);

    // Still exactly one row per key.
    let db = rusqlite::Connection::open(tf.path()).unwrap();
    let rows: i64 = db
        .query_row("SELECT COUNT(*) FROM aggregation_state", (), |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 8);
}

#[test]
fn snapshot_survives_reopen() {
    let tf = NamedTempFile::new().unwrap();
    let state = snapshot();
    {
        let mut store = SqliteStateStore::open(tf.path()).unwrap();
        store.commit(&state).unwrap();
    }
    let store = SqliteStateStore::open(tf.path()).unwrap();
    assert_eq!(store.load().unwrap(), Some(state));
}

#[test]
fn sample_log_keeps_winner_and_candidates_in_rank_order() {
    let tf = NamedTempFile::new().unwrap();
    let mut store = SqliteStateStore::open(tf.path()).unwrap();

    let mut sample = ActivitySample::new(65_000, ActivityKind::OnFoot, 90);
    sample.candidates = vec![
        ActivityCandidate {
            kind: ActivityKind::OnFoot,
            confidence: 90,
        },
        ActivityCandidate {
            kind: ActivityKind::Still,
            confidence: 8,
        },
    ];
    store
        .append_samples(&[sample, ActivitySample::new(66_000, ActivityKind::Still, 70)])
        .unwrap();

    let rows = store.read_sample_log().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].rank, 0);
    assert_eq!(rows[0].kind, ActivityKind::OnFoot);
    assert_eq!(rows[1].rank, 1);
    assert_eq!(rows[2].rank, 2);
    assert_eq!(rows[2].kind, ActivityKind::Still);
    assert_eq!(rows[3].timestamp_ms, 66_000);
    assert_eq!(rows[3].rank, 0);
}
