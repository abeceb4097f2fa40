//! Aggregator orchestration: one sample in, reduce → aggregate →
//! record-check → persist, then the next.
//!
//! The aggregator is single-writer by construction. It processes one
//! sample to completion before accepting the next; hosting environments
//! where samples can arrive concurrently must serialize them through a
//! single queue feeding one instance per store.

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::bucket::{BucketState, ClosedBucket};
use crate::config::WalkmeterConfig;
use crate::day::DayCounters;
use crate::record::BestRecord;
use crate::sample::{ActivitySample, AggregateError};
use crate::store::StateStore;

/// The complete persisted state: bucket anchor, day counters, record.
///
/// This is the explicit state type that replaces the original design's
/// scattered preference flags. Transition functions take it by
/// reference; persistence serializes it whole at the edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorState {
    pub bucket: BucketState,
    pub days: DayCounters,
    pub record: BestRecord,
}

impl AggregatorState {
    /// State after the first sample ever: a seeded bucket, zeroed
    /// counters, an unestablished record. The first sample is not a
    /// completed bucket and counts nothing.
    pub fn initial(sample: &ActivitySample, config: &WalkmeterConfig) -> Self {
        Self {
            bucket: BucketState::seed(sample),
            days: DayCounters::new(sample.timestamp_ms),
            record: BestRecord::new(sample.timestamp_ms, &config.record.date_format),
        }
    }

    /// Deterministic hash of the snapshot, for restart and replay
    /// verification. Field order is fixed; strings are length-prefixed
    /// so adjacent fields cannot alias.
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Hasher::new();
        hasher.update(&self.bucket.start_ms.to_le_bytes());
        hasher.update(self.bucket.kind.name().as_bytes());
        hasher.update(&[self.bucket.confidence]);
        hasher.update(&self.days.day_start_ms.to_le_bytes());
        hasher.update(&self.days.walked_today.to_le_bytes());
        hasher.update(&self.days.walked_yesterday.to_le_bytes());
        hasher.update(&self.record.best_count.to_le_bytes());
        hasher.update(&(self.record.best_date.len() as u64).to_le_bytes());
        hasher.update(self.record.best_date.as_bytes());
        *hasher.finalize().as_bytes()
    }
}

/// Read-side counters exposed for display. Read-only from the UI's
/// perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub walked_today: u32,
    pub walked_yesterday: u32,
    pub best_count: u32,
    pub best_date: Option<String>,
}

/// The bucketed activity aggregator.
///
/// Holds its state explicitly, loads it from the store on open, and
/// commits the whole snapshot once per ingested sample. Store failures
/// propagate; there are no retries inside the core.
pub struct WalkAggregator<S: StateStore> {
    store: S,
    config: WalkmeterConfig,
    state: Option<AggregatorState>,
}

impl<S: StateStore> WalkAggregator<S> {
    /// Open the aggregator over a store, resuming from the last
    /// committed snapshot when one exists.
    pub fn open(store: S, config: WalkmeterConfig) -> Result<Self, AggregateError> {
        let state = store.load()?;
        if let Some(st) = &state {
            tracing::debug!(
                walked_today = st.days.walked_today,
                bucket_anchor_ms = st.bucket.start_ms,
                "resumed aggregator state"
            );
        }
        Ok(Self {
            store,
            config,
            state,
        })
    }

    /// Feed one sample through the full pipeline. Returns the closed
    /// bucket when this sample ended a window.
    ///
    /// A malformed sample is rejected before any state mutation. The
    /// snapshot is committed as one batch on every accepted sample, so
    /// a crash between samples can never double-count or regress.
    pub fn ingest(&mut self, sample: &ActivitySample) -> Result<Option<ClosedBucket>, AggregateError> {
        sample.validate()?;

        let closed = match self.state.as_mut() {
            None => {
                self.state = Some(AggregatorState::initial(sample, &self.config));
                tracing::info!(ts_ms = sample.timestamp_ms, "first sample, state initialized");
                None
            }
            Some(st) => {
                let closed = st.bucket.reduce(sample, &self.config.bucket);
                if let Some(bucket) = closed {
                    let rolled = st.days.apply(&bucket);
                    if rolled {
                        tracing::info!(
                            walked_yesterday = st.days.walked_yesterday,
                            "day rolled over"
                        );
                    }
                    let record_set = st.record.observe(
                        &st.days,
                        bucket.close_ms,
                        &self.config.record.date_format,
                    );
                    tracing::debug!(
                        winner = bucket.kind.name(),
                        confidence = bucket.confidence,
                        walked_today = st.days.walked_today,
                        record_set,
                        "bucket closed"
                    );
                }
                closed
            }
        };

        if let Some(st) = &self.state {
            self.store.commit(st)?;
        }
        Ok(closed)
    }

    /// Current counters for display. Zeroes before the first sample.
    pub fn summary(&self) -> DailySummary {
        match &self.state {
            Some(st) => DailySummary {
                walked_today: st.days.walked_today,
                walked_yesterday: st.days.walked_yesterday,
                best_count: st.record.best_count,
                best_date: Some(st.record.best_date.clone()),
            },
            None => DailySummary {
                walked_today: 0,
                walked_yesterday: 0,
                best_count: 0,
                best_date: None,
            },
        }
    }

    /// The in-memory snapshot, if any sample has been seen.
    pub fn state(&self) -> Option<&AggregatorState> {
        self.state.as_ref()
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
