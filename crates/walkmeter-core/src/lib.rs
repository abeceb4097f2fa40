//! Walkmeter core domain: deterministic walking-time aggregation.
//!
//! Converts an irregular, noisy stream of confidence-scored activity
//! samples into a stable per-minute decision, accumulates per-day
//! walking counts, detects calendar-day rollover, and maintains a
//! persisted personal-best record. Everything here is a pure state
//! transition over [`aggregator::AggregatorState`]; persistence happens
//! only at the [`store::StateStore`] boundary.

pub mod aggregator;
pub mod bucket;
pub mod calendar;
pub mod config;
pub mod day;
pub mod record;
pub mod sample;
pub mod store;

#[cfg(test)]
mod tests_determinism;
#[cfg(test)]
mod tests_proptest;

pub use aggregator::{AggregatorState, DailySummary, WalkAggregator};
pub use bucket::{BucketState, ClosedBucket};
pub use config::{BucketConfig, ConfigError, RecordConfig, WalkmeterConfig};
pub use day::DayCounters;
pub use record::BestRecord;
pub use sample::{ActivityCandidate, ActivityKind, ActivitySample, AggregateError, MAX_CONFIDENCE};
pub use store::{MemoryStore, StateStore, StoreError};
