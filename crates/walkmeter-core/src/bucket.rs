//! Bucket reducer: collapses an irregular sample stream into one
//! winning classification per time window.
//!
//! Windows are sample-anchored, not wall-clock-aligned: a new bucket
//! always starts at the timestamp of the sample that closed the
//! previous one. This tolerates arbitrary sample cadence without a
//! periodic timer, at the cost of bucket boundaries drifting over time.
//! That drift is part of the counting semantics and is preserved
//! deliberately.

use serde::{Deserialize, Serialize};

use crate::calendar::dt_ms;
use crate::config::BucketConfig;
use crate::sample::{ActivityKind, ActivitySample};

/// The open bucket: window anchor plus the best classification seen so
/// far inside it.
///
/// `start_ms` is monotonically non-decreasing across the lifetime of an
/// aggregator instance; nothing ever moves an anchor backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketState {
    /// Wall-clock instant the current window started.
    pub start_ms: i64,
    /// Winning classification so far.
    pub kind: ActivityKind,
    /// Confidence of the winning classification.
    pub confidence: u8,
}

/// A closed window with its final winner. Emitted at most once per
/// sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedBucket {
    pub start_ms: i64,
    /// Timestamp of the sample that closed the window. Day rollover is
    /// judged against this instant.
    pub close_ms: i64,
    pub kind: ActivityKind,
    pub confidence: u8,
}

impl BucketState {
    /// Start a fresh window anchored at `sample`, seeded with the
    /// sample as its immediate winner.
    pub fn seed(sample: &ActivitySample) -> Self {
        Self {
            start_ms: sample.timestamp_ms,
            kind: sample.kind,
            confidence: sample.confidence,
        }
    }

    /// Fold one sample into the bucket. Returns the closed window when
    /// the sample's timestamp has reached the end of the current one.
    ///
    /// Three cases, judged by the saturating elapsed time since the
    /// anchor (a sample earlier than the anchor saturates to 0 and is
    /// treated as window-interior data):
    ///
    /// - `elapsed >= reset_gap_ms`: hard reset after a silent gap. The
    ///   stale window closes with its accumulated winner and the new
    ///   window starts at the sample; the gap itself is never
    ///   back-filled with synthetic windows.
    /// - `elapsed >= window_ms`: normal close; same mechanics, the new
    ///   window is anchored at the sample rather than at
    ///   `start_ms + window_ms`.
    /// - otherwise: the sample competes for the running winner. Strict
    ///   `>` only, so ties keep the earlier winner and momentary
    ///   low-confidence readings cannot oscillate the decision.
    pub fn reduce(&mut self, sample: &ActivitySample, config: &BucketConfig) -> Option<ClosedBucket> {
        let elapsed = dt_ms(sample.timestamp_ms, self.start_ms);
        if elapsed >= config.window_ms {
            if elapsed >= config.reset_gap_ms {
                tracing::debug!(
                    gap_ms = elapsed,
                    anchor_ms = self.start_ms,
                    "hard reset after silent gap"
                );
            }
            // Sample-anchored windows make the successor bucket
            // identical for the nominal close and the hard reset.
            let closed = ClosedBucket {
                start_ms: self.start_ms,
                close_ms: sample.timestamp_ms,
                kind: self.kind,
                confidence: self.confidence,
            };
            *self = BucketState::seed(sample);
            Some(closed)
        } else {
            if sample.confidence > self.confidence {
                self.kind = sample.kind;
                self.confidence = sample.confidence;
            }
            None
        }
    }
}
