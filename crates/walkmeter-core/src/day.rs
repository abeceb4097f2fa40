//! Day aggregator: per-day walking-bucket counters with calendar-day
//! rollover.

use serde::{Deserialize, Serialize};

use crate::bucket::ClosedBucket;
use crate::calendar::date_of_ms;
use crate::sample::ActivityKind;

/// Walking counters for the tracked day and the previous one.
///
/// `day_start_ms` is the timestamp of the sample that opened the
/// tracked day, not midnight; rollover is judged by calendar date, so
/// the offset into the day is irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCounters {
    /// Wall-clock instant that opened the currently tracked day.
    pub day_start_ms: i64,
    /// Closed on-foot buckets counted for the tracked day.
    pub walked_today: u32,
    /// Final count of the previous tracked day.
    pub walked_yesterday: u32,
}

impl DayCounters {
    /// Counters for a fresh day opened by the first sample ever seen.
    /// The first sample itself is not a completed bucket and counts
    /// nothing.
    pub fn new(first_sample_ms: i64) -> Self {
        Self {
            day_start_ms: first_sample_ms,
            walked_today: 0,
            walked_yesterday: 0,
        }
    }

    /// Fold a closed bucket into the counters. Returns true when the
    /// bucket landed on a new calendar day and the counters rolled
    /// over.
    ///
    /// Non-walking buckets change nothing here; the bucket reducer has
    /// already reseeded its classification-of-record from the closing
    /// sample. A rollover shifts today into yesterday exactly once and
    /// books the closing bucket as the new day's first walking minute.
    pub fn apply(&mut self, bucket: &ClosedBucket) -> bool {
        if bucket.kind != ActivityKind::OnFoot {
            return false;
        }
        if date_of_ms(bucket.close_ms) == date_of_ms(self.day_start_ms) {
            self.walked_today += 1;
            false
        } else {
            self.walked_yesterday = self.walked_today;
            self.walked_today = 1;
            self.day_start_ms = bucket.close_ms;
            true
        }
    }
}
