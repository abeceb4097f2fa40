//! Record tracker: all-time best daily walking count and when it was
//! set.

use serde::{Deserialize, Serialize};

use crate::calendar::format_ms;
use crate::day::DayCounters;

/// The personal best. `best_count` is monotonically non-decreasing over
/// the aggregator's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestRecord {
    /// Highest `walked_today` ever observed at a bucket close.
    pub best_count: u32,
    /// Human-readable timestamp of when `best_count` was achieved.
    pub best_date: String,
}

impl BestRecord {
    /// A record that has never been beaten, dated from the first sample.
    pub fn new(first_sample_ms: i64, date_format: &str) -> Self {
        Self {
            best_count: 0,
            best_date: format_ms(first_sample_ms, date_format),
        }
    }

    /// Check the current counters against the record. Runs on every
    /// bucket close, not only at day rollover, so a record can be set
    /// mid-day. Returns true when the record was updated.
    ///
    /// A zero `best_count` means the record was never established;
    /// the next close sets the baseline unconditionally, even from a
    /// small `walked_today`. Ties count as a new record, so the date
    /// reflects the most recent day that at least matched it.
    pub fn observe(&mut self, counters: &DayCounters, now_ms: i64, date_format: &str) -> bool {
        if self.best_count == 0 || counters.walked_today >= self.best_count {
            self.best_count = counters.walked_today;
            self.best_date = format_ms(now_ms, date_format);
            true
        } else {
            false
        }
    }
}
