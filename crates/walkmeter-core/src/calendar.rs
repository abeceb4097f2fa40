//! Wall-clock helpers: saturating deltas, calendar-day mapping, and
//! record-date formatting.
//!
//! Day rollover is detected by comparing full calendar dates, not
//! elapsed milliseconds, so buckets of irregular real-world length
//! cannot drift the day boundary. Comparing the complete date (rather
//! than only the day-of-year) keeps the comparison unambiguous across a
//! year boundary.

use chrono::{DateTime, NaiveDate, Utc};

/// Millisecond delta with saturating subtraction. If the clock went
/// backwards (`now < last`), returns 0 instead of wrapping; callers
/// treat such samples as interior to the current window.
#[inline]
pub fn dt_ms(now_ms: i64, last_ms: i64) -> i64 {
    if now_ms >= last_ms {
        now_ms - last_ms
    } else {
        0
    }
}

/// UTC calendar date of a millisecond timestamp. Out-of-range
/// timestamps (rejected earlier by sample validation) collapse to the
/// epoch date rather than panicking.
pub fn date_of_ms(ts_ms: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .date_naive()
}

/// Format a millisecond timestamp with the given `chrono` format
/// string. Fails on patterns chrono cannot render (for example an
/// unknown `%Q` specifier), which `Display` on the delayed formatter
/// would otherwise turn into a panic.
pub fn try_format_ms(ts_ms: i64, format: &str) -> Result<String, std::fmt::Error> {
    use std::fmt::Write;

    let dt = DateTime::<Utc>::from_timestamp_millis(ts_ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let mut out = String::new();
    write!(out, "{}", dt.format(format))?;
    Ok(out)
}

/// Format a millisecond timestamp for the human-readable personal-best
/// date. Config validation rejects unrenderable patterns up front; if
/// one slips through anyway, this falls back to a fixed rendering
/// instead of panicking mid-ingest.
pub fn format_ms(ts_ms: i64, format: &str) -> String {
    match try_format_ms(ts_ms, format) {
        Ok(s) => s,
        Err(_) => {
            tracing::warn!(format, "unrenderable date format, using fallback");
            format_ms(ts_ms, "%Y-%m-%d %H:%M:%S")
        }
    }
}
