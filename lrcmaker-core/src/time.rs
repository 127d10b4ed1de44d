//! Timestamp text codec and duration conversion utilities.
//!
//! Timestamps are carried as elapsed milliseconds (`u64`) and rendered in the
//! LRC `MM:SS.CC` form. Formatting truncates toward zero at every unit, so
//! sub-centisecond precision is dropped and `parse(format(ms))` returns `ms`
//! truncated to whole centiseconds.

use crate::error::{CoreError, Result};
use std::time::Duration;

const MS_PER_CENTI: u64 = 10;
const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60_000;

/// Text form of an unset timestamp. Identical to a genuine zero timestamp,
/// so "unset" must be tracked through `Option`, never by comparing text.
pub const UNSET_TIMESTAMP: &str = "00:00.00";

/// Format elapsed milliseconds as `MM:SS.CC`.
///
/// Minutes are zero-padded to two digits and grow unbounded beyond that.
#[must_use]
pub fn format_timestamp(ms: u64) -> String {
    let minutes = ms / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let hundredths = (ms % MS_PER_SECOND) / MS_PER_CENTI;
    format!("{minutes:02}:{seconds:02}.{hundredths:02}")
}

/// Format an optional timestamp, rendering `None` as [`UNSET_TIMESTAMP`].
#[must_use]
pub fn format_optional(ms: Option<u64>) -> String {
    ms.map_or_else(|| UNSET_TIMESTAMP.to_string(), format_timestamp)
}

/// Format a track length as `MM:SS` for the position display.
#[must_use]
pub fn format_length(ms: u64) -> String {
    let minutes = ms / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    format!("{minutes:02}:{seconds:02}")
}

/// Parse an `MM:SS.CC` timestamp into milliseconds.
///
/// # Errors
///
/// Returns [`CoreError::MalformedTimestamp`] when the text is not exactly
/// two-or-more minute digits, a colon, two second digits (00-59), a dot and
/// two hundredths digits.
pub fn parse_timestamp(input: &str) -> Result<u64> {
    let malformed = || CoreError::MalformedTimestamp {
        input: input.to_string(),
    };

    let (minutes, rest) = input.split_once(':').ok_or_else(malformed)?;
    let (seconds, hundredths) = rest.split_once('.').ok_or_else(malformed)?;

    if minutes.len() < 2 || seconds.len() != 2 || hundredths.len() != 2 {
        return Err(malformed());
    }

    let minutes = parse_digits(minutes).ok_or_else(malformed)?;
    let seconds = parse_digits(seconds).ok_or_else(malformed)?;
    let hundredths = parse_digits(hundredths).ok_or_else(malformed)?;

    if seconds >= 60 {
        return Err(malformed());
    }

    minutes
        .checked_mul(MS_PER_MINUTE)
        .and_then(|ms| ms.checked_add(seconds * MS_PER_SECOND + hundredths * MS_PER_CENTI))
        .ok_or_else(malformed)
}

/// Parse a run of ASCII digits. Rejects signs and whitespace, which
/// `str::parse` would otherwise accept for a leading `+`.
fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    ///
    /// In practice, this is always safe because durations exceeding `u64::MAX`
    /// milliseconds would represent ~584 million years.
    fn as_millis_u64(&self) -> u64;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }
}
