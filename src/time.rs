//! Code for working with sample timestamps.
//!
//! All timestamps are expressed in a single fixed offset, UTC+08:00, which is the local time of
//! the feed. This is independent of the timezone of the machine running the program, so rows
//! written from different machines can't collide or drift.
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Timelike, Utc};
use std::fmt;
use std::str::FromStr;

/// The format of timestamps in the history table
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Offset of sample timestamps from UTC, in seconds
const SAMPLE_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// The fixed offset used for all sample timestamps
fn sample_offset() -> FixedOffset {
    FixedOffset::east_opt(SAMPLE_UTC_OFFSET_SECS).expect("Offset is within bounds")
}

/// The time at which a sample was taken, at minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleTime(NaiveDateTime);

impl SampleTime {
    /// The current time, truncated to the minute
    pub fn now() -> Self {
        Self::from_utc(&Utc::now())
    }

    /// Convert a UTC time to a sample time, truncating seconds
    pub fn from_utc(time: &DateTime<Utc>) -> Self {
        let local = sample_offset().from_utc_datetime(&time.naive_utc()).naive_local();
        Self(
            local
                .with_second(0)
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(local),
        )
    }
}

impl fmt::Display for SampleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for SampleTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let time = NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
            .with_context(|| format!("Invalid timestamp '{s}': expected YYYY-MM-DD HH:MM"))?;
        Ok(Self(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;

    #[test]
    fn test_from_utc() {
        let utc = Utc.with_ymd_and_hms(2025, 1, 31, 17, 5, 59).unwrap();
        assert_eq!(SampleTime::from_utc(&utc).to_string(), "2025-02-01 01:05");
    }

    #[test]
    fn test_parse_round_trip() {
        let time: SampleTime = "2025-06-01 13:45".parse().unwrap();
        assert_eq!(time.to_string(), "2025-06-01 13:45");
    }

    #[test]
    fn test_parse_invalid() {
        assert_error!(
            "2025-06-01T13:45".parse::<SampleTime>(),
            "Invalid timestamp '2025-06-01T13:45': expected YYYY-MM-DD HH:MM"
        );
    }

    #[test]
    fn test_ordering() {
        let earlier: SampleTime = "2025-06-01 09:59".parse().unwrap();
        let later: SampleTime = "2025-06-01 10:00".parse().unwrap();
        assert!(earlier < later);
    }
}
