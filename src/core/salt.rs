//! Time-Derived Salt
//!
//! Binds an authorisation key to the moment a client claims an event
//! happened. The salt arithmetic is a protocol constant shared with every
//! shipped client: it must stay bit-for-bit identical, however odd it looks.
//!
//! Claimed timestamps must also fall inside a [`TimeWindow`] that
//! approximates "this could be the current moment somewhere on Earth",
//! unless the caller passes [`KeyTime::Override`].

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Timelike, Utc};

use crate::error::{PbxError, Result};

/// Accepted timestamp layouts (wall clock, no zone).
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Calendar fields the salt is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
    /// Four-digit year.
    pub year: i64,
    /// Month, 1-12.
    pub month: i64,
    /// Day of month, 1-31.
    pub day: i64,
    /// Hour, 0-23.
    pub hour: i64,
    /// Minute, 0-59.
    pub minute: i64,
    /// Second, 0-59.
    pub second: i64,
}

/// Fixed instant used for keys that never expire (2013-01-01 01:01:01).
pub const SENTINEL: TimeParts = TimeParts {
    year: 2013,
    month: 1,
    day: 1,
    hour: 1,
    minute: 1,
    second: 1,
};

impl From<NaiveDateTime> for TimeParts {
    fn from(ts: NaiveDateTime) -> Self {
        Self {
            year: ts.year() as i64,
            month: ts.month() as i64,
            day: ts.day() as i64,
            hour: ts.hour() as i64,
            minute: ts.minute() as i64,
            second: ts.second() as i64,
        }
    }
}

/// The time input of a key: a claimed moment, or the never-expiring sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTime {
    /// A client-claimed wall-clock moment; subject to the window check.
    At(NaiveDateTime),
    /// Pin the salt to [`SENTINEL`] and skip the window check.
    Override,
}

impl KeyTime {
    /// Parse a claimed timestamp.
    pub fn parse(raw: &str) -> Result<Self> {
        parse_timestamp(raw).map(Self::At)
    }

    /// Calendar fields used for salt derivation.
    pub fn parts(&self) -> TimeParts {
        match self {
            Self::At(ts) => TimeParts::from(*ts),
            Self::Override => SENTINEL,
        }
    }
}

/// Parse `YYYY-MM-DD HH:MM:SS` (or the `T`-separated form).
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| PbxError::InvalidTimestamp(format!("unparseable timestamp '{}'", raw)))
}

/// Derive the salt for a point in time.
///
/// `v1 = (Y*Mo)/D*S`, `v2 = (H-Mi)+S` with truncating integer division;
/// zeros clamp to 100. Even seconds give `|v1/v2|`, odd give `|v2/v1*10000|`.
pub fn derive_salt(t: TimeParts) -> i64 {
    let mut v1 = (t.year * t.month) / t.day * t.second;
    let mut v2 = (t.hour - t.minute) + t.second;

    if v1 == 0 {
        v1 = 100;
    }
    if v2 == 0 {
        v2 = 100;
    }

    if t.second % 2 == 0 {
        (v1 / v2).abs()
    } else {
        (v2 / v1 * 10000).abs()
    }
}

/// Acceptance window for claimed timestamps.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    /// UTC offset of the earliest realistic timezone, in seconds.
    pub earliest_offset_secs: i64,
    /// UTC offset of the latest realistic timezone, in seconds.
    pub latest_offset_secs: i64,
    /// How far outside the zone span a timestamp may drift.
    pub tolerance: Duration,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            // Pacific/Midway
            earliest_offset_secs: -11 * 3600,
            // Pacific/Tongatapu
            latest_offset_secs: 13 * 3600,
            tolerance: Duration::days(1),
        }
    }
}

impl TimeWindow {
    /// Wall-clock "now" in the earliest timezone.
    pub fn earliest_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.naive_utc() + Duration::seconds(self.earliest_offset_secs)
    }

    /// Wall-clock "now" in the latest timezone.
    pub fn latest_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.naive_utc() + Duration::seconds(self.latest_offset_secs)
    }

    /// Check a claimed timestamp against the window.
    pub fn check(&self, ts: NaiveDateTime, now: DateTime<Utc>) -> Result<()> {
        let lower = self.earliest_now(now) - self.tolerance;
        let upper = self.latest_now(now) + self.tolerance;

        if ts < lower {
            return Err(PbxError::InvalidTimestamp(format!("{} is too far in the past", ts)));
        }
        if ts > upper {
            return Err(PbxError::InvalidTimestamp(format!("{} is too far in the future", ts)));
        }
        Ok(())
    }

    /// Check a key time; the override always passes.
    pub fn admit(&self, time: &KeyTime, now: DateTime<Utc>) -> Result<()> {
        match time {
            KeyTime::At(ts) => self.check(*ts, now),
            KeyTime::Override => Ok(()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 1, 18, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_sentinel_salt() {
        // v1 = 2013*1/1*1 = 2013, v2 = (1-1)+1 = 1, odd second: 1/2013*10000 = 0
        assert_eq!(derive_salt(SENTINEL), 0);
    }

    #[test]
    fn test_even_second_salt() {
        // v1 = (2014*1)/18*46 = 111*46 = 5106, v2 = (12-30)+46 = 28
        let salt = derive_salt(TimeParts::from(ts("2014-01-18 12:30:46")));
        assert_eq!(salt, 5106 / 28);
    }

    #[test]
    fn test_odd_second_salt() {
        // v1 = (2014*12)/3*1 = 8056, v2 = (23-0)+1 = 24: 24/8056 truncates to 0
        assert_eq!(derive_salt(TimeParts::from(ts("2014-12-03 23:00:01"))), 0);
        // v1 = (2014*1)/31*41 = 2624, v2 = (23-0)+41 = 64
        assert_eq!(derive_salt(TimeParts::from(ts("2014-01-31 23:00:41"))), 0);
    }

    #[test]
    fn test_zero_clamp() {
        // Second 0: v1 = 0 -> 100; v2 = (5-5)+0 = 0 -> 100; even: 100/100
        assert_eq!(derive_salt(TimeParts::from(ts("2014-06-10 05:05:00"))), 1);
    }

    #[test]
    fn test_negative_is_absolute() {
        // v1 = (2014*2)/2*2 = 4028, v2 = (0-59)+2 = -57 -> |4028 / -57| = 70
        assert_eq!(derive_salt(TimeParts::from(ts("2014-02-02 00:59:02"))), 70);
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(ts("2014-01-18 12:30:46"), ts("2014-01-18T12:30:46"));
        assert!(parse_timestamp("yesterday").is_err());
        assert!(matches!(parse_timestamp("2014-13-01 00:00:00"), Err(PbxError::InvalidTimestamp(_))));
    }

    #[test]
    fn test_window_accepts_utc_now() {
        let window = TimeWindow::default();
        assert!(window.check(now().naive_utc(), now()).is_ok());
    }

    #[test]
    fn test_window_accepts_zone_extremes() {
        let window = TimeWindow::default();
        assert!(window.check(window.earliest_now(now()), now()).is_ok());
        assert!(window.check(window.latest_now(now()), now()).is_ok());
    }

    #[test]
    fn test_window_rejects_far_future() {
        let window = TimeWindow::default();
        let future = window.latest_now(now()) + Duration::days(1) + Duration::seconds(1);
        assert!(matches!(window.check(future, now()), Err(PbxError::InvalidTimestamp(_))));
    }

    #[test]
    fn test_window_rejects_far_past() {
        let window = TimeWindow::default();
        let past = window.earliest_now(now()) - Duration::days(1) - Duration::seconds(1);
        assert!(matches!(window.check(past, now()), Err(PbxError::InvalidTimestamp(_))));
    }

    #[test]
    fn test_override_skips_window() {
        let window = TimeWindow::default();
        assert!(window.admit(&KeyTime::Override, now()).is_ok());
        assert_eq!(KeyTime::Override.parts(), SENTINEL);
    }
}
