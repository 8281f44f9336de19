//! Audit log entries and the incremental watermark.

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Outcome of one table job as recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Every page was inserted.
    Success,
    /// Some pages failed, some were inserted.
    Partial,
    /// Nothing was inserted, or the job hit a fatal error.
    Failed,
}

impl SyncStatus {
    /// Derive the status from attempted vs. failed record counts.
    ///
    /// An empty run with no failures is a success.
    pub fn from_counts(rows_attempted: usize, rows_failed: usize) -> Self {
        if rows_failed == 0 {
            SyncStatus::Success
        } else if rows_failed >= rows_attempted {
            SyncStatus::Failed
        } else {
            SyncStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Partial => "partial",
            SyncStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only audit entry, written once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRunRecord {
    /// Destination table name
    pub table: String,
    /// Wall-clock time the job batch started
    pub run_at: NaiveDateTime,
    /// Records attempted (the source row count)
    pub rows_synced: usize,
    pub status: SyncStatus,
}

/// Error parsing a watermark string.
#[derive(Debug, Error)]
#[error("Invalid watermark timestamp '{0}'")]
pub struct WatermarkParseError(pub String);

/// Formats accepted for naive timestamps, most specific first.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// The boundary between already-synced and not-yet-synced rows.
///
/// The value is a wall-clock timestamp in the zone the jobs file names,
/// matching how the source database stores its own `datetime` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(NaiveDateTime);

impl Watermark {
    pub fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// Current wall-clock time in `tz`, truncated to whole seconds so it
    /// survives a round trip through [`Watermark::to_log_string`].
    pub fn now_in<Tz: TimeZone>(tz: &Tz) -> Self {
        Self(Utc::now().with_timezone(tz).naive_local().trunc_subsecs(0))
    }

    /// Parse a naive timestamp, or an RFC 3339 timestamp converted into `tz`.
    pub fn parse_in<Tz: TimeZone>(s: &str, tz: &Tz) -> Result<Self, WatermarkParseError> {
        if let Ok(watermark) = s.parse::<Watermark>() {
            return Ok(watermark);
        }
        DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| Self(dt.with_timezone(tz).naive_local()))
            .map_err(|_| WatermarkParseError(s.to_string()))
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Format used by the destination audit tables: `%Y-%m-%d %H:%M:%S`.
    pub fn to_log_string(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl FromStr for Watermark {
    type Err = WatermarkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(Self)
            .ok_or_else(|| WatermarkParseError(s.to_string()))
    }
}

impl std::fmt::Display for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S%.f"))
    }
}

impl From<NaiveDateTime> for Watermark {
    fn from(at: NaiveDateTime) -> Self {
        Self(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_status_from_counts() {
        assert_eq!(SyncStatus::from_counts(0, 0), SyncStatus::Success);
        assert_eq!(SyncStatus::from_counts(420, 0), SyncStatus::Success);
        assert_eq!(SyncStatus::from_counts(420, 8), SyncStatus::Partial);
        assert_eq!(SyncStatus::from_counts(420, 420), SyncStatus::Failed);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SyncStatus::Partial).unwrap(),
            "\"partial\""
        );
    }

    #[test]
    fn test_watermark_parse_naive_formats() {
        let expected = Watermark::new(at(0, 0, 0));
        assert_eq!("2024-01-01T00:00:00".parse::<Watermark>().unwrap(), expected);
        assert_eq!("2024-01-01 00:00:00".parse::<Watermark>().unwrap(), expected);
        assert_eq!(
            "2024-01-01T00:00:00.000".parse::<Watermark>().unwrap(),
            expected
        );
        assert!("yesterday".parse::<Watermark>().is_err());
    }

    #[test]
    fn test_watermark_parse_rfc3339_converts_zone() {
        let karachi = FixedOffset::east_opt(5 * 3600).unwrap();
        let watermark = Watermark::parse_in("2024-01-01T05:00:00Z", &karachi).unwrap();
        assert_eq!(watermark, Watermark::new(at(10, 0, 0)));
    }

    #[test]
    fn test_watermark_formats() {
        let watermark = Watermark::new(at(13, 5, 9));
        assert_eq!(watermark.to_string(), "2024-01-01T13:05:09");
        assert_eq!(watermark.to_log_string(), "2024-01-01 13:05:09");
    }

    #[test]
    fn test_now_survives_log_round_trip() {
        let karachi = FixedOffset::east_opt(5 * 3600).unwrap();
        let now = Watermark::now_in(&karachi);

        assert_eq!(now.as_naive().and_utc().timestamp_subsec_nanos(), 0);
        assert_eq!(now.to_log_string().parse::<Watermark>().unwrap(), now);
    }
}
