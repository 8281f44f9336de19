//! Connection and audit-table settings for the REST sink.

use chrono_tz::Tz;
use std::time::Duration;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RestSinkConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    pub api_key: String,
    /// Upper bound for each HTTP call
    pub timeout: Duration,
    /// Remote procedure that truncates a named table
    pub truncate_function: String,
    /// Append-only audit table
    pub run_log_table: String,
    /// Single-row watermark table
    pub watermark_table: String,
    pub watermark_row_id: i64,
    /// Zone RFC 3339 watermarks are converted into
    pub timezone: Tz,
}

impl RestSinkConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            truncate_function: "truncate_table".to_string(),
            run_log_table: "tblsynctablelogs".to_string(),
            watermark_table: "tblsynclogs".to_string(),
            watermark_row_id: 1,
            timezone: Tz::UTC,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.base_url.trim_end_matches('/'))
    }
}
