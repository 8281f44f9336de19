//! MssqlSync Library
//!
//! A library for replicating SQL Server tables into a hosted PostgREST-style
//! datastore, one table job at a time.
//!
//! # Features
//!
//! - Full refresh: truncate the destination table, then copy every source row
//! - Incremental: copy rows newer than the shared watermark, no truncate
//! - Paged inserts: a rejected page is reported and skipped, never fatal
//! - Audit log: one run entry per job plus a single "last sync" watermark
//!
//! # Crates
//!
//! - `sync_core` - rows, records, job configuration, run entries, watermark
//! - `json_types` - row to record transformation
//! - `mssql_source` - SQL Server reader over tiberius
//! - `rest_sink` - HTTP destination over reqwest
//!
//! The destination tables are expected to enforce primary-key uniqueness:
//! inserts are never upserts, so after a failed truncate a duplicate row is
//! reported as a rejected page.
//!
//! # CLI Usage
//!
//! ```bash
//! # Run every job in the file
//! mssql-sync run --config jobs.yaml
//!
//! # Run two jobs without touching the destination
//! mssql-sync run --config jobs.yaml --table tblsales --table tblsaleitems --dry-run
//!
//! # Inspect or reset the incremental watermark
//! mssql-sync watermark show --config jobs.yaml
//! mssql-sync watermark set --config jobs.yaml --at "2024-01-01 00:00:00"
//! ```

use clap::Parser;
use rest_sink::RestSinkConfig;

pub mod batch;
pub mod config;
pub mod replicate;
pub mod testing;

pub use batch::{run_batch, BatchReport, BatchSettings, WatermarkUpdate};
pub use config::JobsFile;

#[derive(Parser, Clone)]
pub struct SourceOpts {
    /// SQL Server connection string (ADO.NET syntax)
    #[arg(long, env = "MSSQL_CONNECTION_STRING", hide_env_values = true)]
    pub source_connection_string: String,
}

#[derive(Parser, Clone)]
pub struct DestinationOpts {
    /// Destination project URL
    #[arg(long, env = "DESTINATION_URL")]
    pub destination_url: String,

    /// Destination API key, sent as `apikey` and as a bearer token
    #[arg(long, env = "DESTINATION_API_KEY", hide_env_values = true)]
    pub destination_api_key: String,

    /// Timeout for each destination call
    /// Format: duration in seconds or with units like "500ms", "30s", "2m"
    #[arg(long, default_value = "60s")]
    pub request_timeout: String,
}

impl DestinationOpts {
    /// Sink configuration for this destination and the jobs file's audit tables.
    pub fn rest_config(&self, jobs: &JobsFile) -> anyhow::Result<RestSinkConfig> {
        let timeout = config::parse_duration(&self.request_timeout)?;
        let audit = &jobs.audit;

        let mut rest = RestSinkConfig::new(&self.destination_url, &self.destination_api_key)
            .with_timeout(timeout)
            .with_timezone(jobs.timezone);
        rest.truncate_function = audit.truncate_function.clone();
        rest.run_log_table = audit.run_log_table.clone();
        rest.watermark_table = audit.watermark_table.clone();
        rest.watermark_row_id = audit.watermark_row_id;
        Ok(rest)
    }
}

impl From<&JobsFile> for BatchSettings {
    fn from(jobs: &JobsFile) -> Self {
        Self {
            timezone: jobs.timezone,
            default_watermark: jobs.default_watermark,
            pacing: jobs.pacing,
        }
    }
}
