//! TableSink trait definition.

use sync_core::{Record, SyncRunRecord, Watermark};
use thiserror::Error;

/// Errors returned by destination calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The destination could not be reached.
    #[error("Destination unreachable: {0}")]
    Unreachable(String),

    /// The call exceeded its timeout.
    #[error("Destination call timed out: {0}")]
    Timeout(String),

    /// The destination answered with a non-success status.
    #[error("Destination rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The destination answered with something that could not be interpreted.
    #[error("Invalid destination response: {0}")]
    InvalidResponse(String),
}

/// Trait for writing to the destination datastore.
///
/// # Usage Pattern
///
/// Driver code is generic over the sink:
///
/// ```ignore
/// pub async fn run_job<K: TableSink>(sink: &K, job: &TableJobConfig) -> Result<()> {
///     sink.truncate_table(&job.name).await?;
///     sink.insert_records(&job.name, &page).await?;
/// }
/// ```
///
/// Every call except [`TableSink::upsert_watermark`] is not idempotent:
/// retrying an insert can duplicate rows unless the destination enforces
/// primary-key uniqueness.
#[async_trait::async_trait]
pub trait TableSink: Send + Sync {
    /// Remove every row from `table`.
    async fn truncate_table(&self, table: &str) -> Result<(), SinkError>;

    /// Insert one page of records into `table` in a single call.
    async fn insert_records(&self, table: &str, records: &[Record]) -> Result<(), SinkError>;

    /// Append one entry to the run log.
    async fn append_sync_run(&self, run: &SyncRunRecord) -> Result<(), SinkError>;

    /// Read the shared watermark; `None` when it has never been written.
    async fn read_watermark(&self) -> Result<Option<Watermark>, SinkError>;

    /// Overwrite the shared watermark.
    async fn upsert_watermark(&self, watermark: &Watermark) -> Result<(), SinkError>;
}
