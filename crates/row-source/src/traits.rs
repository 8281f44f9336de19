//! RowSource trait definition.

use futures::stream::BoxStream;
use sync_core::{Row, TableJobConfig, Watermark};
use thiserror::Error;

/// Errors raised while reading from the source. Both are fatal for a job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The source could not be reached or the session broke mid-read.
    #[error("Source connection error: {0}")]
    Connection(String),

    /// The query was rejected: bad SQL, missing table or column, a missing
    /// watermark for an incremental job, or a value that could not be decoded.
    #[error("Source query error: {0}")]
    Query(String),
}

/// A finite, single-pass sequence of rows from one query execution.
pub type RowStream<'a> = BoxStream<'a, Result<Row, SourceError>>;

/// Trait for reading a table job's rows from the source database.
///
/// # Usage Pattern
///
/// ```ignore
/// let mut rows = source.read(&job, Some(watermark)).await?;
/// while let Some(row) = rows.next().await {
///     let row = row?;
/// }
/// ```
///
/// Each call executes the job's query exactly once; incremental jobs bind
/// `watermark` as the query parameter. Re-reading requires calling `read`
/// again.
#[async_trait::async_trait]
pub trait RowSource: Send {
    async fn read<'a>(
        &'a mut self,
        job: &'a TableJobConfig,
        watermark: Option<Watermark>,
    ) -> Result<RowStream<'a>, SourceError>;
}
