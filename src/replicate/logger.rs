//! Run log and watermark bookkeeping.

use chrono::NaiveDateTime;
use sync_core::{SyncRunRecord, SyncStatus, Watermark};
use table_sink::{SinkError, TableSink};
use tracing::{info, warn};

pub struct SyncLogger<'a, K: TableSink + ?Sized> {
    sink: &'a K,
}

impl<'a, K: TableSink + ?Sized> SyncLogger<'a, K> {
    pub fn new(sink: &'a K) -> Self {
        Self { sink }
    }

    /// Append one run entry. Failures are returned for the caller to report;
    /// they never change the job's outcome.
    pub async fn append(&self, run: &SyncRunRecord) -> Result<(), SinkError> {
        match self.sink.append_sync_run(run).await {
            Ok(()) => {
                info!(
                    "Logged {} run of {} ({} records)",
                    run.status, run.table, run.rows_synced
                );
                Ok(())
            }
            Err(e) => {
                warn!("Failed to log run of {}: {e}", run.table);
                Err(e)
            }
        }
    }

    /// Record a job that hit a fatal error.
    pub async fn append_failure(
        &self,
        table: &str,
        run_at: NaiveDateTime,
    ) -> Result<(), SinkError> {
        self.append(&SyncRunRecord {
            table: table.to_string(),
            run_at,
            rows_synced: 0,
            status: SyncStatus::Failed,
        })
        .await
    }

    pub async fn current_watermark(&self) -> Result<Option<Watermark>, SinkError> {
        self.sink.read_watermark().await
    }

    pub async fn advance_watermark(&self, to: &Watermark) -> Result<(), SinkError> {
        self.sink.upsert_watermark(to).await?;
        info!("Advanced watermark to {to}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_append_failure_records_failed_status() {
        let sink = RecordingSink::new();
        SyncLogger::new(&sink)
            .append_failure("tblsales", noon())
            .await
            .unwrap();

        let runs = sink.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, SyncStatus::Failed);
        assert_eq!(runs[0].rows_synced, 0);
    }

    #[tokio::test]
    async fn test_append_error_is_returned() {
        let sink = RecordingSink::new().fail_append(SinkError::Timeout("slow".to_string()));
        let err = SyncLogger::new(&sink)
            .append_failure("tblsales", noon())
            .await
            .unwrap_err();
        assert_eq!(err, SinkError::Timeout("slow".to_string()));
        assert!(sink.runs().is_empty());
    }

    #[tokio::test]
    async fn test_watermark_overwrites() {
        let sink = RecordingSink::new();
        let logger = SyncLogger::new(&sink);
        assert_eq!(logger.current_watermark().await.unwrap(), None);

        let first = Watermark::new(noon());
        let second = Watermark::new(noon() + chrono::Duration::hours(1));
        logger.advance_watermark(&first).await.unwrap();
        logger.advance_watermark(&second).await.unwrap();

        assert_eq!(logger.current_watermark().await.unwrap(), Some(second));
    }
}
