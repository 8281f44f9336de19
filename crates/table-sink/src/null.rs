//! Sink that performs no destination mutation.

use crate::traits::{SinkError, TableSink};
use sync_core::{Record, SyncRunRecord, Watermark};
use tracing::debug;

/// A sink that accepts every write and discards it.
///
/// Used for dry runs: the source is still read and every row still
/// transformed, but nothing is truncated, inserted, or logged. Reads are
/// delegated to `inner` when one is given so incremental jobs still see the
/// real watermark.
pub struct NullSink<K = NoReads> {
    inner: Option<K>,
}

/// Placeholder read side for a [`NullSink`] without a delegate.
pub struct NoReads;

impl NullSink<NoReads> {
    pub fn new() -> Self {
        Self { inner: None }
    }
}

impl Default for NullSink<NoReads> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: TableSink> NullSink<K> {
    /// Discard writes but read the watermark from `inner`.
    pub fn reading_from(inner: K) -> Self {
        Self { inner: Some(inner) }
    }
}

#[async_trait::async_trait]
impl TableSink for NoReads {
    async fn truncate_table(&self, _table: &str) -> Result<(), SinkError> {
        Ok(())
    }

    async fn insert_records(&self, _table: &str, _records: &[Record]) -> Result<(), SinkError> {
        Ok(())
    }

    async fn append_sync_run(&self, _run: &SyncRunRecord) -> Result<(), SinkError> {
        Ok(())
    }

    async fn read_watermark(&self) -> Result<Option<Watermark>, SinkError> {
        Ok(None)
    }

    async fn upsert_watermark(&self, _watermark: &Watermark) -> Result<(), SinkError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl<K: TableSink> TableSink for NullSink<K> {
    async fn truncate_table(&self, table: &str) -> Result<(), SinkError> {
        debug!("Dry-run: Would truncate {table}");
        Ok(())
    }

    async fn insert_records(&self, table: &str, records: &[Record]) -> Result<(), SinkError> {
        debug!("Dry-run: Would insert {} records into {table}", records.len());
        Ok(())
    }

    async fn append_sync_run(&self, run: &SyncRunRecord) -> Result<(), SinkError> {
        debug!(
            "Dry-run: Would log {} run of {} ({} rows)",
            run.status, run.table, run.rows_synced
        );
        Ok(())
    }

    async fn read_watermark(&self) -> Result<Option<Watermark>, SinkError> {
        match &self.inner {
            Some(inner) => inner.read_watermark().await,
            None => Ok(None),
        }
    }

    async fn upsert_watermark(&self, watermark: &Watermark) -> Result<(), SinkError> {
        debug!("Dry-run: Would set watermark to {watermark}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedWatermark(Watermark);

    #[async_trait::async_trait]
    impl TableSink for FixedWatermark {
        async fn truncate_table(&self, _table: &str) -> Result<(), SinkError> {
            panic!("truncate must not reach the inner sink")
        }

        async fn insert_records(&self, _table: &str, _records: &[Record]) -> Result<(), SinkError> {
            panic!("insert must not reach the inner sink")
        }

        async fn append_sync_run(&self, _run: &SyncRunRecord) -> Result<(), SinkError> {
            panic!("append must not reach the inner sink")
        }

        async fn read_watermark(&self) -> Result<Option<Watermark>, SinkError> {
            Ok(Some(self.0))
        }

        async fn upsert_watermark(&self, _watermark: &Watermark) -> Result<(), SinkError> {
            panic!("upsert must not reach the inner sink")
        }
    }

    #[tokio::test]
    async fn test_null_sink_accepts_writes() {
        let sink = NullSink::new();
        let record = Record::try_from(json!({"id": 1})).unwrap();

        sink.truncate_table("tblcity").await.unwrap();
        sink.insert_records("tblcity", &[record]).await.unwrap();
        assert_eq!(sink.read_watermark().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_null_sink_delegates_reads_only() {
        let watermark: Watermark = "2024-01-01T00:00:00".parse().unwrap();
        let sink = NullSink::reading_from(FixedWatermark(watermark));

        sink.truncate_table("tblcity").await.unwrap();
        sink.insert_records("tblcity", &[]).await.unwrap();
        sink.upsert_watermark(&watermark).await.unwrap();
        assert_eq!(sink.read_watermark().await.unwrap(), Some(watermark));
    }
}
