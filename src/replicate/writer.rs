//! Paged bulk inserts with per-page failure isolation.

use serde::Deserialize;
use std::time::Duration;
use sync_core::Record;
use table_sink::{SinkError, TableSink};
use tracing::{debug, info, warn};

/// Pause after each page attempt, to stay under the destination's rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingPolicy {
    #[serde(deserialize_with = "crate::config::duration::deserialize")]
    pub success_delay: Duration,
    #[serde(deserialize_with = "crate::config::duration::deserialize")]
    pub failure_delay: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            success_delay: Duration::from_millis(500),
            failure_delay: Duration::from_secs(2),
        }
    }
}

impl PacingPolicy {
    /// No pauses at all.
    pub fn none() -> Self {
        Self {
            success_delay: Duration::ZERO,
            failure_delay: Duration::ZERO,
        }
    }

    fn delay_after(&self, succeeded: bool) -> Duration {
        if succeeded {
            self.success_delay
        } else {
            self.failure_delay
        }
    }
}

/// A page the destination did not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    /// 1-based page number
    pub index: usize,
    /// Records in the page
    pub rows: usize,
    pub error: SinkError,
}

/// Result of writing one table's records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub pages: usize,
    pub rows_attempted: usize,
    pub failures: Vec<PageFailure>,
}

impl WriteSummary {
    pub fn rows_failed(&self) -> usize {
        self.failures.iter().map(|f| f.rows).sum()
    }

    pub fn rows_inserted(&self) -> usize {
        self.rows_attempted - self.rows_failed()
    }
}

/// Splits records into pages of at most `batch_size` and inserts them in order.
///
/// A failed page is recorded and skipped; it is not retried. The writer
/// always moves on to the next page.
pub struct BatchWriter<'a, K: TableSink + ?Sized> {
    sink: &'a K,
    pacing: PacingPolicy,
}

impl<'a, K: TableSink + ?Sized> BatchWriter<'a, K> {
    pub fn new(sink: &'a K, pacing: PacingPolicy) -> Self {
        Self { sink, pacing }
    }

    pub async fn write(&self, table: &str, records: &[Record], batch_size: usize) -> WriteSummary {
        let batch_size = batch_size.max(1);
        let total_pages = records.len().div_ceil(batch_size);
        let mut summary = WriteSummary {
            pages: total_pages,
            rows_attempted: records.len(),
            failures: Vec::new(),
        };

        for (i, page) in records.chunks(batch_size).enumerate() {
            let index = i + 1;
            debug!("Sending page {index}/{total_pages} of {table} ({} records)", page.len());

            let succeeded = match self.sink.insert_records(table, page).await {
                Ok(()) => {
                    info!(
                        "Inserted page {index}/{total_pages} into {table} ({} records)",
                        page.len()
                    );
                    true
                }
                Err(e) => {
                    warn!("Failed to insert page {index}/{total_pages} into {table}: {e}");
                    summary.failures.push(PageFailure {
                        index,
                        rows: page.len(),
                        error: e,
                    });
                    false
                }
            };

            let delay = self.pacing.delay_after(succeeded);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSink, SinkCall};
    use serde_json::json;

    fn records(n: usize) -> Vec<Record> {
        (1..=n)
            .map(|id| Record::try_from(json!({ "id": id })).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_pages_are_ceil_n_over_b_in_order() {
        for (n, b) in [(0, 3), (1, 3), (3, 3), (7, 3), (10, 1), (5, 100)] {
            let sink = RecordingSink::new();
            let input = records(n);

            let summary = BatchWriter::new(&sink, PacingPolicy::none())
                .write("t", &input, b)
                .await;

            let pages = sink.inserted_pages("t");
            assert_eq!(pages.len(), n.div_ceil(b), "n={n} b={b}");
            assert_eq!(summary.pages, pages.len());
            assert!(pages.iter().all(|p| p.len() <= b));
            assert_eq!(pages.concat(), input);
        }
    }

    #[tokio::test]
    async fn test_failed_page_does_not_stop_later_pages() {
        let sink = RecordingSink::new().fail_page("t", 2);
        let input = records(7);

        let summary = BatchWriter::new(&sink, PacingPolicy::none())
            .write("t", &input, 3)
            .await;

        let attempted: Vec<usize> = sink
            .calls()
            .iter()
            .filter_map(|c| match c {
                SinkCall::Insert { records, .. } => Some(records.len()),
                _ => None,
            })
            .collect();
        assert_eq!(attempted, vec![3, 3, 1]);

        assert_eq!(summary.rows_attempted, 7);
        assert_eq!(summary.rows_failed(), 3);
        assert_eq!(summary.rows_inserted(), 4);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].index, 2);
        assert_eq!(sink.rows("t"), [&input[..3], &input[6..]].concat());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_after_each_attempt() {
        let sink = RecordingSink::new().fail_page("t", 1);
        let pacing = PacingPolicy {
            success_delay: Duration::from_millis(500),
            failure_delay: Duration::from_secs(2),
        };

        let start = tokio::time::Instant::now();
        BatchWriter::new(&sink, pacing)
            .write("t", &records(3), 1)
            .await;

        // 2s after the rejected page, 500ms after each of the other two
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(3100), "{elapsed:?}");
    }
}
