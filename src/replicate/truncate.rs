//! Best-effort table truncation.

use table_sink::TableSink;
use tracing::{info, warn};

/// Result of the truncate step.
///
/// A failed truncate never stops the job; the following inserts become
/// additive and may collide with rows already in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruncateOutcome {
    Succeeded,
    Failed(String),
}

pub struct TableTruncator<'a, K: TableSink + ?Sized> {
    sink: &'a K,
}

impl<'a, K: TableSink + ?Sized> TableTruncator<'a, K> {
    pub fn new(sink: &'a K) -> Self {
        Self { sink }
    }

    pub async fn truncate(&self, table: &str) -> TruncateOutcome {
        match self.sink.truncate_table(table).await {
            Ok(()) => {
                info!("Truncated {table}");
                TruncateOutcome::Succeeded
            }
            Err(e) => {
                warn!("Failed to truncate {table}, inserts will be additive: {e}");
                TruncateOutcome::Failed(e.to_string())
            }
        }
    }
}
