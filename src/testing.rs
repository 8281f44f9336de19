//! In-memory source and sink for exercising the replicator without a
//! SQL Server instance or an HTTP destination.
//!
//! [`MemorySource`] serves canned rows per table and can fail on open or
//! part-way through a stream. [`RecordingSink`] keeps every call it receives
//! and the resulting table contents, and can be told to reject specific
//! pages, the truncate call, the run-log append, or watermark access.

use futures::StreamExt;
use row_source::{RowSource, RowStream, SourceError};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use sync_core::{Record, Row, ScalarValue, SyncRunRecord, TableJobConfig, Watermark};
use table_sink::{SinkError, TableSink};

/// Row source backed by per-table vectors, keyed by destination table name.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: HashMap<String, Vec<Row>>,
    open_failures: HashMap<String, SourceError>,
    stream_failures: HashMap<String, (usize, SourceError)>,
    reads: Vec<(String, Option<Watermark>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(table.to_lowercase(), rows);
        self
    }

    /// Fail the read for `table` before any row is produced.
    pub fn failing(mut self, table: &str, error: SourceError) -> Self {
        self.open_failures.insert(table.to_lowercase(), error);
        self
    }

    /// Yield `rows` rows for `table`, then fail the stream.
    pub fn failing_after(mut self, table: &str, rows: usize, error: SourceError) -> Self {
        self.stream_failures
            .insert(table.to_lowercase(), (rows, error));
        self
    }

    /// Every read so far, as (table, bound watermark).
    pub fn reads(&self) -> Vec<(String, Option<Watermark>)> {
        self.reads.clone()
    }
}

/// `column > watermark`, with NULL and non-temporal values never matching.
fn after_watermark(row: &Row, column: &str, watermark: &Watermark) -> bool {
    match row.get(column) {
        Some(ScalarValue::DateTime(at)) => *at > watermark.as_naive(),
        Some(ScalarValue::Date(day)) => day
            .and_hms_opt(0, 0, 0)
            .is_some_and(|at| at > watermark.as_naive()),
        _ => false,
    }
}

#[async_trait::async_trait]
impl RowSource for MemorySource {
    async fn read<'a>(
        &'a mut self,
        job: &'a TableJobConfig,
        watermark: Option<Watermark>,
    ) -> Result<RowStream<'a>, SourceError> {
        let key = job.name.to_lowercase();
        self.reads.push((job.name.clone(), watermark));

        if let Some(e) = self.open_failures.get(&key) {
            return Err(e.clone());
        }
        if job.is_incremental() && watermark.is_none() {
            return Err(SourceError::Query(format!(
                "Incremental job '{}' has no watermark to bind",
                job.name
            )));
        }

        let rows = self
            .tables
            .get(&key)
            .ok_or_else(|| SourceError::Query(format!("Invalid object name '{}'", job.name)))?;

        let filter = match (&job.watermark_column, &watermark) {
            (Some(column), Some(watermark)) if job.is_incremental() => Some((column, watermark)),
            _ => None,
        };

        let mut items: Vec<Result<Row, SourceError>> = rows
            .iter()
            .filter(|row| filter.is_none_or(|(column, wm)| after_watermark(row, column, wm)))
            .cloned()
            .map(Ok)
            .collect();

        if let Some((after, e)) = self.stream_failures.get(&key) {
            items.truncate(*after);
            items.push(Err(e.clone()));
        }

        Ok(futures::stream::iter(items).boxed())
    }
}

/// One call received by a [`RecordingSink`], successful or not.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Truncate(String),
    Insert { table: String, records: Vec<Record> },
    AppendRun(SyncRunRecord),
    ReadWatermark,
    UpsertWatermark(Watermark),
}

#[derive(Debug, Default)]
struct SinkState {
    calls: Vec<SinkCall>,
    tables: HashMap<String, Vec<Record>>,
    pages: HashMap<String, Vec<Vec<Record>>>,
    insert_attempts: HashMap<String, usize>,
    runs: Vec<SyncRunRecord>,
    watermark: Option<Watermark>,
}

/// Destination fake that records calls and holds table contents in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    state: Mutex<SinkState>,
    failing_pages: HashSet<(String, usize)>,
    primary_keys: HashMap<String, String>,
    truncate_error: Option<SinkError>,
    append_error: Option<SinkError>,
    read_error: Option<SinkError>,
    upsert_error: Option<SinkError>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a stored watermark.
    pub fn with_watermark(self, watermark: Watermark) -> Self {
        self.lock().watermark = Some(watermark);
        self
    }

    /// Start with rows already in `table`.
    pub fn with_existing(self, table: &str, records: Vec<Record>) -> Self {
        self.lock().tables.insert(table.to_string(), records);
        self
    }

    /// Reject pages whose `field` value already exists in `table`.
    pub fn with_primary_key(mut self, table: &str, field: &str) -> Self {
        self.primary_keys
            .insert(table.to_string(), field.to_string());
        self
    }

    /// Reject the `index`-th (1-based) insert call for `table`.
    pub fn fail_page(mut self, table: &str, index: usize) -> Self {
        self.failing_pages.insert((table.to_string(), index));
        self
    }

    pub fn fail_truncate(mut self, error: SinkError) -> Self {
        self.truncate_error = Some(error);
        self
    }

    pub fn fail_append(mut self, error: SinkError) -> Self {
        self.append_error = Some(error);
        self
    }

    pub fn fail_watermark_read(mut self, error: SinkError) -> Self {
        self.read_error = Some(error);
        self
    }

    pub fn fail_watermark_upsert(mut self, error: SinkError) -> Self {
        self.upsert_error = Some(error);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.lock().calls.clone()
    }

    /// Pages accepted for `table`, in insert order.
    pub fn inserted_pages(&self, table: &str) -> Vec<Vec<Record>> {
        self.lock().pages.get(table).cloned().unwrap_or_default()
    }

    /// Current contents of `table`.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn runs(&self) -> Vec<SyncRunRecord> {
        self.lock().runs.clone()
    }

    pub fn watermark(&self) -> Option<Watermark> {
        self.lock().watermark
    }

    fn duplicate_key(&self, state: &SinkState, table: &str, records: &[Record]) -> Option<String> {
        let field = self.primary_keys.get(table)?;
        let mut seen: HashSet<String> = state
            .tables
            .get(table)
            .into_iter()
            .flatten()
            .filter_map(|r| r.get(field).map(|v| v.to_string()))
            .collect();

        records
            .iter()
            .filter_map(|r| r.get(field).map(|v| v.to_string()))
            .find(|key| !seen.insert(key.clone()))
    }
}

#[async_trait::async_trait]
impl TableSink for RecordingSink {
    async fn truncate_table(&self, table: &str) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::Truncate(table.to_string()));

        if let Some(e) = &self.truncate_error {
            return Err(e.clone());
        }
        state.tables.remove(table);
        Ok(())
    }

    async fn insert_records(&self, table: &str, records: &[Record]) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::Insert {
            table: table.to_string(),
            records: records.to_vec(),
        });

        let attempt = state
            .insert_attempts
            .entry(table.to_string())
            .or_default();
        *attempt += 1;
        let attempt = *attempt;

        if self.failing_pages.contains(&(table.to_string(), attempt)) {
            return Err(SinkError::Rejected {
                status: 500,
                body: format!("page {attempt} rejected"),
            });
        }
        if let Some(key) = self.duplicate_key(&state, table, records) {
            return Err(SinkError::Rejected {
                status: 409,
                body: format!("duplicate key value violates unique constraint: {key}"),
            });
        }

        state
            .tables
            .entry(table.to_string())
            .or_default()
            .extend_from_slice(records);
        state
            .pages
            .entry(table.to_string())
            .or_default()
            .push(records.to_vec());
        Ok(())
    }

    async fn append_sync_run(&self, run: &SyncRunRecord) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::AppendRun(run.clone()));

        if let Some(e) = &self.append_error {
            return Err(e.clone());
        }
        state.runs.push(run.clone());
        Ok(())
    }

    async fn read_watermark(&self) -> Result<Option<Watermark>, SinkError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::ReadWatermark);

        if let Some(e) = &self.read_error {
            return Err(e.clone());
        }
        Ok(state.watermark)
    }

    async fn upsert_watermark(&self, watermark: &Watermark) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::UpsertWatermark(*watermark));

        if let Some(e) = &self.upsert_error {
            return Err(e.clone());
        }
        state.watermark = Some(*watermark);
        Ok(())
    }
}
