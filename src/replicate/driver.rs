//! Job driver for a single table.

use super::logger::SyncLogger;
use super::truncate::{TableTruncator, TruncateOutcome};
use super::writer::{BatchWriter, PacingPolicy, PageFailure};
use chrono::NaiveDateTime;
use futures::StreamExt;
use json_types::{transform_rows, RowTransformer, TransformError};
use row_source::{RowSource, SourceError};
use sync_core::{RefreshMode, Row, SyncRunRecord, SyncStatus, TableJobConfig, Watermark};
use table_sink::{SinkError, TableSink};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Job lifecycle.
///
/// `Errored` is absorbing and only entered from `Reading`. Source failures
/// and rows missing a mapped column are both detected while reading; every
/// later failure is recorded on the report and the job still reaches `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Idle,
    Truncating,
    Reading,
    Transforming,
    Writing,
    Logging,
    Done,
    Errored,
}

/// Fatal job errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Source connection failed for {table}: {message}")]
    Connection { table: String, message: String },

    #[error("Source query failed for {table}: {message}")]
    Query { table: String, message: String },

    #[error(transparent)]
    ConfigMismatch(#[from] TransformError),
}

impl JobError {
    fn from_source(table: &str, e: SourceError) -> Self {
        let table = table.to_string();
        match e {
            SourceError::Connection(message) => JobError::Connection { table, message },
            SourceError::Query(message) => JobError::Query { table, message },
        }
    }

    /// Destination table of the failed job.
    pub fn table(&self) -> &str {
        match self {
            JobError::Connection { table, .. } | JobError::Query { table, .. } => table,
            JobError::ConfigMismatch(TransformError::ConfigMismatch { table, .. }) => table,
        }
    }
}

/// Summary of one completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub table: String,
    pub mode: RefreshMode,
    /// `None` for incremental jobs, which never truncate.
    pub truncate: Option<TruncateOutcome>,
    pub rows_attempted: usize,
    pub pages: usize,
    pub failed_pages: Vec<PageFailure>,
    pub status: SyncStatus,
    /// Set when the run-log entry could not be written.
    pub log_error: Option<SinkError>,
}

impl JobReport {
    pub fn rows_failed(&self) -> usize {
        self.failed_pages.iter().map(|p| p.rows).sum()
    }

    pub fn rows_inserted(&self) -> usize {
        self.rows_attempted - self.rows_failed()
    }
}

impl std::fmt::Display for JobReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} of {} records inserted",
            self.table,
            self.rows_inserted(),
            self.rows_attempted
        )?;

        match self.failed_pages.len() {
            0 => {}
            1 => write!(f, " across 1 failed page")?,
            n => write!(f, " across {n} failed pages")?,
        }
        write!(f, " ({})", self.status)?;

        if let Some(TruncateOutcome::Failed(reason)) = &self.truncate {
            write!(f, "; truncate failed: {reason}")?;
        }
        if let Some(e) = &self.log_error {
            write!(f, "; run log not written: {e}")?;
        }
        Ok(())
    }
}

/// Runs table jobs against one source and one sink.
///
/// The replicator holds no per-table state between runs apart from the
/// state trace of the last run.
pub struct TableReplicator<'a, S: RowSource + ?Sized, K: TableSink + ?Sized> {
    source: &'a mut S,
    sink: &'a K,
    pacing: PacingPolicy,
    run_at: NaiveDateTime,
    states: Vec<JobState>,
}

impl<'a, S: RowSource + ?Sized, K: TableSink + ?Sized> TableReplicator<'a, S, K> {
    pub fn new(source: &'a mut S, sink: &'a K, run_at: NaiveDateTime) -> Self {
        Self {
            source,
            sink,
            pacing: PacingPolicy::default(),
            run_at,
            states: vec![JobState::Idle],
        }
    }

    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.states.last().copied().unwrap_or(JobState::Idle)
    }

    /// Every state the last run passed through, starting with `Idle`.
    pub fn states(&self) -> &[JobState] {
        &self.states
    }

    fn enter(&mut self, state: JobState) {
        debug!("{:?} -> {:?}", self.state(), state);
        self.states.push(state);
    }

    /// Run one job.
    ///
    /// `watermark` is bound into the source query of incremental jobs and
    /// ignored for full-refresh jobs.
    pub async fn run(
        &mut self,
        job: &TableJobConfig,
        watermark: Option<Watermark>,
    ) -> Result<JobReport, JobError> {
        self.states = vec![JobState::Idle];
        info!("Starting {} sync of {}", job.mode, job.name);

        let truncate = match job.mode {
            RefreshMode::Full => {
                self.enter(JobState::Truncating);
                Some(TableTruncator::new(self.sink).truncate(&job.name).await)
            }
            RefreshMode::Incremental => None,
        };

        self.enter(JobState::Reading);
        let rows = match self.read_rows(job, watermark).await {
            Ok(rows) => rows,
            Err(e) => {
                self.enter(JobState::Errored);
                error!("Job {} failed while reading: {e}", job.name);
                return Err(e);
            }
        };
        info!("Read {} rows for {}", rows.len(), job.name);

        self.enter(JobState::Transforming);
        // Every row passed check_shape while reading.
        let records = transform_rows(job, &rows)?;
        drop(rows);

        self.enter(JobState::Writing);
        let summary = BatchWriter::new(self.sink, self.pacing)
            .write(&job.name, &records, job.batch_size)
            .await;

        self.enter(JobState::Logging);
        let status = SyncStatus::from_counts(summary.rows_attempted, summary.rows_failed());
        let run = SyncRunRecord {
            table: job.name.clone(),
            run_at: self.run_at,
            rows_synced: summary.rows_attempted,
            status,
        };
        let log_error = SyncLogger::new(self.sink).append(&run).await.err();

        self.enter(JobState::Done);

        let report = JobReport {
            table: job.name.clone(),
            mode: job.mode,
            truncate,
            rows_attempted: summary.rows_attempted,
            pages: summary.pages,
            failed_pages: summary.failures,
            status,
            log_error,
        };

        if report.status == SyncStatus::Success {
            info!("{report}");
        } else {
            warn!("{report}");
        }
        Ok(report)
    }

    /// Drain the source for `job`, rejecting rows that lack a mapped column.
    async fn read_rows(
        &mut self,
        job: &TableJobConfig,
        watermark: Option<Watermark>,
    ) -> Result<Vec<Row>, JobError> {
        let watermark = if job.is_incremental() { watermark } else { None };
        let transformer = RowTransformer::new(job);

        let mut stream = self
            .source
            .read(job, watermark)
            .await
            .map_err(|e| JobError::from_source(&job.name, e))?;

        let mut rows = Vec::new();
        while let Some(row) = stream.next().await {
            let row = row.map_err(|e| JobError::from_source(&job.name, e))?;
            transformer.check_shape(&row)?;
            rows.push(row);
        }
        Ok(rows)
    }
}
