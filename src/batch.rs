//! Job batches: every selected table job of one invocation, run in order.
//!
//! The batch captures its start time once, reads the watermark once (only
//! when an incremental job is present), runs each job independently, and
//! advances the watermark to the start time only when every incremental
//! job finished with status `success`.

use crate::replicate::{JobError, JobReport, PacingPolicy, SyncLogger, TableReplicator};
use anyhow::Context;
use chrono_tz::Tz;
use row_source::RowSource;
use sync_core::{SyncStatus, TableJobConfig, Watermark};
use table_sink::{SinkError, TableSink};
use tracing::{error, info, warn};

/// Settings shared by every job in a batch.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub timezone: Tz,
    pub default_watermark: Watermark,
    pub pacing: PacingPolicy,
}

/// What happened to the watermark at the end of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkUpdate {
    /// No incremental jobs ran.
    NotApplicable,
    Advanced(Watermark),
    /// At least one incremental job did not finish with `success`.
    Held,
    Failed(SinkError),
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub started_at: Watermark,
    /// Watermark bound into incremental queries.
    pub watermark: Option<Watermark>,
    pub jobs: Vec<JobReport>,
    pub fatal: Vec<JobError>,
    /// `failed` run entries for fatal jobs that could not be appended.
    pub log_failures: Vec<(String, SinkError)>,
    pub watermark_update: WatermarkUpdate,
}

impl BatchReport {
    pub fn has_fatal(&self) -> bool {
        !self.fatal.is_empty()
    }

    pub fn job(&self, table: &str) -> Option<&JobReport> {
        self.jobs.iter().find(|j| j.table == table)
    }
}

/// Run `jobs` sequentially against one source and one sink.
///
/// Only a failure to read the watermark aborts the batch, and it does so
/// before any destination mutation. A fatal job error is recorded, a
/// `failed` run entry is appended best-effort, and the next job starts.
pub async fn run_batch<S, K>(
    source: &mut S,
    sink: &K,
    jobs: &[TableJobConfig],
    settings: &BatchSettings,
) -> anyhow::Result<BatchReport>
where
    S: RowSource + ?Sized,
    K: TableSink + ?Sized,
{
    let started_at = Watermark::now_in(&settings.timezone);
    let logger = SyncLogger::new(sink);
    let has_incremental = jobs.iter().any(|j| j.is_incremental());

    info!(
        "Starting batch of {} jobs at {started_at} ({})",
        jobs.len(),
        settings.timezone
    );

    let watermark = if has_incremental {
        let stored = logger
            .current_watermark()
            .await
            .context("Failed to read the sync watermark")?;
        let watermark = stored.unwrap_or_else(|| {
            info!(
                "No stored watermark, using {}",
                settings.default_watermark
            );
            settings.default_watermark
        });
        info!("Incremental jobs read rows after {watermark}");
        Some(watermark)
    } else {
        None
    };

    let mut reports = Vec::with_capacity(jobs.len());
    let mut fatal = Vec::new();
    let mut log_failures = Vec::new();

    for job in jobs {
        let result = TableReplicator::new(&mut *source, sink, started_at.as_naive())
            .with_pacing(settings.pacing)
            .run(job, watermark)
            .await;

        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("Job {} failed: {e}", job.name);
                if let Err(log_error) = logger
                    .append_failure(&job.name, started_at.as_naive())
                    .await
                {
                    log_failures.push((job.name.clone(), log_error));
                }
                fatal.push(e);
            }
        }
    }

    let watermark_update = if !has_incremental {
        WatermarkUpdate::NotApplicable
    } else {
        let all_succeeded = jobs.iter().filter(|j| j.is_incremental()).all(|job| {
            reports
                .iter()
                .any(|r| r.table == job.name && r.status == SyncStatus::Success)
        });

        if !all_succeeded {
            warn!("Not every incremental job succeeded, watermark left unchanged");
            WatermarkUpdate::Held
        } else {
            match logger.advance_watermark(&started_at).await {
                Ok(()) => WatermarkUpdate::Advanced(started_at),
                Err(e) => {
                    warn!("Failed to advance watermark: {e}");
                    WatermarkUpdate::Failed(e)
                }
            }
        }
    };

    info!(
        "Batch finished: {} jobs completed, {} failed",
        reports.len(),
        fatal.len()
    );

    Ok(BatchReport {
        started_at,
        watermark,
        jobs: reports,
        fatal,
        log_failures,
        watermark_update,
    })
}
