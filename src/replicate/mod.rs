//! Table replication: one job is truncate → read → transform → write → log.
//!
//! [`TableReplicator`] sequences the steps for a single [`TableJobConfig`]
//! against injected source and sink handles. The non-fatal steps
//! (truncate, each page insert, the run-log append) report outcomes as
//! values on the [`JobReport`]; only the source read can fail the job.
//!
//! [`TableJobConfig`]: sync_core::TableJobConfig

mod driver;
mod logger;
mod truncate;
mod writer;

pub use driver::{JobError, JobReport, JobState, TableReplicator};
pub use logger::SyncLogger;
pub use truncate::{TableTruncator, TruncateOutcome};
pub use writer::{BatchWriter, PacingPolicy, PageFailure, WriteSummary};
