//! Core types for the mssql-sync table replicator.
//!
//! This crate provides the data model shared by every other crate in the
//! workspace:
//!
//! - [`ScalarValue`] / [`Row`] - dynamically-typed source rows
//! - [`Record`] - JSON-serializable destination records
//! - [`TableJobConfig`] - static per-table replication configuration
//! - [`SyncRunRecord`] / [`SyncStatus`] - audit log entries
//! - [`Watermark`] - the incremental sync boundary
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── mssql-types   (SQL Server wire values → Row)
//!    ├─── json-types    (Row → Record)
//!    ├─── row-source    (source reader trait)
//!    └─── table-sink    (destination trait)
//! ```

pub mod job;
pub mod run;
pub mod values;

pub use job::{
    ColumnMapping, ColumnSpec, FieldTransform, JobConfigError, MappingSpec, RefreshMode,
    TableJobConfig, DEFAULT_BATCH_SIZE, WATERMARK_PARAM,
};
pub use run::{SyncRunRecord, SyncStatus, Watermark, WatermarkParseError};
pub use values::{Record, Row, ScalarValue};
