//! Destination sink trait abstraction.
//!
//! This crate defines the `TableSink` trait covering the destination
//! affordances the replicator needs: a truncate procedure, a bulk-insert
//! endpoint per table, an append-only run log, and the single-row watermark.
//! `rest-sink` implements it over HTTP; [`NullSink`] discards everything for
//! dry runs.

mod null;
mod traits;

pub use null::{NoReads, NullSink};
pub use traits::{SinkError, TableSink};
