//! Source reader trait abstraction.
//!
//! This crate defines the `RowSource` trait the replicator reads through.
//! `mssql-source` implements it for SQL Server; the root crate's `testing`
//! module implements it in memory. The job driver receives an
//! already-connected source, so connection failures surface before any job
//! touches the destination.

mod traits;

pub use traits::{RowSource, RowStream, SourceError};
