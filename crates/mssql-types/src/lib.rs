//! SQL Server type conversions for sync-core types.
//!
//! - [`reverse`] - SQL Server wire values (tiberius) → `ScalarValue` / `Row`
//!
//! There is no forward direction: the replicator never writes to SQL Server,
//! and the only bound query parameter (the watermark) is a plain
//! `NaiveDateTime` tiberius already knows how to encode.

pub mod reverse;

pub use reverse::{row_from_tiberius, scalar_from_column_data, ConversionError};
