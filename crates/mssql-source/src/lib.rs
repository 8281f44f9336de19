//! SQL Server source for mssql-sync.
//!
//! Provides the `RowSource` implementation the replicator reads through:
//!
//! - [`client`] - connecting with an ADO.NET connection string
//! - [`query`] - source SQL for a table job (explicit or generated)
//! - [`source`] - [`SqlServerSource`], streaming rows lazily from one query

pub mod client;
pub mod query;
pub mod source;

pub use client::{connect, SqlServerClient};
pub use query::{quote_identifier, source_query, source_sql, SourceQuery};
pub use source::SqlServerSource;
