//! SqlServerSource: the `RowSource` implementation for SQL Server.

use crate::client::{connect, query_error, SqlServerClient};
use crate::query::source_query;
use futures::StreamExt;
use mssql_types::row_from_tiberius;
use row_source::{RowSource, RowStream, SourceError};
use sync_core::{TableJobConfig, Watermark};
use tracing::debug;

/// Reads table jobs from one SQL Server connection.
///
/// The connection is used by one job at a time; the driver never runs two
/// queries on it concurrently.
pub struct SqlServerSource {
    client: SqlServerClient,
}

impl SqlServerSource {
    pub fn new(client: SqlServerClient) -> Self {
        Self { client }
    }

    /// Connect with an ADO.NET connection string.
    pub async fn connect(connection_string: &str) -> Result<Self, SourceError> {
        Ok(Self::new(connect(connection_string).await?))
    }
}

#[async_trait::async_trait]
impl RowSource for SqlServerSource {
    async fn read<'a>(
        &'a mut self,
        job: &'a TableJobConfig,
        watermark: Option<Watermark>,
    ) -> Result<RowStream<'a>, SourceError> {
        let query = source_query(job, watermark).map_err(|e| SourceError::Query(e.to_string()))?;

        if job.is_incremental() && query.watermark.is_none() {
            return Err(SourceError::Query(format!(
                "Incremental job '{}' has no watermark to bind",
                job.name
            )));
        }

        debug!("Executing source query for {}: {}", job.name, query.sql);

        let mut q = tiberius::Query::new(query.sql);
        if let Some(watermark) = query.watermark {
            debug!("Binding watermark {watermark} as @P1");
            q.bind(watermark.as_naive());
        }

        let stream = q.query(&mut self.client).await.map_err(query_error)?;

        let rows = stream.into_row_stream().map(|result| {
            result.map_err(query_error).and_then(|row| {
                row_from_tiberius(row).map_err(|e| SourceError::Query(e.to_string()))
            })
        });

        Ok(rows.boxed())
    }
}
