//! RestSink: the `TableSink` implementation over reqwest.

use crate::config::RestSinkConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use sync_core::{Record, SyncRunRecord, Watermark};
use table_sink::{SinkError, TableSink};
use tracing::debug;

const PREFER_MINIMAL: &str = "return=minimal";
const PREFER_MERGE: &str = "resolution=merge-duplicates,return=minimal";

#[derive(Serialize)]
struct TruncateArgs<'a> {
    table_name: &'a str,
}

#[derive(Serialize)]
struct RunLogRow<'a> {
    tablename: &'a str,
    last_sync: String,
    total_records_synced: usize,
    status: &'a str,
}

#[derive(Serialize)]
struct WatermarkRow {
    id: i64,
    last_sync: String,
}

#[derive(Deserialize)]
struct WatermarkSelect {
    last_sync: Option<String>,
}

/// Destination sink speaking the PostgREST protocol.
pub struct RestSink {
    client: Client,
    config: RestSinkConfig,
}

impl RestSink {
    pub fn new(config: RestSinkConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SinkError::Unreachable(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RestSinkConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SinkError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

fn transport_error(e: reqwest::Error) -> SinkError {
    if e.is_timeout() {
        SinkError::Timeout(e.to_string())
    } else {
        SinkError::Unreachable(e.to_string())
    }
}

#[async_trait::async_trait]
impl TableSink for RestSink {
    async fn truncate_table(&self, table: &str) -> Result<(), SinkError> {
        let url = self
            .config
            .endpoint(&format!("rpc/{}", self.config.truncate_function));
        debug!("Truncating {table} via {url}");

        self.send(
            self.client
                .post(&url)
                .json(&TruncateArgs { table_name: table }),
        )
        .await?;
        Ok(())
    }

    async fn insert_records(&self, table: &str, records: &[Record]) -> Result<(), SinkError> {
        let url = self.config.endpoint(table);
        debug!("Inserting {} records into {table}", records.len());

        self.send(
            self.client
                .post(&url)
                .header("Prefer", PREFER_MINIMAL)
                .json(records),
        )
        .await?;
        Ok(())
    }

    async fn append_sync_run(&self, run: &SyncRunRecord) -> Result<(), SinkError> {
        let url = self.config.endpoint(&self.config.run_log_table);
        let row = RunLogRow {
            tablename: &run.table,
            last_sync: Watermark::new(run.run_at).to_log_string(),
            total_records_synced: run.rows_synced,
            status: run.status.as_str(),
        };

        self.send(
            self.client
                .post(&url)
                .header("Prefer", PREFER_MINIMAL)
                .json(&row),
        )
        .await?;
        Ok(())
    }

    async fn read_watermark(&self) -> Result<Option<Watermark>, SinkError> {
        let url = self.config.endpoint(&self.config.watermark_table);
        let id_filter = format!("eq.{}", self.config.watermark_row_id);

        let response = self
            .send(
                self.client
                    .get(&url)
                    .query(&[("select", "last_sync"), ("id", id_filter.as_str())]),
            )
            .await?;

        let rows: Vec<WatermarkSelect> = response
            .json()
            .await
            .map_err(|e| SinkError::InvalidResponse(format!("Watermark body: {e}")))?;

        let Some(text) = rows.into_iter().next().and_then(|row| row.last_sync) else {
            return Ok(None);
        };

        Watermark::parse_in(&text, &self.config.timezone)
            .map(Some)
            .map_err(|e| SinkError::InvalidResponse(e.to_string()))
    }

    async fn upsert_watermark(&self, watermark: &Watermark) -> Result<(), SinkError> {
        let url = self.config.endpoint(&self.config.watermark_table);
        let row = WatermarkRow {
            id: self.config.watermark_row_id,
            last_sync: watermark.to_log_string(),
        };

        self.send(
            self.client
                .post(&url)
                .query(&[("on_conflict", "id")])
                .header("Prefer", PREFER_MERGE)
                .json(&row),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = RestSinkConfig::new("https://example.supabase.co/", "key");
        assert_eq!(
            config.endpoint("tblsales"),
            "https://example.supabase.co/rest/v1/tblsales"
        );
        assert_eq!(
            config.endpoint("rpc/truncate_table"),
            "https://example.supabase.co/rest/v1/rpc/truncate_table"
        );
    }
}
