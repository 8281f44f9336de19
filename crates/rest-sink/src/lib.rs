//! HTTP implementation of [`table_sink::TableSink`].
//!
//! Targets a PostgREST-style REST surface (as exposed by Supabase):
//!
//! - `POST /rest/v1/rpc/{truncate_function}` with `{"table_name": ...}`
//! - `POST /rest/v1/{table}` with a JSON array of records
//! - `POST /rest/v1/{run_log_table}` with one run entry
//! - `POST /rest/v1/{watermark_table}?on_conflict=id` to upsert the watermark
//! - `GET /rest/v1/{watermark_table}?select=last_sync&id=eq.{row_id}`
//!
//! Every request carries the API key both as `apikey` and as a bearer token,
//! and is bounded by the configured timeout. Inserts are plain inserts: the
//! destination tables are expected to enforce primary-key uniqueness so a
//! duplicate shows up as a rejected page.

mod config;
mod sink;

pub use config::RestSinkConfig;
pub use sink::RestSink;
