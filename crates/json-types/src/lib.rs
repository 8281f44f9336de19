//! JSON conversions for sync-core types.
//!
//! This crate turns source [`Row`](sync_core::Row)s into destination
//! [`Record`](sync_core::Record)s.
//!
//! # Modules
//!
//! - [`forward`] - ScalarValue → JSON value conversion, per transform tag
//! - [`transform`] - Row → Record conversion driven by a job's column mapping
//!
//! # Example
//!
//! ```ignore
//! use json_types::RowTransformer;
//! use sync_core::{ColumnMapping, Row, TableJobConfig};
//!
//! let job = TableJobConfig::new("tblcity", "tblCity").column(ColumnMapping::new("CityName"));
//! let row = Row::new().with("CityName", "Karachi");
//! let record = RowTransformer::new(&job).transform(&row)?;
//! assert_eq!(record.get("cityname"), Some(&serde_json::json!("Karachi")));
//! ```

pub mod forward;
pub mod transform;

pub use forward::JsonValue;
pub use transform::{transform_rows, RowTransformer, TransformError};
