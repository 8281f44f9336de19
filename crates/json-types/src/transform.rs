//! Row → Record conversion.
//!
//! The transformer is a pure function of the job's column mapping and the
//! input row. Source columns that are not mapped are dropped. A mapped
//! column missing from the row means the source schema and the job
//! configuration have drifted apart, which is reported as a fatal
//! [`TransformError::ConfigMismatch`].

use crate::forward::JsonValue;
use sync_core::{ColumnMapping, Record, Row, ScalarValue, TableJobConfig};
use thiserror::Error;

/// Error during row transformation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error(
        "Column '{column}' mapped for table '{table}' is missing from the source row (columns: {available})"
    )]
    ConfigMismatch {
        table: String,
        column: String,
        available: String,
    },
}

/// Maps source rows onto destination records for one table job.
#[derive(Debug, Clone, Copy)]
pub struct RowTransformer<'a> {
    table: &'a str,
    columns: &'a [ColumnMapping],
}

impl<'a> RowTransformer<'a> {
    pub fn new(job: &'a TableJobConfig) -> Self {
        Self {
            table: &job.name,
            columns: &job.columns,
        }
    }

    /// Check that every mapped column is present in the row shape.
    pub fn check_shape(&self, row: &Row) -> Result<(), TransformError> {
        for mapping in self.columns {
            self.lookup(row, mapping)?;
        }
        Ok(())
    }

    /// Transform a single row.
    pub fn transform(&self, row: &Row) -> Result<Record, TransformError> {
        let mut record = Record::new();

        for mapping in self.columns {
            let value = self.lookup(row, mapping)?;
            record.insert(
                mapping.field.clone(),
                JsonValue::with_transform(value, mapping.transform).into_inner(),
            );
        }

        Ok(record)
    }

    fn lookup<'r>(
        &self,
        row: &'r Row,
        mapping: &ColumnMapping,
    ) -> Result<&'r ScalarValue, TransformError> {
        row.get(&mapping.source)
            .ok_or_else(|| TransformError::ConfigMismatch {
                table: self.table.to_string(),
                column: mapping.source.clone(),
                available: row.column_names().collect::<Vec<_>>().join(", "),
            })
    }
}

/// Transform every row, stopping at the first configuration mismatch.
pub fn transform_rows<'r>(
    job: &TableJobConfig,
    rows: impl IntoIterator<Item = &'r Row>,
) -> Result<Vec<Record>, TransformError> {
    let transformer = RowTransformer::new(job);
    rows.into_iter().map(|row| transformer.transform(row)).collect()
}
