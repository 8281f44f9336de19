//! Per-table replication configuration.
//!
//! One [`TableJobConfig`] describes everything needed to replicate a single
//! table: where the rows come from, how columns map onto destination fields,
//! how large each insert page is, and whether the run is a full refresh or an
//! incremental load filtered by the watermark.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Default number of records per insert page.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Placeholder the source query uses for the watermark parameter.
pub const WATERMARK_PARAM: &str = "@P1";

/// Errors in a job definition. All of them are fatal at load time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobConfigError {
    #[error("Job name must not be empty")]
    EmptyName,

    #[error("Duplicate job for destination table '{0}'")]
    DuplicateJob(String),

    #[error("Job '{table}' has no column mappings")]
    NoColumns { table: String },

    #[error("Job '{table}' has batch_size 0")]
    ZeroBatchSize { table: String },

    #[error("Job '{table}' maps more than one column onto field '{field}'")]
    DuplicateField { table: String, field: String },

    #[error("Job '{table}' needs either 'query' or 'source_table'")]
    MissingSource { table: String },

    #[error("Incremental job '{table}' must reference @P1 in its query or name a watermark_column")]
    MissingWatermarkFilter { table: String },

    #[error("Full-refresh job '{table}' must not filter by the watermark")]
    UnexpectedWatermark { table: String },
}

/// Refresh strategy for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Truncate the destination, then copy the whole source table.
    #[default]
    Full,
    /// Copy only rows newer than the watermark; never truncate.
    Incremental,
}

impl RefreshMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshMode::Full => "full",
            RefreshMode::Incremental => "incremental",
        }
    }
}

impl std::fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field conversion applied by the row transformer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldTransform {
    /// Pass the value through unchanged.
    #[default]
    None,
    /// Render temporal values as ISO-8601 strings; null stays null.
    Date,
    /// Coerce to a float; null becomes 0.0.
    FloatOrZero,
}

/// How a column is written in the jobs file.
///
/// Either a bare source column name, whose destination field is the
/// lower-cased column name, or an explicit mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    Name(String),
    Mapping(MappingSpec),
}

/// The `{source, field?, transform?}` form of a column entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingSpec {
    pub source: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub transform: FieldTransform,
}

/// One source column → destination field mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ColumnSpec")]
pub struct ColumnMapping {
    pub source: String,
    pub field: String,
    pub transform: FieldTransform,
}

impl ColumnMapping {
    /// Map `source` onto its lower-cased name with no transform.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            field: source.to_lowercase(),
            source,
            transform: FieldTransform::None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_transform(mut self, transform: FieldTransform) -> Self {
        self.transform = transform;
        self
    }
}

impl From<ColumnSpec> for ColumnMapping {
    fn from(spec: ColumnSpec) -> Self {
        match spec {
            ColumnSpec::Name(source) => ColumnMapping::new(source),
            ColumnSpec::Mapping(MappingSpec {
                source,
                field,
                transform,
            }) => {
                let mapping = ColumnMapping::new(source).with_transform(transform);
                match field {
                    Some(field) => mapping.with_field(field),
                    None => mapping,
                }
            }
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Static configuration for replicating one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableJobConfig {
    /// Destination table name
    pub name: String,

    /// Source table, used to generate the query when `query` is absent
    #[serde(default)]
    pub source_table: Option<String>,

    /// Explicit source query; incremental queries bind the watermark as `@P1`
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub mode: RefreshMode,

    /// Column compared against the watermark when the query is generated
    #[serde(default)]
    pub watermark_column: Option<String>,

    /// Ordering columns for generated queries (defaults to the first mapped column)
    #[serde(default)]
    pub order_by: Vec<String>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    pub columns: Vec<ColumnMapping>,
}

impl TableJobConfig {
    /// Start a full-refresh job copying `source_table` into `name`.
    pub fn new(name: impl Into<String>, source_table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_table: Some(source_table.into()),
            query: None,
            mode: RefreshMode::Full,
            watermark_column: None,
            order_by: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, mapping: ColumnMapping) -> Self {
        self.columns.push(mapping);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Switch to incremental mode filtered on `watermark_column`.
    pub fn incremental(mut self, watermark_column: impl Into<String>) -> Self {
        self.mode = RefreshMode::Incremental;
        self.watermark_column = Some(watermark_column.into());
        self
    }

    pub fn is_incremental(&self) -> bool {
        self.mode == RefreshMode::Incremental
    }

    /// Check the job definition for configuration errors.
    pub fn validate(&self) -> Result<(), JobConfigError> {
        let table = || self.name.clone();

        if self.name.trim().is_empty() {
            return Err(JobConfigError::EmptyName);
        }
        if self.columns.is_empty() {
            return Err(JobConfigError::NoColumns { table: table() });
        }
        if self.batch_size == 0 {
            return Err(JobConfigError::ZeroBatchSize { table: table() });
        }

        let mut fields = HashSet::new();
        for mapping in &self.columns {
            if !fields.insert(mapping.field.as_str()) {
                return Err(JobConfigError::DuplicateField {
                    table: table(),
                    field: mapping.field.clone(),
                });
            }
        }

        if self.query.is_none() && self.source_table.is_none() {
            return Err(JobConfigError::MissingSource { table: table() });
        }

        let query_binds_watermark = self
            .query
            .as_deref()
            .is_some_and(|q| q.contains(WATERMARK_PARAM));

        match self.mode {
            RefreshMode::Incremental => {
                let filtered = match &self.query {
                    Some(_) => query_binds_watermark,
                    None => self.watermark_column.is_some(),
                };
                if !filtered {
                    return Err(JobConfigError::MissingWatermarkFilter { table: table() });
                }
            }
            RefreshMode::Full => {
                if query_binds_watermark || self.watermark_column.is_some() {
                    return Err(JobConfigError::UnexpectedWatermark { table: table() });
                }
            }
        }

        Ok(())
    }

    /// Validate a set of jobs, including uniqueness of destination tables.
    pub fn validate_all(jobs: &[TableJobConfig]) -> Result<(), JobConfigError> {
        let mut names = HashSet::new();
        for job in jobs {
            job.validate()?;
            if !names.insert(job.name.to_lowercase()) {
                return Err(JobConfigError::DuplicateJob(job.name.clone()));
            }
        }
        Ok(())
    }
}
