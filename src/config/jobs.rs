//! The jobs file: every table job plus the settings shared by a batch.
//!
//! ```yaml
//! timezone: Asia/Karachi
//! default_watermark: 1900-01-01T00:00:00
//! pacing:
//!   success_delay: 500ms
//!   failure_delay: 2s
//! audit:
//!   run_log_table: tblsynctablelogs
//!   watermark_table: tblsynclogs
//! tables:
//!   - name: tblcity
//!     source_table: tblCity
//!     columns: [CityID_PK, CityName]
//!   - name: tblsales
//!     source_table: tblSales
//!     mode: incremental
//!     watermark_column: SalesDate
//!     batch_size: 500
//!     columns:
//!       - SalesID_PK
//!       - { source: SalesDate, transform: date }
//!       - { source: NetAmount, field: net_amount, transform: float-or-zero }
//! ```

use crate::replicate::PacingPolicy;
use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use sync_core::{TableJobConfig, Watermark};

/// Names of the destination's audit objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    pub run_log_table: String,
    pub watermark_table: String,
    pub watermark_row_id: i64,
    pub truncate_function: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            run_log_table: "tblsynctablelogs".to_string(),
            watermark_table: "tblsynclogs".to_string(),
            watermark_row_id: 1,
            truncate_function: "truncate_table".to_string(),
        }
    }
}

fn default_timezone() -> Tz {
    Tz::UTC
}

fn default_watermark() -> Watermark {
    NaiveDate::from_ymd_opt(1900, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Watermark::new)
        .unwrap_or_else(|| Watermark::new(NaiveDateTime::MIN))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobsFile {
    /// Zone for run timestamps and the watermark
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Watermark used when the destination has none stored yet
    #[serde(default = "default_watermark")]
    pub default_watermark: Watermark,

    #[serde(default)]
    pub pacing: PacingPolicy,

    #[serde(default)]
    pub audit: AuditConfig,

    pub tables: Vec<TableJobConfig>,
}

impl JobsFile {
    /// Read and validate a jobs file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read jobs file: {}", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("Invalid jobs file: {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let file: JobsFile = serde_yaml::from_str(text).context("Failed to parse YAML")?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tables.is_empty() {
            anyhow::bail!("No tables configured");
        }
        TableJobConfig::validate_all(&self.tables)?;
        Ok(())
    }

    /// Jobs named in `names` in file order, or every job when `names` is empty.
    pub fn select(&self, names: &[String]) -> anyhow::Result<Vec<TableJobConfig>> {
        if names.is_empty() {
            return Ok(self.tables.clone());
        }

        for name in names {
            if !self.tables.iter().any(|t| t.name.eq_ignore_ascii_case(name)) {
                anyhow::bail!("No table job named '{name}'");
            }
        }

        Ok(self
            .tables
            .iter()
            .filter(|t| names.iter().any(|n| t.name.eq_ignore_ascii_case(n)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use sync_core::{FieldTransform, RefreshMode};

    const SAMPLE: &str = r#"
timezone: Asia/Karachi
pacing:
  success_delay: 250ms
  failure_delay: 5
audit:
  watermark_row_id: 7
tables:
  - name: tblcity
    source_table: tblCity
    columns: [CityID_PK, CityName]
  - name: tblsales
    source_table: tblSales
    mode: incremental
    watermark_column: SalesDate
    batch_size: 500
    columns:
      - SalesID_PK
      - { source: SalesDate, transform: date }
      - { source: NetAmount, field: net_amount, transform: float-or-zero }
"#;

    #[test]
    fn test_load_sample() {
        let file = JobsFile::from_yaml(SAMPLE).unwrap();

        assert_eq!(file.timezone, chrono_tz::Asia::Karachi);
        assert_eq!(file.default_watermark.to_string(), "1900-01-01T00:00:00");
        assert_eq!(file.pacing.success_delay, Duration::from_millis(250));
        assert_eq!(file.pacing.failure_delay, Duration::from_secs(5));
        assert_eq!(file.audit.watermark_row_id, 7);
        assert_eq!(file.audit.run_log_table, "tblsynctablelogs");

        let sales = &file.tables[1];
        assert_eq!(sales.mode, RefreshMode::Incremental);
        assert_eq!(sales.batch_size, 500);
        assert_eq!(sales.columns[2].field, "net_amount");
        assert_eq!(sales.columns[2].transform, FieldTransform::FloatOrZero);
        assert_eq!(file.tables[0].columns[1].field, "cityname");
    }

    #[test]
    fn test_defaults() {
        let file = JobsFile::from_yaml(
            "tables:\n  - name: tblcity\n    source_table: tblCity\n    columns: [CityID_PK]\n",
        )
        .unwrap();

        assert_eq!(file.timezone, Tz::UTC);
        assert_eq!(file.pacing, PacingPolicy::default());
        assert_eq!(file.audit, AuditConfig::default());
        assert_eq!(file.tables[0].batch_size, 1000);
    }

    #[test]
    fn test_validation_errors_are_fatal() {
        let duplicate = "tables:\n  - {name: t, source_table: T, columns: [a]}\n  - {name: T, source_table: T, columns: [a]}\n";
        let err = JobsFile::from_yaml(duplicate).unwrap_err();
        assert!(format!("{err:#}").contains("Duplicate"), "{err:#}");

        let zero_batch = "tables:\n  - {name: t, source_table: T, batch_size: 0, columns: [a]}\n";
        assert!(JobsFile::from_yaml(zero_batch).is_err());

        let unfiltered = "tables:\n  - {name: t, source_table: T, mode: incremental, columns: [a]}\n";
        assert!(JobsFile::from_yaml(unfiltered).is_err());

        assert!(JobsFile::from_yaml("tables: []\n").is_err());
        let bad_zone = "timezone: Mars/Olympus\ntables:\n  - {name: t, source_table: T, columns: [a]}\n";
        assert!(JobsFile::from_yaml(bad_zone).is_err());
    }

    #[test]
    fn test_select() {
        let file = JobsFile::from_yaml(SAMPLE).unwrap();

        assert_eq!(file.select(&[]).unwrap().len(), 2);

        let picked = file.select(&["TBLSALES".to_string()]).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "tblsales");

        assert!(file.select(&["tblmissing".to_string()]).is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let jobs = JobsFile::load(file.path()).unwrap();
        assert_eq!(jobs.tables.len(), 2);

        let missing = JobsFile::load(Path::new("/nonexistent/jobs.yaml")).unwrap_err();
        assert!(format!("{missing:#}").contains("Failed to read jobs file"));
    }
}
