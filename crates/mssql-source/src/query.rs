//! Source SQL for a table job.
//!
//! A job either carries an explicit query or names its source table, in
//! which case the query is generated from the column mapping:
//!
//! ```text
//! SELECT [c1], [c2] FROM [source_table] [WHERE [watermark_column] > @P1] ORDER BY [order_by]
//! ```

use sync_core::{JobConfigError, TableJobConfig, Watermark, WATERMARK_PARAM};

/// One source query, optionally parameterized by the watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    pub sql: String,
    /// Bound as `@P1` when present.
    pub watermark: Option<Watermark>,
}

/// Bracket-quote a (possibly schema-qualified) identifier.
///
/// `dbo.tblSales` becomes `[dbo].[tblSales]`; a `]` inside a name is doubled.
pub fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| {
            let part = part
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .replace(']', "]]");
            format!("[{part}]")
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// SQL text for the job, explicit or generated.
pub fn source_sql(job: &TableJobConfig) -> Result<String, JobConfigError> {
    if let Some(query) = &job.query {
        return Ok(query.clone());
    }

    let table = job
        .source_table
        .as_deref()
        .ok_or_else(|| JobConfigError::MissingSource {
            table: job.name.clone(),
        })?;

    let columns = job
        .columns
        .iter()
        .map(|c| quote_identifier(&c.source))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("SELECT {columns} FROM {}", quote_identifier(table));

    if job.is_incremental() {
        if let Some(column) = &job.watermark_column {
            sql.push_str(&format!(
                " WHERE {} > {WATERMARK_PARAM}",
                quote_identifier(column)
            ));
        }
    }

    let order_by: Vec<String> = if job.order_by.is_empty() {
        job.columns
            .first()
            .map(|c| quote_identifier(&c.source))
            .into_iter()
            .collect()
    } else {
        job.order_by.iter().map(|c| quote_identifier(c)).collect()
    };
    if !order_by.is_empty() {
        sql.push_str(&format!(" ORDER BY {}", order_by.join(", ")));
    }

    Ok(sql)
}

/// The query to execute for `job`.
///
/// Incremental jobs bind `watermark`; full-refresh jobs never do.
pub fn source_query(
    job: &TableJobConfig,
    watermark: Option<Watermark>,
) -> Result<SourceQuery, JobConfigError> {
    Ok(SourceQuery {
        sql: source_sql(job)?,
        watermark: if job.is_incremental() {
            watermark
        } else {
            None
        },
    })
}
