//! Value representations for source rows and destination records.
//!
//! A [`Row`] is what the source reader produces: an ordered list of column
//! names with dynamically-typed [`ScalarValue`]s. A [`Record`] is what the
//! destination consumes: a map from destination field name to a JSON value.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single dynamically-typed value read from the source database.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// SQL NULL of any column type
    Null,

    /// bit
    Bool(bool),

    /// tinyint, smallint, int, bigint
    Int(i64),

    /// real, float, money
    Float(f64),

    /// decimal, numeric
    Decimal(Decimal),

    /// char, varchar, nchar, nvarchar, text, xml
    String(String),

    /// uniqueidentifier
    Guid(Uuid),

    /// binary, varbinary, image
    Bytes(Vec<u8>),

    /// date
    Date(NaiveDate),

    /// time
    Time(NaiveTime),

    /// datetime, smalldatetime, datetime2 (no zone information)
    DateTime(NaiveDateTime),

    /// datetimeoffset
    DateTimeOffset(DateTime<FixedOffset>),
}

impl ScalarValue {
    /// Short type name used in log and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Guid(_) => "guid",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "datetime",
            Self::DateTimeOffset(_) => "datetimeoffset",
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for ScalarValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<NaiveDateTime> for ScalarValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One row of a source result set.
///
/// Columns keep the order in which the source returned them. Lookups by
/// name are case-insensitive because SQL Server column names are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, ScalarValue)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty row with room for `capacity` columns.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Append a column.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<ScalarValue>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Builder-style [`Row::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Look up a column by name, ignoring ASCII case.
    ///
    /// Returns `None` when the row has no such column, which is different
    /// from a column that is present and NULL.
    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.columns
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Column names in source order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<N: Into<String>, V: Into<ScalarValue>> FromIterator<(N, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// A destination record: destination field name → JSON scalar.
///
/// Serializes as a plain JSON object so a page of records is a JSON array
/// the destination's bulk-insert endpoint accepts as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(serde_json::Map<String, serde_json::Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: serde_json::Value) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> serde_json::Map<String, serde_json::Value> {
        self.0
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<serde_json::Value> for Record {
    type Error = serde_json::Value;

    /// Accepts JSON objects only; anything else is handed back unchanged.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}
