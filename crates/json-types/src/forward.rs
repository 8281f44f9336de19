//! Forward conversion: ScalarValue → JSON value.
//!
//! Pass-through rendering keeps each value's natural JSON form. The `date`
//! and `float-or-zero` transform tags narrow that rendering for fields the
//! destination declares as timestamps or non-null numerics.

use base64::Engine;
use chrono::{SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;
use sync_core::{FieldTransform, ScalarValue};
use tracing::warn;

/// Wrapper for JSON values.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonValue(pub serde_json::Value);

impl JsonValue {
    /// Convert `value` under the given transform tag.
    pub fn with_transform(value: &ScalarValue, transform: FieldTransform) -> Self {
        match transform {
            FieldTransform::None => JsonValue::from(value),
            FieldTransform::Date => date_value(value),
            FieldTransform::FloatOrZero => float_or_zero(value),
        }
    }

    /// Get the inner JSON value.
    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

impl From<&ScalarValue> for JsonValue {
    fn from(value: &ScalarValue) -> Self {
        match value {
            ScalarValue::Null => JsonValue(serde_json::Value::Null),
            ScalarValue::Bool(b) => JsonValue(json!(*b)),
            ScalarValue::Int(i) => JsonValue(json!(*i)),
            ScalarValue::Float(f) => JsonValue(json!(*f)),

            // Decimal - store as string to preserve precision
            ScalarValue::Decimal(d) => JsonValue(json!(d.to_string())),

            ScalarValue::String(s) => JsonValue(json!(s)),
            ScalarValue::Guid(u) => JsonValue(json!(u.hyphenated().to_string())),

            // Binary types - base64 encode
            ScalarValue::Bytes(b) => {
                JsonValue(json!(base64::engine::general_purpose::STANDARD.encode(b)))
            }

            // Date/time types - ISO 8601 format
            temporal => JsonValue(json!(iso8601(temporal).unwrap_or_default())),
        }
    }
}

impl From<ScalarValue> for JsonValue {
    fn from(value: ScalarValue) -> Self {
        JsonValue::from(&value)
    }
}

/// Canonical ISO-8601 text for temporal values.
///
/// Zone-less values keep their wall-clock reading. Offset values are
/// normalized to UTC so one instant always renders the same way, whatever
/// offset the source stored it with.
fn iso8601(value: &ScalarValue) -> Option<String> {
    match value {
        ScalarValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        ScalarValue::Time(t) => Some(t.format("%H:%M:%S%.f").to_string()),
        ScalarValue::DateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        ScalarValue::DateTimeOffset(dt) => Some(
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ),
        _ => None,
    }
}

fn date_value(value: &ScalarValue) -> JsonValue {
    match iso8601(value) {
        Some(text) => JsonValue(json!(text)),
        None => {
            if !matches!(value, ScalarValue::Null | ScalarValue::String(_)) {
                warn!(
                    "Value of type {} in a date field passed through unchanged",
                    value.type_name()
                );
            }
            JsonValue::from(value)
        }
    }
}

fn float_or_zero(value: &ScalarValue) -> JsonValue {
    let float = match value {
        ScalarValue::Null => Some(0.0),
        ScalarValue::Int(i) => Some(*i as f64),
        ScalarValue::Float(f) => Some(*f),
        ScalarValue::Decimal(d) => d.to_f64(),
        ScalarValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        ScalarValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match float {
        Some(f) if f.is_finite() => JsonValue(json!(f)),
        // JSON has no NaN or infinity; serde_json would emit null.
        Some(f) => {
            warn!(
                "Non-finite {} value {f} in a float field replaced with 0",
                value.type_name()
            );
            JsonValue(json!(0.0))
        }
        None => {
            warn!(
                "Failed to convert {} value to float, passing it through unchanged",
                value.type_name()
            );
            JsonValue::from(value)
        }
    }
}
