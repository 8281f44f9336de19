//! Reverse conversion: SQL Server values → ScalarValue
//!
//! This module implements conversion from tiberius' `ColumnData` to
//! sync-core's `ScalarValue` for reading rows from SQL Server.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sync_core::{Row, ScalarValue};
use thiserror::Error;
use tiberius::{ColumnData, FromSql};

/// Error during SQL Server value conversion.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Decimal value {value} with scale {scale} is out of range")]
    DecimalOutOfRange { value: i128, scale: u8 },
    #[error("Invalid date/time value in column '{column}': {message}")]
    InvalidDateTime { column: String, message: String },
}

/// Convert one column value.
///
/// `column` is only used for error messages.
pub fn scalar_from_column_data(
    column: &str,
    data: ColumnData<'static>,
) -> Result<ScalarValue, ConversionError> {
    let value = match data {
        ColumnData::Bit(v) => v.map(ScalarValue::Bool),

        // Integer types
        ColumnData::U8(v) => v.map(|i| ScalarValue::Int(i as i64)),
        ColumnData::I16(v) => v.map(|i| ScalarValue::Int(i as i64)),
        ColumnData::I32(v) => v.map(|i| ScalarValue::Int(i as i64)),
        ColumnData::I64(v) => v.map(ScalarValue::Int),

        // Floating point (money and smallmoney arrive as F64)
        ColumnData::F32(v) => v.map(|f| ScalarValue::Float(f as f64)),
        ColumnData::F64(v) => v.map(ScalarValue::Float),

        ColumnData::Numeric(v) => match v {
            Some(n) => Some(ScalarValue::Decimal(
                Decimal::try_from_i128_with_scale(n.value(), n.scale() as u32).map_err(
                    |_| ConversionError::DecimalOutOfRange {
                        value: n.value(),
                        scale: n.scale(),
                    },
                )?,
            )),
            None => None,
        },

        // String types
        ColumnData::String(v) => v.map(|s| ScalarValue::String(s.into_owned())),
        ColumnData::Xml(v) => v.map(|x| ScalarValue::String(x.into_owned().into_string())),

        ColumnData::Guid(v) => v.map(ScalarValue::Guid),
        ColumnData::Binary(v) => v.map(|b| ScalarValue::Bytes(b.into_owned())),

        // Date/time types
        ref temporal @ (ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::DateTime2(_)) => {
            temporal_value(column, NaiveDateTime::from_sql(temporal))?.map(ScalarValue::DateTime)
        }
        ref temporal @ ColumnData::Date(_) => {
            temporal_value(column, NaiveDate::from_sql(temporal))?.map(ScalarValue::Date)
        }
        ref temporal @ ColumnData::Time(_) => {
            temporal_value(column, NaiveTime::from_sql(temporal))?.map(ScalarValue::Time)
        }
        ref temporal @ ColumnData::DateTimeOffset(_) => {
            temporal_value(column, DateTime::<FixedOffset>::from_sql(temporal))?
                .map(ScalarValue::DateTimeOffset)
        }
    };

    Ok(value.unwrap_or(ScalarValue::Null))
}

fn temporal_value<T>(
    column: &str,
    result: tiberius::Result<Option<T>>,
) -> Result<Option<T>, ConversionError> {
    result.map_err(|e| ConversionError::InvalidDateTime {
        column: column.to_string(),
        message: e.to_string(),
    })
}

/// Convert a tiberius row into a sync-core row, keeping column order.
pub fn row_from_tiberius(row: tiberius::Row) -> Result<Row, ConversionError> {
    let names: Vec<String> = row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut out = Row::with_capacity(names.len());
    for (name, data) in names.into_iter().zip(row) {
        let value = scalar_from_column_data(&name, data)?;
        out.push(name, value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use tiberius::numeric::Numeric;
    use tiberius::xml::XmlData;
    use tiberius::{IntoSql, Uuid};

    fn convert(data: ColumnData<'static>) -> ScalarValue {
        scalar_from_column_data("col", data).unwrap()
    }

    #[test]
    fn test_integers_widen_to_i64() {
        assert_eq!(convert(ColumnData::U8(Some(7))), ScalarValue::Int(7));
        assert_eq!(convert(ColumnData::I16(Some(-3))), ScalarValue::Int(-3));
        assert_eq!(convert(ColumnData::I32(Some(42))), ScalarValue::Int(42));
        assert_eq!(
            convert(ColumnData::I64(Some(i64::MAX))),
            ScalarValue::Int(i64::MAX)
        );
    }

    #[test]
    fn test_typed_nulls_become_null() {
        assert_eq!(convert(ColumnData::I32(None)), ScalarValue::Null);
        assert_eq!(convert(ColumnData::String(None)), ScalarValue::Null);
        assert_eq!(convert(ColumnData::Numeric(None)), ScalarValue::Null);
        assert_eq!(convert(ColumnData::DateTime2(None)), ScalarValue::Null);
    }

    #[test]
    fn test_bit_and_strings() {
        assert_eq!(convert(ColumnData::Bit(Some(true))), ScalarValue::Bool(true));
        assert_eq!(
            convert(ColumnData::String(Some(Cow::Borrowed("Karachi")))),
            ScalarValue::from("Karachi")
        );
    }

    #[test]
    fn test_numeric_becomes_decimal() {
        let value = convert(ColumnData::Numeric(Some(Numeric::new_with_scale(123456, 2))));
        assert_eq!(value, ScalarValue::Decimal(Decimal::new(123456, 2)));
    }

    #[test]
    fn test_datetime_roundtrips_through_wire_type() {
        let naive = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 30, 15)
            .unwrap();
        let data: ColumnData<'static> = naive.into_sql();

        assert_eq!(convert(data), ScalarValue::DateTime(naive));
    }

    #[test]
    fn test_date_column() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();
        let data: ColumnData<'static> = date.into_sql();

        assert_eq!(convert(data), ScalarValue::Date(date));
    }

    #[test]
    fn test_numeric_beyond_decimal_range_is_rejected() {
        let huge = Numeric::new_with_scale(i128::MAX, 0);
        let result = scalar_from_column_data("Amount", ColumnData::Numeric(Some(huge)));
        assert!(matches!(
            result,
            Err(ConversionError::DecimalOutOfRange { value, scale: 0 }) if value == i128::MAX
        ));
    }

    #[test]
    fn test_datetimeoffset_keeps_instant() {
        let karachi = FixedOffset::east_opt(5 * 3600).unwrap();
        let at = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
            .and_local_timezone(karachi)
            .unwrap();
        let data: ColumnData<'static> = at.into_sql();

        match convert(data) {
            ScalarValue::DateTimeOffset(dt) => {
                assert_eq!(dt, at);
                assert_eq!(dt.offset(), &karachi);
            }
            other => panic!("expected DateTimeOffset, got {other:?}"),
        }
    }

    #[test]
    fn test_time_column() {
        let time = NaiveTime::from_hms_opt(23, 59, 1).unwrap();
        let data: ColumnData<'static> = time.into_sql();

        assert_eq!(convert(data), ScalarValue::Time(time));
    }

    #[test]
    fn test_xml_becomes_string() {
        let data: ColumnData<'static> = XmlData::new("<city>Lahore</city>").into_sql();

        assert_eq!(convert(data), ScalarValue::from("<city>Lahore</city>"));
    }

    #[test]
    fn test_guid_column() {
        let id = Uuid::from_u128(0x6f9619ff_8b86_d011_b42d_00c04fc964ff);
        let data: ColumnData<'static> = id.into_sql();

        assert_eq!(convert(data), ScalarValue::Guid(id));
    }
}
