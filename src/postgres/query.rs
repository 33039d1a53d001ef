use std::error::Error;
use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::{Row, Statement};
use uuid::Uuid;

use crate::error::StoreMiddlewareError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Build a result set using statement metadata for column names.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set(stmt: &Statement, rows: &[Row]) -> Result<ResultSet, StoreMiddlewareError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_columns(column_names, rows.len());
    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `StoreMiddlewareError::ExecutionError` if the column cannot be decoded.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, StoreMiddlewareError> {
    let type_info = row.columns()[idx].type_();

    let value = match type_info.name() {
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .map(|v| v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .map(|v| v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))),
        "int8" => row
            .try_get::<_, Option<i64>>(idx)
            .map(|v| v.map_or(RowValues::Null, RowValues::Int)),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .map(|v| v.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v)))),
        "float8" => row
            .try_get::<_, Option<f64>>(idx)
            .map(|v| v.map_or(RowValues::Null, RowValues::Float)),
        "bool" => row
            .try_get::<_, Option<bool>>(idx)
            .map(|v| v.map_or(RowValues::Null, RowValues::Bool)),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map(|v| v.map_or(RowValues::Null, RowValues::Timestamp)),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map(|v| v.map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc()))),
        "date" => row.try_get::<_, Option<NaiveDate>>(idx).map(|v| {
            v.and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(RowValues::Null, RowValues::Timestamp)
        }),
        "json" | "jsonb" => row
            .try_get::<_, Option<Value>>(idx)
            .map(|v| v.map_or(RowValues::Null, RowValues::JSON)),
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .map(|v| v.map_or(RowValues::Null, RowValues::Blob)),
        "time" => row
            .try_get::<_, Option<NaiveTime>>(idx)
            .map(|v| v.map_or(RowValues::Null, |t| RowValues::Text(t.to_string()))),
        "numeric" => row
            .try_get::<_, Option<NumericText>>(idx)
            .map(|v| v.map_or(RowValues::Null, |n| RowValues::Text(n.0))),
        "uuid" => row
            .try_get::<_, Option<Uuid>>(idx)
            .map(|v| v.map_or(RowValues::Null, |u| RowValues::Text(u.to_string()))),
        // text, varchar, bpchar, name, citext, ...
        _ if <String as FromSql>::accepts(type_info) => row
            .try_get::<_, Option<String>>(idx)
            .map(|v| v.map_or(RowValues::Null, RowValues::Text)),
        _ => row
            .try_get::<_, Option<RawColumn>>(idx)
            .map(|v| v.map_or(RowValues::Null, |raw| raw.0)),
    };

    value.map_err(StoreMiddlewareError::postgres)
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// `numeric` decoded to its exact decimal text.
///
/// Binary layout: digit count, weight, sign and display scale (all 16-bit), then base-10000
/// digits, most significant first. `weight` is the power of 10000 of the first digit.
#[derive(Debug, PartialEq)]
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let word = |i: usize| {
            raw.get(2 * i..2 * i + 2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .ok_or("numeric value is truncated")
        };
        let ndigits = usize::from(word(0)?);
        let weight = i32::from(i16::from_be_bytes(word(1)?.to_be_bytes()));
        let sign = word(2)?;
        let dscale = usize::from(word(3)?);
        let digits = (0..ndigits)
            .map(|i| word(4 + i))
            .collect::<Result<Vec<u16>, _>>()?;

        match sign {
            NUMERIC_NAN => return Ok(NumericText("NaN".to_string())),
            NUMERIC_PINF => return Ok(NumericText("Infinity".to_string())),
            NUMERIC_NINF => return Ok(NumericText("-Infinity".to_string())),
            _ => {}
        }

        let digit = |group: i32| {
            usize::try_from(group)
                .ok()
                .and_then(|g| digits.get(g))
                .copied()
                .unwrap_or(0)
        };
        let mut out = String::new();
        if sign == NUMERIC_NEG {
            out.push('-');
        }
        if weight < 0 {
            out.push('0');
        } else {
            for group in 0..=weight {
                if group == 0 {
                    write!(out, "{}", digit(group))?;
                } else {
                    write!(out, "{:04}", digit(group))?;
                }
            }
        }
        if dscale > 0 {
            let mut fraction = String::with_capacity(dscale + 4);
            let mut group = weight + 1;
            while fraction.len() < dscale {
                write!(fraction, "{:04}", digit(group))?;
                group += 1;
            }
            fraction.truncate(dscale);
            out.push('.');
            out.push_str(&fraction);
        }
        Ok(NumericText(out))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Last resort for types without a dedicated arm: enum labels arrive as text, everything else
/// is handed back as the raw binary value.
struct RawColumn(RowValues);

impl<'a> FromSql<'a> for RawColumn {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if matches!(ty.kind(), Kind::Enum(_)) {
            Ok(RawColumn(RowValues::Text(std::str::from_utf8(raw)?.to_string())))
        } else {
            Ok(RawColumn(RowValues::Blob(raw.to_vec())))
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(ndigits: u16, weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        for word in [ndigits, u16::from_be_bytes(weight.to_be_bytes()), sign, dscale]
            .into_iter()
            .chain(digits.iter().copied())
        {
            raw.extend_from_slice(&word.to_be_bytes());
        }
        raw
    }

    fn decode(raw: &[u8]) -> String {
        NumericText::from_sql(&Type::NUMERIC, raw).unwrap().0
    }

    #[test]
    fn numeric_decodes_exactly() {
        assert_eq!(decode(&numeric(2, 0, 0, 1, &[1, 5000])), "1.5");
        assert_eq!(decode(&numeric(2, 1, 0, 0, &[1234, 5678])), "12345678");
        assert_eq!(decode(&numeric(2, -1, NUMERIC_NEG, 6, &[12, 3400])), "-0.001234");
        assert_eq!(decode(&numeric(1, -2, 0, 5, &[1000])), "0.00001");
        assert_eq!(decode(&numeric(1, 1, 0, 2, &[7])), "70000.00");
        assert_eq!(decode(&numeric(0, 0, 0, 0, &[])), "0");
        assert_eq!(decode(&numeric(0, 0, NUMERIC_NAN, 0, &[])), "NaN");
    }

    #[test]
    fn truncated_numeric_is_an_error() {
        assert!(NumericText::from_sql(&Type::NUMERIC, &[0, 2, 0, 0]).is_err());
        assert!(NumericText::from_sql(&Type::NUMERIC, &numeric(2, 0, 0, 0, &[1])).is_err());
    }

    #[test]
    fn numeric_uuid_and_time_have_decoders() {
        assert!(<NumericText as FromSql>::accepts(&Type::NUMERIC));
        assert!(<Uuid as FromSql>::accepts(&Type::UUID));
        assert!(<NaiveTime as FromSql>::accepts(&Type::TIME));
    }

    #[test]
    fn raw_fallback_accepts_anything() {
        assert!(<RawColumn as FromSql>::accepts(&Type::INTERVAL));
        let raw = RawColumn::from_sql(&Type::INET, &[2, 32, 0, 4, 10, 0, 0, 1]).unwrap();
        assert_eq!(raw.0, RowValues::Blob(vec![2, 32, 0, 4, 10, 0, 0, 1]));

        let mood = Type::new(
            "mood".to_string(),
            0,
            Kind::Enum(vec!["happy".to_string()]),
            "public".to_string(),
        );
        let label = RawColumn::from_sql(&mood, b"happy").unwrap();
        assert_eq!(label.0, RowValues::Text("happy".to_string()));
    }
}
