use chrono::{DateTime, NaiveDate, NaiveTime};
use scylla::QueryResult;
use scylla::frame::response::result::CqlValue;
use scylla::frame::value::{CqlDate, CqlDecimal, CqlTime, CqlVarint};
use serde_json::{Map, Value as JsonValue};

use crate::error::StoreMiddlewareError;
use crate::results::ResultSet;
use crate::schema::{SchemaDefinition, TableDescription, TableKey};
use crate::types::RowValues;

/// Build a result set from a `scylla` query result.
///
/// Statements that return no rows (DDL, `INSERT`, `UPDATE`) produce an empty result set.
#[must_use]
pub fn build_result_set(result: QueryResult) -> ResultSet {
    let column_names: Vec<String> = result
        .col_specs
        .iter()
        .map(|spec| spec.name.clone())
        .collect();
    let rows = result.rows.unwrap_or_default();

    let mut result_set = ResultSet::with_columns(column_names, rows.len());
    for row in rows {
        let values = row
            .columns
            .into_iter()
            .map(|col| col.map_or(RowValues::Null, cql_extract_value))
            .collect();
        result_set.add_row_values(values);
    }
    result_set
}

/// Map a CQL value onto `RowValues`.
///
/// `date` becomes a midnight timestamp, `time` its `HH:MM:SS` text, `decimal` and wide `varint`
/// values their exact decimal text. Collections, tuples, UDTs and durations come back as JSON.
#[must_use]
pub fn cql_extract_value(value: CqlValue) -> RowValues {
    match value {
        CqlValue::TinyInt(v) => RowValues::Int(i64::from(v)),
        CqlValue::SmallInt(v) => RowValues::Int(i64::from(v)),
        CqlValue::Int(v) => RowValues::Int(i64::from(v)),
        CqlValue::BigInt(v) => RowValues::Int(v),
        CqlValue::Counter(c) => RowValues::Int(c.0),
        CqlValue::Varint(v) => varint_value(&v),
        CqlValue::Decimal(d) => RowValues::Text(decimal_text(&d)),
        CqlValue::Float(v) => RowValues::Float(f64::from(v)),
        CqlValue::Double(v) => RowValues::Float(v),
        CqlValue::Boolean(v) => RowValues::Bool(v),
        CqlValue::Text(s) | CqlValue::Ascii(s) => RowValues::Text(s),
        CqlValue::Blob(bytes) => RowValues::Blob(bytes),
        CqlValue::Timestamp(ts) => DateTime::from_timestamp_millis(ts.0)
            .map_or(RowValues::Int(ts.0), |dt| RowValues::Timestamp(dt.naive_utc())),
        CqlValue::Date(date) => date_value(date),
        CqlValue::Time(time) => time_value(time),
        CqlValue::Uuid(uuid) => RowValues::Text(uuid.to_string()),
        CqlValue::Timeuuid(uuid) => RowValues::Text(uuid.to_string()),
        CqlValue::Inet(addr) => RowValues::Text(addr.to_string()),
        CqlValue::Empty => RowValues::Null,
        other @ (CqlValue::Duration(_)
        | CqlValue::List(_)
        | CqlValue::Set(_)
        | CqlValue::Map(_)
        | CqlValue::Tuple(_)
        | CqlValue::UserDefinedType { .. }) => RowValues::JSON(cql_to_json(other)),
    }
}

/// Days since the epoch when the date is outside chrono's range.
fn date_value(date: CqlDate) -> RowValues {
    let raw = date.0;
    match TryInto::<NaiveDate>::try_into(date) {
        Ok(day) => RowValues::Timestamp(day.and_time(NaiveTime::MIN)),
        Err(_) => RowValues::Int(i64::from(raw) - (1_i64 << 31)),
    }
}

fn time_value(time: CqlTime) -> RowValues {
    let nanos = time.0;
    match TryInto::<NaiveTime>::try_into(time) {
        Ok(t) => RowValues::Text(t.to_string()),
        Err(_) => RowValues::Int(nanos),
    }
}

/// Two's complement big-endian bytes as `i128`, if they fit.
fn signed_be_i128(bytes: &[u8]) -> Option<i128> {
    if bytes.len() > 16 {
        return None;
    }
    let fill = if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        0xff
    } else {
        0
    };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Some(i128::from_be_bytes(buf))
}

fn hex_text(bytes: &[u8]) -> String {
    let digits: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("0x{digits}")
}

fn varint_value(varint: &CqlVarint) -> RowValues {
    let bytes = varint.as_signed_bytes_be_slice();
    match signed_be_i128(bytes) {
        Some(v) => i64::try_from(v).map_or_else(|_| RowValues::Text(v.to_string()), RowValues::Int),
        None => RowValues::Text(hex_text(bytes)),
    }
}

fn decimal_text(decimal: &CqlDecimal) -> String {
    let (bytes, scale) = decimal.as_signed_be_bytes_slice_and_exponent();
    let Some(unscaled) = signed_be_i128(bytes) else {
        return format!("{}E{}", hex_text(bytes), -i64::from(scale));
    };
    #[allow(clippy::cast_possible_truncation)]
    let places = scale.unsigned_abs() as usize;
    if scale <= 0 {
        return format!("{unscaled}{}", "0".repeat(places));
    }
    let sign = if unscaled < 0 { "-" } else { "" };
    let digits = format!("{:0>width$}", unscaled.unsigned_abs(), width = places + 1);
    let (whole, fraction) = digits.split_at(digits.len() - places);
    format!("{sign}{whole}.{fraction}")
}

fn row_value_to_json(value: RowValues) -> JsonValue {
    match value {
        RowValues::Int(i) => JsonValue::from(i),
        RowValues::Float(f) => JsonValue::from(f),
        RowValues::Text(s) => JsonValue::String(s),
        RowValues::Bool(b) => JsonValue::Bool(b),
        RowValues::Timestamp(ts) => JsonValue::String(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        RowValues::Null => JsonValue::Null,
        RowValues::JSON(json) => json,
        RowValues::Blob(bytes) => JsonValue::String(hex_text(&bytes)),
    }
}

fn json_key(value: CqlValue) -> String {
    match cql_to_json(value) {
        JsonValue::String(s) => s,
        other => other.to_string(),
    }
}

fn cql_to_json(value: CqlValue) -> JsonValue {
    let optional = |v: Option<CqlValue>| v.map_or(JsonValue::Null, cql_to_json);
    match value {
        CqlValue::List(items) | CqlValue::Set(items) => {
            JsonValue::Array(items.into_iter().map(cql_to_json).collect())
        }
        CqlValue::Tuple(items) => JsonValue::Array(items.into_iter().map(optional).collect()),
        CqlValue::Map(entries) => JsonValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (json_key(k), cql_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        CqlValue::UserDefinedType { fields, .. } => JsonValue::Object(
            fields
                .into_iter()
                .map(|(name, v)| (name, optional(v)))
                .collect::<Map<_, _>>(),
        ),
        CqlValue::Duration(d) => serde_json::json!({
            "months": d.months,
            "days": d.days,
            "nanoseconds": d.nanoseconds,
        }),
        scalar => row_value_to_json(cql_extract_value(scalar)),
    }
}

/// One `system_schema.columns` entry.
#[derive(Debug)]
pub(crate) struct CatalogColumn {
    pub(crate) name: String,
    pub(crate) type_tag: String,
    pub(crate) kind: String,
    pub(crate) position: i64,
}

impl CatalogColumn {
    pub(crate) fn from_row(row: &crate::results::StoreRow) -> Result<Self, StoreMiddlewareError> {
        let text = |col: &str| {
            row.get(col)
                .and_then(RowValues::as_text)
                .map(str::to_string)
                .ok_or_else(|| {
                    StoreMiddlewareError::InvalidSchema(format!(
                        "system_schema.columns row without `{col}`"
                    ))
                })
        };
        Ok(CatalogColumn {
            name: text("column_name")?,
            type_tag: text("type")?,
            kind: text("kind")?,
            position: row
                .get("position")
                .and_then(RowValues::as_int)
                .copied()
                .unwrap_or(-1),
        })
    }
}

/// Rebuild the schema and key of a table from its `system_schema.columns` rows.
///
/// Partition key columns come first, then clustering columns (both by position), then the
/// remaining columns in catalog order.
pub(crate) fn describe_from_catalog(mut columns: Vec<CatalogColumn>) -> Option<TableDescription> {
    if columns.is_empty() {
        return None;
    }
    let rank = |kind: &str| match kind {
        "partition_key" => 0,
        "clustering" => 1,
        _ => 2,
    };
    columns.sort_by(|a, b| {
        rank(&a.kind)
            .cmp(&rank(&b.kind))
            .then_with(|| {
                if rank(&a.kind) < 2 {
                    a.position.cmp(&b.position)
                } else {
                    std::cmp::Ordering::Equal
                }
            })
    });

    let mut schema = SchemaDefinition::new();
    let mut partition = Vec::new();
    let mut clustering = Vec::new();
    for column in columns {
        match column.kind.as_str() {
            "partition_key" => partition.push(column.name.clone()),
            "clustering" => clustering.push(column.name.clone()),
            _ => {}
        }
        schema = schema.column(column.name, column.type_tag);
    }

    Some(TableDescription {
        schema,
        key: TableKey::Explicit {
            partition,
            clustering,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, type_tag: &str, kind: &str, position: i64) -> CatalogColumn {
        CatalogColumn {
            name: name.into(),
            type_tag: type_tag.into(),
            kind: kind.into(),
            position,
        }
    }

    #[test]
    fn extracts_scalars() {
        assert_eq!(cql_extract_value(CqlValue::Int(28)), RowValues::Int(28));
        assert_eq!(
            cql_extract_value(CqlValue::Text("mohamed".into())),
            RowValues::Text("mohamed".into())
        );
        assert_eq!(cql_extract_value(CqlValue::Empty), RowValues::Null);
    }

    #[test]
    fn date_is_a_midnight_timestamp() {
        // CQL dates count days from 2^31 before the epoch
        let value = cql_extract_value(CqlValue::Date(CqlDate((1 << 31) + 19_844)));
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(value, RowValues::Timestamp(expected));
    }

    #[test]
    fn time_is_clock_text() {
        let nanos = ((12 * 60 + 30) * 60 + 5) * 1_000_000_000_i64;
        assert_eq!(
            cql_extract_value(CqlValue::Time(CqlTime(nanos))),
            RowValues::Text("12:30:05".into())
        );
    }

    #[test]
    fn decimal_keeps_exact_digits() {
        let d = |bytes: &[u8], scale| {
            cql_extract_value(CqlValue::Decimal(
                CqlDecimal::from_signed_be_bytes_slice_and_exponent(bytes, scale),
            ))
        };
        assert_eq!(d(&[0x3b], 1), RowValues::Text("5.9".into()));
        assert_eq!(d(&[0xff, 0x85], 2), RowValues::Text("-1.23".into()));
        assert_eq!(d(&[0x05], 3), RowValues::Text("0.005".into()));
        assert_eq!(d(&[0x07], -2), RowValues::Text("700".into()));
    }

    #[test]
    fn varint_fits_int_or_falls_back_to_text() {
        let small = CqlVarint::from_signed_bytes_be_slice(&[0x01, 0x00]);
        assert_eq!(cql_extract_value(CqlValue::Varint(small)), RowValues::Int(256));

        let wide = CqlVarint::from_signed_bytes_be_slice(&[0x01, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            cql_extract_value(CqlValue::Varint(wide)),
            RowValues::Text("18446744073709551616".into())
        );
    }

    #[test]
    fn collections_become_json() {
        let list = CqlValue::List(vec![CqlValue::Int(1), CqlValue::Int(2)]);
        assert_eq!(cql_extract_value(list), RowValues::JSON(serde_json::json!([1, 2])));

        let set = CqlValue::Set(vec![CqlValue::Text("a".into())]);
        assert_eq!(cql_extract_value(set), RowValues::JSON(serde_json::json!(["a"])));

        let map = CqlValue::Map(vec![
            (CqlValue::Text("x".into()), CqlValue::Boolean(true)),
            (CqlValue::Int(7), CqlValue::Double(0.5)),
        ]);
        assert_eq!(
            cql_extract_value(map),
            RowValues::JSON(serde_json::json!({"x": true, "7": 0.5}))
        );
    }

    #[test]
    fn udt_tuple_and_duration_become_json() {
        let udt = CqlValue::UserDefinedType {
            keyspace: "ks".into(),
            type_name: "address".into(),
            fields: vec![
                ("street".into(), Some(CqlValue::Text("main".into()))),
                ("zip".into(), None),
            ],
        };
        assert_eq!(
            cql_extract_value(udt),
            RowValues::JSON(serde_json::json!({"street": "main", "zip": null}))
        );

        let tuple = CqlValue::Tuple(vec![Some(CqlValue::BigInt(3)), None]);
        assert_eq!(cql_extract_value(tuple), RowValues::JSON(serde_json::json!([3, null])));

        let duration = CqlValue::Duration(scylla::frame::value::CqlDuration {
            months: 1,
            days: 2,
            nanoseconds: 3,
        });
        assert_eq!(
            cql_extract_value(duration),
            RowValues::JSON(serde_json::json!({"months": 1, "days": 2, "nanoseconds": 3}))
        );
    }

    #[test]
    fn catalog_orders_key_columns_first() {
        // system_schema.columns comes back sorted by column name
        let desc = describe_from_catalog(vec![
            col("age", "int", "regular", -1),
            col("bucket", "int", "clustering", 1),
            col("day", "date", "clustering", 0),
            col("id", "int", "partition_key", 0),
            col("name", "text", "regular", -1),
        ])
        .unwrap();

        let names: Vec<&str> = desc.schema.column_names().collect();
        assert_eq!(names, ["id", "day", "bucket", "age", "name"]);
        assert_eq!(desc.key, TableKey::explicit(["id"], ["day", "bucket"]));
    }

    #[test]
    fn missing_table_has_no_description() {
        assert!(describe_from_catalog(Vec::new()).is_none());
    }
}
