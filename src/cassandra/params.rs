use chrono::NaiveDateTime;
use scylla::frame::response::result::ColumnType;
use scylla::frame::value::CqlTimestamp;
use scylla::serialize::SerializationError;
use scylla::serialize::value::SerializeCql;
use scylla::serialize::writers::{CellWriter, WrittenCellProof};

use crate::types::RowValues;

fn to_cql_timestamp(dt: &NaiveDateTime) -> CqlTimestamp {
    CqlTimestamp(dt.and_utc().timestamp_millis())
}

/// Narrow or widen to the width the server declared for the column. Values that do not fit
/// fall through to the `i64` serializer, which reports the type mismatch.
fn serialize_int<'b>(
    value: i64,
    typ: &ColumnType,
    writer: CellWriter<'b>,
) -> Result<WrittenCellProof<'b>, SerializationError> {
    match typ {
        ColumnType::Int => match i32::try_from(value) {
            Ok(v) => v.serialize(typ, writer),
            Err(_) => value.serialize(typ, writer),
        },
        ColumnType::SmallInt => match i16::try_from(value) {
            Ok(v) => v.serialize(typ, writer),
            Err(_) => value.serialize(typ, writer),
        },
        ColumnType::TinyInt => match i8::try_from(value) {
            Ok(v) => v.serialize(typ, writer),
            Err(_) => value.serialize(typ, writer),
        },
        _ => value.serialize(typ, writer),
    }
}

impl SerializeCql for RowValues {
    fn serialize<'b>(
        &self,
        typ: &ColumnType,
        writer: CellWriter<'b>,
    ) -> Result<WrittenCellProof<'b>, SerializationError> {
        match self {
            RowValues::Int(i) => serialize_int(*i, typ, writer),
            RowValues::Float(f) => match typ {
                #[allow(clippy::cast_possible_truncation)]
                ColumnType::Float => (*f as f32).serialize(typ, writer),
                _ => f.serialize(typ, writer),
            },
            RowValues::Text(s) => s.serialize(typ, writer),
            RowValues::Bool(b) => b.serialize(typ, writer),
            RowValues::Timestamp(dt) => to_cql_timestamp(dt).serialize(typ, writer),
            RowValues::Null => Ok(writer.set_null()),
            RowValues::JSON(json) => json.to_string().serialize(typ, writer),
            RowValues::Blob(bytes) => bytes.serialize(typ, writer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_epoch_millis() {
        let dt = NaiveDateTime::parse_from_str("1970-01-01 00:00:01", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(to_cql_timestamp(&dt).0, 1000);
    }

    #[test]
    fn ints_narrow_to_column_width() {
        let mut buf = Vec::new();
        RowValues::Int(28)
            .serialize(&ColumnType::Int, CellWriter::new(&mut buf))
            .unwrap();
        // 4-byte length prefix followed by a 4-byte int
        assert_eq!(buf, [0, 0, 0, 4, 0, 0, 0, 28]);
    }

    #[test]
    fn out_of_range_int_is_rejected() {
        let mut buf = Vec::new();
        let res = RowValues::Int(i64::from(i32::MAX) + 1)
            .serialize(&ColumnType::Int, CellWriter::new(&mut buf));
        assert!(res.is_err());
    }

    #[test]
    fn null_writes_negative_length() {
        let mut buf = Vec::new();
        RowValues::Null
            .serialize(&ColumnType::Text, CellWriter::new(&mut buf))
            .unwrap();
        assert_eq!(buf, (-1_i32).to_be_bytes());
    }
}
