use std::error::Error;

use tokio_postgres::types::{IsNull, ToSql, Type, WrongType, to_sql_checked};
use tokio_util::bytes;

use crate::types::RowValues;

/// Container for Postgres parameters with lifetime tracking
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Borrow a slice of `RowValues` as Postgres parameters
    #[must_use]
    pub fn convert(params: &'a [RowValues]) -> Params<'a> {
        let references: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Params { references }
    }

    /// Get a reference to the underlying parameter array
    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

/// Encode `value` only if its Rust type matches the column; a mismatched pair is an error
/// instead of raw bytes of the wrong shape.
fn checked<T: ToSql>(
    value: &T,
    ty: &Type,
    out: &mut bytes::BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    if T::accepts(ty) {
        value.to_sql(ty, out)
    } else {
        Err(Box::new(WrongType::new::<T>(ty.clone())))
    }
}

impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            // Integers are narrowed to the declared column width
            RowValues::Int(i) => match *ty {
                Type::INT2 => checked(&i16::try_from(*i)?, ty, out),
                Type::INT4 => checked(&i32::try_from(*i)?, ty, out),
                _ => checked(i, ty, out),
            },
            #[allow(clippy::cast_possible_truncation)]
            RowValues::Float(f) => match *ty {
                Type::FLOAT4 => checked(&(*f as f32), ty, out),
                _ => checked(f, ty, out),
            },
            RowValues::Text(s) => checked(s, ty, out),
            RowValues::Bool(b) => checked(b, ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMPTZ => checked(&dt.and_utc(), ty, out),
                Type::DATE => checked(&dt.date(), ty, out),
                _ => checked(dt, ty, out),
            },
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(jsval) => checked(jsval, ty, out),
            RowValues::Blob(bytes) => checked(bytes, ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_is_narrowed_for_int4() {
        let mut buf = bytes::BytesMut::new();
        RowValues::Int(28).to_sql(&Type::INT4, &mut buf).unwrap();
        assert_eq!(&buf[..], &28_i32.to_be_bytes());
    }

    #[test]
    fn int_overflow_is_an_error() {
        let mut buf = bytes::BytesMut::new();
        assert!(RowValues::Int(70_000).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn mismatched_variant_is_rejected() {
        let mut buf = bytes::BytesMut::new();
        let err = RowValues::Text("1234".into())
            .to_sql_checked(&Type::INT4, &mut buf)
            .err().unwrap();
        assert!(err.is::<WrongType>(), "{err}");
        assert!(buf.is_empty());

        assert!(RowValues::Int(0x4142_4344_4546_4748).to_sql(&Type::TEXT, &mut buf).is_err());
        assert!(RowValues::Blob(vec![1, 2]).to_sql(&Type::TEXT, &mut buf).is_err());
        assert!(RowValues::Bool(true).to_sql(&Type::INT8, &mut buf).is_err());
        assert!(RowValues::Float(1.5).to_sql(&Type::NUMERIC, &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn matching_variants_encode() {
        let mut buf = bytes::BytesMut::new();
        RowValues::Text("abc".into()).to_sql(&Type::VARCHAR, &mut buf).unwrap();
        assert_eq!(&buf[..], b"abc");

        let mut buf = bytes::BytesMut::new();
        RowValues::Int(7).to_sql(&Type::INT8, &mut buf).unwrap();
        assert_eq!(&buf[..], &7_i64.to_be_bytes());
    }

    #[test]
    fn null_is_null() {
        let mut buf = bytes::BytesMut::new();
        let res = RowValues::Null.to_sql(&Type::TEXT, &mut buf).unwrap();
        assert!(matches!(res, IsNull::Yes));
    }

    #[test]
    fn params_keep_order() {
        let values = vec![RowValues::Int(2), RowValues::Text("mohamed".into())];
        let params = Params::convert(&values);
        assert_eq!(params.as_refs().len(), 2);
    }
}
