use std::fmt::{self, Display};

use ipnetwork::IpNetwork;
use mac_address::MacAddress;
use uuid::Uuid;

use crate::host::{HostValue, Shape, ShapeMut};
use crate::types::{
    PgArray, PgBits, PgBox, PgCircle, PgComposite, PgDate, PgHstore, PgInterval, PgLSeg,
    PgLine, PgMultirange, PgNumeric, PgPath, PgPoint, PgPolygon, PgRange, PgTime,
    PgTimestamp, PgTimestamptz,
};

/// Wire format of a single value, as carried by the protocol's format codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[repr(i16)]
pub enum PgValueFormat {
    #[default]
    Text = 0,
    Binary = 1,
}

impl PgValueFormat {
    pub const fn code(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i16) -> Result<Self, pgcodec_core::Error> {
        match code {
            0 => Ok(PgValueFormat::Text),
            1 => Ok(PgValueFormat::Binary),
            _ => Err(err_protocol!("unknown format code: {}", code)),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PgValueFormat::Text => "text",
            PgValueFormat::Binary => "binary",
        }
    }
}

impl Display for PgValueFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded value whose type is only known at runtime.
///
/// Scanning into a `Value` produces the representation the column's codec prefers; encoding a
/// `Value` resolves a plan for whatever it holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    /// `oid`, `xid`, `cid`
    Oid(u32),
    /// `xid8`
    Uint64(u64),
    /// The single-byte `"char"` type.
    Char(i8),
    Float4(f32),
    Float8(f64),
    Numeric(PgNumeric),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(PgDate),
    Time(PgTime),
    Timestamp(PgTimestamp),
    Timestamptz(PgTimestamptz),
    Interval(PgInterval),
    Bits(PgBits),
    Json(serde_json::Value),
    Inet(IpNetwork),
    MacAddr(MacAddress),
    Point(PgPoint),
    Line(PgLine),
    Lseg(PgLSeg),
    Box(PgBox),
    Path(PgPath),
    Polygon(PgPolygon),
    Circle(PgCircle),
    Hstore(PgHstore),
    Array(PgArray<Value>),
    Composite(PgComposite),
    Range(Box<PgRange<Value>>),
    Multirange(PgMultirange<Value>),
    /// An anonymous `record`; fields are positional and carry no names.
    Record(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The held value, or `None` for [`Value::Null`].
    pub fn as_host(&self) -> Option<&dyn HostValue> {
        let v: &dyn HostValue = match self {
            Value::Null => return None,
            Value::Bool(v) => v,
            Value::Int2(v) => v,
            Value::Int4(v) => v,
            Value::Int8(v) => v,
            Value::Oid(v) => v,
            Value::Uint64(v) => v,
            Value::Char(v) => v,
            Value::Float4(v) => v,
            Value::Float8(v) => v,
            Value::Numeric(v) => v,
            Value::Text(v) => v,
            Value::Bytes(v) => v,
            Value::Uuid(v) => v,
            Value::Date(v) => v,
            Value::Time(v) => v,
            Value::Timestamp(v) => v,
            Value::Timestamptz(v) => v,
            Value::Interval(v) => v,
            Value::Bits(v) => v,
            Value::Json(v) => v,
            Value::Inet(v) => v,
            Value::MacAddr(v) => v,
            Value::Point(v) => v,
            Value::Line(v) => v,
            Value::Lseg(v) => v,
            Value::Box(v) => v,
            Value::Path(v) => v,
            Value::Polygon(v) => v,
            Value::Circle(v) => v,
            Value::Hstore(v) => v,
            Value::Array(v) => v,
            Value::Composite(v) => v,
            Value::Range(v) => &**v,
            Value::Multirange(v) => v,
            Value::Record(v) => v,
        };

        Some(v)
    }
}

impl HostValue for Value {
    crate::impl_host_any!();

    fn shape(&self) -> Shape<'_> {
        Shape::Dynamic(self.as_host())
    }

    fn shape_mut(&mut self) -> ShapeMut<'_> {
        ShapeMut::Dynamic
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )+
    };
}

impl_value_from!(
    bool => Bool,
    i16 => Int2,
    i32 => Int4,
    i64 => Int8,
    f32 => Float4,
    f64 => Float8,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    PgNumeric => Numeric,
    Uuid => Uuid,
    PgDate => Date,
    PgTimestamptz => Timestamptz,
    PgInterval => Interval,
    serde_json::Value => Json,
    PgArray<Value> => Array,
    PgComposite => Composite,
);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_codes() {
        assert_eq!(PgValueFormat::Binary.code(), 1);
        assert_eq!(PgValueFormat::from_code(0).unwrap(), PgValueFormat::Text);
        assert!(PgValueFormat::from_code(2).is_err());
    }

    #[test]
    fn dynamic_shape_exposes_payload() {
        let v = Value::Int4(7);

        match v.shape() {
            Shape::Dynamic(Some(inner)) => assert_eq!(inner.downcast_ref::<i32>(), Some(&7)),
            _ => panic!("expected a dynamic shape"),
        }

        assert!((&Value::Null as &dyn HostValue).is_null());
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }
}
