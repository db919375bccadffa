//! Codecs and the value types they decode into.
//!
//! The following host types are handled natively, along with the PostgreSQL types they map to
//! by default. Anything else reaches a codec through the wrapping chain or a capability.
//!
//! ### Standard
//!
//! | Rust type                         | Postgres type(s)                             |
//! |-----------------------------------|----------------------------------------------|
//! | `bool`                            | BOOL                                         |
//! | `i16`                             | SMALLINT                                     |
//! | `i32`                             | INT                                          |
//! | `i64`                             | BIGINT                                       |
//! | `f32`                             | REAL                                         |
//! | `f64`                             | DOUBLE PRECISION                             |
//! | `String`, `&'static str`          | TEXT, VARCHAR, CHAR(n), NAME, XML, enums     |
//! | `Vec<u8>`                         | BYTEA                                        |
//!
//! ### PostgreSQL specific
//!
//! | Rust type                         | Postgres type(s)                             |
//! |-----------------------------------|----------------------------------------------|
//! | `i8`                              | "char"                                       |
//! | `u32`                             | OID, XID, CID                                |
//! | `u64`                             | XID8                                         |
//! | [`PgNumeric`]                     | NUMERIC                                      |
//! | [`PgDate`], [`PgTime`]            | DATE, TIME                                   |
//! | [`PgTimestamp`], [`PgTimestamptz`]| TIMESTAMP, TIMESTAMPTZ                       |
//! | [`PgInterval`]                    | INTERVAL                                     |
//! | [`PgBits`]                        | BIT, VARBIT                                  |
//! | `uuid::Uuid`                      | UUID                                         |
//! | `ipnetwork::IpNetwork`            | INET, CIDR                                   |
//! | `mac_address::MacAddress`         | MACADDR                                      |
//! | `serde_json::Value`, [`Json<T>`]  | JSON, JSONB                                  |
//! | [`PgHstore`]                      | HSTORE                                       |
//! | [`PgPoint`] and friends           | POINT, LINE, LSEG, BOX, PATH, POLYGON, CIRCLE|
//! | [`PgArray<T>`]                    | any array                                    |
//! | [`PgRange<T>`]                    | any range                                    |
//! | [`PgMultirange<T>`]               | any multirange                               |
//! | [`PgComposite`]                   | any composite                                |
//!
//! `chrono` types, `IpAddr`, `[u8; 16]` and `HashMap<String, Option<String>>` are converted to
//! the types above by the wrapping chain.
use std::any::{type_name, Any};
use std::sync::Arc;

use pgcodec_core::error::BoxDynError;
use pgcodec_core::IsNull;

use crate::arguments::PgArgumentBuffer;
use crate::plan::{
    missing_capability, not_null, target_mut, text, value_ref, EncodeFn, EncodePlan, ScanFn,
    ScanPlan,
};
use crate::value::PgValueFormat;

/// Defines a codec for a type whose only host representations are its native [`WireValue`]
/// type and text (through [`TextValuer`][crate::host::TextValuer] and
/// [`TextScanner`][crate::host::TextScanner]).
///
/// `database_value = native` makes `decode_database_value` return the decoded value itself
/// instead of its text rendering.
macro_rules! scalar_codec {
    (@database_value native) => {
        fn decode_database_value(
            &self,
            map: &$crate::map::PgTypeMap,
            oid: u32,
            format: $crate::value::PgValueFormat,
            src: Option<&[u8]>,
        ) -> Result<$crate::value::Value, pgcodec_core::error::BoxDynError> {
            $crate::codec::Codec::decode_value(self, map, oid, format, src)
        }
    };

    ($(#[$meta:meta])* $codec:ident, $ty:ty, $variant:ident $(, database_value = $db:ident)?) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $codec;

        impl $crate::codec::Codec for $codec {
            fn format_supported(&self, _: $crate::value::PgValueFormat) -> bool {
                true
            }

            fn preferred_format(&self) -> $crate::value::PgValueFormat {
                $crate::value::PgValueFormat::Binary
            }

            fn plan_encode(
                &self,
                _: &$crate::map::PgTypeMap,
                _: u32,
                format: $crate::value::PgValueFormat,
                value: &dyn $crate::host::HostValue,
            ) -> Option<::std::sync::Arc<dyn $crate::plan::EncodePlan>> {
                if value.is::<$ty>() {
                    return Some($crate::types::native_encode_plan::<$ty>(format));
                }

                $crate::host::HostValue::as_text_valuer(value)?;

                Some($crate::types::parsed_text_encode_plan::<$ty>(format))
            }

            fn plan_scan(
                &self,
                _: &$crate::map::PgTypeMap,
                _: u32,
                format: $crate::value::PgValueFormat,
                target: &mut dyn $crate::host::HostValue,
            ) -> Option<::std::sync::Arc<dyn $crate::plan::ScanPlan>> {
                if target.is::<$ty>() {
                    return Some($crate::types::native_scan_plan::<$ty>(format));
                }

                if format == $crate::value::PgValueFormat::Binary
                    && $crate::host::HostValue::as_text_scanner(target).is_some()
                {
                    return Some($crate::types::rendered_text_scan_plan::<$ty>());
                }

                None
            }

            fn decode_value(
                &self,
                _: &$crate::map::PgTypeMap,
                _: u32,
                format: $crate::value::PgValueFormat,
                src: Option<&[u8]>,
            ) -> Result<$crate::value::Value, pgcodec_core::error::BoxDynError> {
                Ok($crate::types::decode_opt::<$ty>(format, src)?
                    .map_or($crate::value::Value::Null, $crate::value::Value::$variant))
            }

            $(scalar_codec!(@database_value $db);)?
        }
    };
}

mod array;
#[cfg(feature = "bigdecimal")]
mod bigdecimal;
mod bits;
mod bool;
mod bytea;
mod composite;
mod datetime;
mod float;
mod geometry;
mod hstore;
mod int;
mod json;
mod multirange;
mod network;
mod numeric;
mod range;
mod record;
mod text;
mod undecoded;
mod uuid;

pub use array::{ArrayCodec, PgArray};
pub use bits::{BitsCodec, PgBits};
pub use self::bool::BoolCodec;
pub use bytea::ByteaCodec;
pub use composite::{CompositeCodec, CompositeField, PgComposite};
pub use datetime::{
    DateCodec, IntervalCodec, PgDate, PgInterval, PgTime, PgTimestamp, PgTimestamptz, TimeCodec,
    TimestampCodec, TimestamptzCodec,
};
pub use float::{Float4Codec, Float8Codec};
pub(crate) use float::float_to_int64;
pub use geometry::{
    BoxCodec, CircleCodec, LineCodec, LsegCodec, PathCodec, PgBox, PgCircle, PgLSeg, PgLine,
    PgPath, PgPoint, PgPolygon, PointCodec, PolygonCodec,
};
pub use hstore::{HstoreCodec, PgHstore};
pub use int::{Int2Codec, Int4Codec, Int8Codec, QCharCodec, Uint32Codec, Uint64Codec};
pub use json::{Json, JsonCodec, JsonbCodec};
pub use multirange::{MultirangeCodec, PgMultirange};
pub use network::{InetCodec, MacaddrCodec};
pub use numeric::{NumericCodec, PgNumeric};
pub use range::{PgRange, RangeCodec};
pub use record::RecordCodec;
pub use text::{EnumCodec, TextCodec, XmlCodec};
pub use undecoded::UndecodedBytes;
pub use self::uuid::UuidCodec;

/// A type with its own binary and text wire encodings.
///
/// Implemented by each codec's native representation; the codec builds its native plans from
/// these four functions.
pub(crate) trait WireValue: Sized {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError>;

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError>;

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError>;

    fn decode_text(src: &str) -> Result<Self, BoxDynError>;

    fn encode(&self, format: PgValueFormat, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        match format {
            PgValueFormat::Binary => self.encode_binary(buf),
            PgValueFormat::Text => self.encode_text(buf),
        }
    }

    fn decode(format: PgValueFormat, src: &[u8]) -> Result<Self, BoxDynError> {
        match format {
            PgValueFormat::Binary => Self::decode_binary(src),
            PgValueFormat::Text => Self::decode_text(text(src)?),
        }
    }
}

/// Decode a possibly-`NULL` payload with `T`'s wire encoding.
pub(crate) fn decode_opt<T: WireValue>(
    format: PgValueFormat,
    src: Option<&[u8]>,
) -> Result<Option<T>, BoxDynError> {
    src.map(|src| T::decode(format, src)).transpose()
}

/// Encode values whose host type is exactly `T`.
pub(crate) fn native_encode_plan<T>(format: PgValueFormat) -> Arc<dyn EncodePlan>
where
    T: WireValue + Any,
{
    match format {
        PgValueFormat::Binary => EncodeFn::arc(type_name::<T>(), |_, value, buf| {
            value_ref::<T>(value)?.encode_binary(buf)?;
            Ok(IsNull::No)
        }),
        PgValueFormat::Text => EncodeFn::arc(type_name::<T>(), |_, value, buf| {
            value_ref::<T>(value)?.encode_text(buf)?;
            Ok(IsNull::No)
        }),
    }
}

/// Scan into targets whose host type is exactly `T`.
pub(crate) fn native_scan_plan<T>(format: PgValueFormat) -> Arc<dyn ScanPlan>
where
    T: WireValue + Any,
{
    match format {
        PgValueFormat::Binary => ScanFn::arc(type_name::<T>(), |_, src, target| {
            let decoded = T::decode_binary(not_null::<T>(src)?)?;
            *target_mut::<T>(target)? = decoded;
            Ok(())
        }),
        PgValueFormat::Text => ScanFn::arc(type_name::<T>(), |_, src, target| {
            let decoded = T::decode_text(text(not_null::<T>(src)?)?)?;
            *target_mut::<T>(target)? = decoded;
            Ok(())
        }),
    }
}

/// Encode a [`TextValuer`][crate::host::TextValuer] by parsing its text as `T`.
///
/// Validates the text before it reaches the server and allows binary format.
pub(crate) fn parsed_text_encode_plan<T>(format: PgValueFormat) -> Arc<dyn EncodePlan>
where
    T: WireValue + Any,
{
    fn encode<T: WireValue>(
        value: &dyn crate::host::HostValue,
        buf: &mut PgArgumentBuffer,
        format: PgValueFormat,
    ) -> Result<IsNull, BoxDynError> {
        let valuer = value
            .as_text_valuer()
            .ok_or_else(|| missing_capability(value.type_name(), "TextValuer"))?;

        let Some(s) = valuer.text_value()? else {
            return Ok(IsNull::Yes);
        };

        T::decode_text(&s)?.encode(format, buf)?;

        Ok(IsNull::No)
    }

    match format {
        PgValueFormat::Binary => EncodeFn::arc(type_name::<T>(), |_, value, buf| {
            encode::<T>(value, buf, PgValueFormat::Binary)
        }),
        PgValueFormat::Text => EncodeFn::arc(type_name::<T>(), |_, value, buf| {
            encode::<T>(value, buf, PgValueFormat::Text)
        }),
    }
}

/// Scan binary `T` into a [`TextScanner`][crate::host::TextScanner] through its text form.
///
/// Text format never needs this: text reaches a `TextScanner` before any codec is consulted.
pub(crate) fn rendered_text_scan_plan<T>() -> Arc<dyn ScanPlan>
where
    T: WireValue + Any,
{
    ScanFn::arc(type_name::<T>(), |_, src, target| {
        let host = target.type_name();
        let decoded = decode_opt::<T>(PgValueFormat::Binary, src)?;

        let rendered = match decoded {
            Some(v) => {
                let mut buf = PgArgumentBuffer::new();
                v.encode_text(&mut buf)?;
                Some(String::from_utf8(buf.into_inner())?)
            }
            None => None,
        };

        target
            .as_text_scanner()
            .ok_or_else(|| missing_capability(host, "TextScanner"))?
            .scan_text(rendered.as_deref())
    })
}
