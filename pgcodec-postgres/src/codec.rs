use std::fmt;
use std::sync::Arc;

use pgcodec_core::error::BoxDynError;

use crate::host::HostValue;
use crate::map::PgTypeMap;
use crate::plan::{EncodePlan, ScanPlan};
use crate::value::{PgValueFormat, Value};

/// Conversion behavior for one family of PostgreSQL types.
///
/// A codec never converts a value itself; it builds a plan for one
/// `(oid, format, host type)` combination and returns `None` when it does not understand the
/// host type, letting the registry try the wrapping chain next. Structural codecs re-enter the
/// registry through `map` to plan their elements.
pub trait Codec: Send + Sync + fmt::Debug {
    fn format_supported(&self, format: PgValueFormat) -> bool;

    fn preferred_format(&self) -> PgValueFormat;

    fn plan_encode(
        &self,
        map: &PgTypeMap,
        oid: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
    ) -> Option<Arc<dyn EncodePlan>>;

    /// `target` is only inspected here; it is mutated when the returned plan runs.
    fn plan_scan(
        &self,
        map: &PgTypeMap,
        oid: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>>;

    /// Decode into the codec's preferred runtime representation.
    fn decode_value(
        &self,
        map: &PgTypeMap,
        oid: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError>;

    /// Decode into the restricted set a generic database interface can carry: `NULL`,
    /// booleans, 64-bit integers and floats, text, bytes and timestamps.
    ///
    /// Everything else comes back as its text rendering.
    fn decode_database_value(
        &self,
        map: &PgTypeMap,
        oid: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        decode_to_text_value(self, map, oid, format, src)
    }
}

/// Render `src` as text, decoding and re-encoding it when it arrived in binary.
pub(crate) fn decode_to_text_value<C: Codec + ?Sized>(
    codec: &C,
    map: &PgTypeMap,
    oid: u32,
    format: PgValueFormat,
    src: Option<&[u8]>,
) -> Result<Value, BoxDynError> {
    let Some(src) = src else {
        return Ok(Value::Null);
    };

    match format {
        PgValueFormat::Text => Ok(Value::Text(crate::plan::text(src)?.to_owned())),
        PgValueFormat::Binary => {
            let value = codec.decode_value(map, oid, format, Some(src))?;

            let mut buf = crate::PgArgumentBuffer::new();
            if map
                .encode_raw(oid, PgValueFormat::Text, &value, &mut buf)?
                .is_null()
            {
                return Ok(Value::Null);
            }

            Ok(Value::Text(String::from_utf8(buf.into_inner())?))
        }
    }
}

/// Decode `src` with the codec registered for `oid`.
///
/// Without a registered type the payload comes back as [`Value::Text`] or [`Value::Bytes`].
pub(crate) fn decode_value_for_oid(
    map: &PgTypeMap,
    oid: u32,
    format: PgValueFormat,
    src: Option<&[u8]>,
) -> Result<Value, BoxDynError> {
    match (map.type_for_oid(oid), src) {
        (Some(ty), src) => ty.codec().decode_value(map, oid, format, src),
        (None, None) => Ok(Value::Null),
        (None, Some(src)) => Ok(match format {
            PgValueFormat::Text => Value::Text(crate::plan::text(src)?.to_owned()),
            PgValueFormat::Binary => Value::Bytes(src.to_vec()),
        }),
    }
}
