use std::any::Any;
use std::fmt::{self, Debug, Display};
use std::marker::PhantomData;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use pgcodec_core::error::{BoxDynError, Error};
use pgcodec_core::IsNull;

use crate::arguments::PgArgumentBuffer;
use crate::codec::Codec;
use crate::host::HostValue;
use crate::map::PgTypeMap;
use crate::plan::{expect_len, missing_capability, EncodePlan, ScanPlan};
use crate::types::{decode_opt, native_encode_plan, native_scan_plan, WireValue};
use crate::value::{PgValueFormat, Value};

/// An integer with a fixed-width binary encoding.
pub(crate) trait WireInt:
    WireValue + Copy + Debug + Display + Any + Send + Sync + TryFrom<i64> + TryInto<i64>
{
    /// Name used in range errors.
    const PG_NAME: &'static str;
}

fn put_decimal(buf: &mut PgArgumentBuffer, n: impl itoa::Integer) {
    buf.put_str(itoa::Buffer::new().format(n));
}

macro_rules! impl_wire_int {
    ($($ty:ty => $name:literal, $read:path;)+) => {
        $(
            impl WireValue for $ty {
                fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
                    buf.extend(&self.to_be_bytes());
                    Ok(())
                }

                fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
                    put_decimal(buf, *self);
                    Ok(())
                }

                fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
                    expect_len(src, std::mem::size_of::<$ty>(), $name)?;
                    Ok($read(src))
                }

                fn decode_text(src: &str) -> Result<Self, BoxDynError> {
                    Ok(src.parse()?)
                }
            }

            impl WireInt for $ty {
                const PG_NAME: &'static str = $name;
            }
        )+
    };
}

impl_wire_int!(
    i16 => "int2", BigEndian::read_i16;
    i32 => "int4", BigEndian::read_i32;
    i64 => "int8", BigEndian::read_i64;
    u32 => "uint32", BigEndian::read_u32;
    u64 => "xid8", BigEndian::read_u64;
);

// "char" is a single byte; the text form escapes the high half in octal.
// https://github.com/postgres/postgres/blob/master/src/backend/utils/adt/char.c
impl WireValue for i8 {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.extend(&self.to_be_bytes());
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        let [byte] = self.to_be_bytes();

        match byte {
            0 => {}
            0x01..=0x7f => buf.push(byte),
            _ => buf.put_str(&format!("\\{byte:03o}")),
        }

        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        expect_len(src, 1, "\"char\"")?;
        Ok(i8::from_be_bytes([src[0]]))
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        // A value of 0 is represented with the empty string.
        let Some(&first) = src.as_bytes().first() else {
            return Ok(0);
        };

        if let Some(octal) = src.strip_prefix('\\') {
            return Ok(i8::from_be_bytes([u8::from_str_radix(octal, 8)?]));
        }

        Ok(i8::from_be_bytes([first]))
    }
}

impl WireInt for i8 {
    const PG_NAME: &'static str = "\"char\"";
}

fn out_of_range<T: WireInt>(v: i64) -> BoxDynError {
    let bound = if v < 0 { "less than minimum" } else { "greater than maximum" };
    Box::new(Error::overflow(format!("{v} is {bound} value for {}", T::PG_NAME)))
}

/// Encodes an [`Int64Valuer`][crate::host::Int64Valuer] as `T`, checking the range.
pub(crate) struct Int64ValuerPlan<T> {
    format: PgValueFormat,
    marker: PhantomData<fn() -> T>,
}

impl<T> Int64ValuerPlan<T> {
    pub(crate) fn arc(format: PgValueFormat) -> Arc<dyn EncodePlan>
    where
        T: WireInt,
    {
        Arc::new(Int64ValuerPlan::<T> {
            format,
            marker: PhantomData,
        })
    }
}

impl<T: WireInt> Debug for Int64ValuerPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Int64ValuerPlan")
            .field("wire", &T::PG_NAME)
            .field("format", &self.format)
            .finish()
    }
}

impl<T: WireInt> EncodePlan for Int64ValuerPlan<T> {
    fn encode(
        &self,
        _: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        let valuer = value
            .as_int64_valuer()
            .ok_or_else(|| missing_capability(value.type_name(), "Int64Valuer"))?;

        let Some(v) = valuer.int64_value()? else {
            return Ok(IsNull::Yes);
        };

        let n = T::try_from(v).map_err(|_| out_of_range::<T>(v))?;
        n.encode(self.format, buf)?;

        Ok(IsNull::No)
    }
}

/// Scans `T` into an [`Int64Scanner`][crate::host::Int64Scanner].
pub(crate) struct Int64ScannerPlan<T> {
    format: PgValueFormat,
    marker: PhantomData<fn() -> T>,
}

impl<T> Int64ScannerPlan<T> {
    pub(crate) fn arc(format: PgValueFormat) -> Arc<dyn ScanPlan>
    where
        T: WireInt,
    {
        Arc::new(Int64ScannerPlan::<T> {
            format,
            marker: PhantomData,
        })
    }
}

impl<T: WireInt> Debug for Int64ScannerPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Int64ScannerPlan")
            .field("wire", &T::PG_NAME)
            .field("format", &self.format)
            .finish()
    }
}

impl<T: WireInt> ScanPlan for Int64ScannerPlan<T> {
    fn scan(
        &self,
        _: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let host = target.type_name();
        let scanner = target
            .as_int64_scanner()
            .ok_or_else(|| missing_capability(host, "Int64Scanner"))?;

        let Some(n) = decode_opt::<T>(self.format, src)? else {
            return scanner.scan_int64(None);
        };

        let v: i64 = n
            .try_into()
            .map_err(|_| Error::overflow(format!("{n} is greater than maximum value for int8")))?;

        scanner.scan_int64(Some(v))
    }
}

/// Renders a binary integer as decimal text for a [`TextScanner`][crate::host::TextScanner].
pub(crate) struct IntTextScannerPlan<T>(PhantomData<fn() -> T>);

impl<T: WireInt> Debug for IntTextScannerPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntTextScannerPlan").field(&T::PG_NAME).finish()
    }
}

impl<T: WireInt> ScanPlan for IntTextScannerPlan<T> {
    fn scan(
        &self,
        _: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let host = target.type_name();
        let scanner = target
            .as_text_scanner()
            .ok_or_else(|| missing_capability(host, "TextScanner"))?;

        match decode_opt::<T>(PgValueFormat::Binary, src)? {
            Some(n) => scanner.scan_text(Some(&n.to_string())),
            None => scanner.scan_text(None),
        }
    }
}

fn plan_int_encode<T: WireInt>(
    format: PgValueFormat,
    value: &dyn HostValue,
) -> Option<Arc<dyn EncodePlan>> {
    if value.is::<T>() {
        return Some(native_encode_plan::<T>(format));
    }

    if value.as_int64_valuer().is_some() {
        return Some(Int64ValuerPlan::<T>::arc(format));
    }

    None
}

fn plan_int_scan<T: WireInt>(
    format: PgValueFormat,
    target: &mut dyn HostValue,
) -> Option<Arc<dyn ScanPlan>> {
    if target.is::<T>() {
        return Some(native_scan_plan::<T>(format));
    }

    if target.as_int64_scanner().is_some() {
        return Some(Int64ScannerPlan::<T>::arc(format));
    }

    if format == PgValueFormat::Binary && target.as_text_scanner().is_some() {
        return Some(Arc::new(IntTextScannerPlan::<T>(PhantomData)));
    }

    None
}

macro_rules! int_codec {
    ($(#[$meta:meta])* $codec:ident, $ty:ty, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $codec;

        impl Codec for $codec {
            fn format_supported(&self, _: PgValueFormat) -> bool {
                true
            }

            fn preferred_format(&self) -> PgValueFormat {
                PgValueFormat::Binary
            }

            fn plan_encode(
                &self,
                _: &PgTypeMap,
                _: u32,
                format: PgValueFormat,
                value: &dyn HostValue,
            ) -> Option<Arc<dyn EncodePlan>> {
                plan_int_encode::<$ty>(format, value)
            }

            fn plan_scan(
                &self,
                _: &PgTypeMap,
                _: u32,
                format: PgValueFormat,
                target: &mut dyn HostValue,
            ) -> Option<Arc<dyn ScanPlan>> {
                plan_int_scan::<$ty>(format, target)
            }

            fn decode_value(
                &self,
                _: &PgTypeMap,
                _: u32,
                format: PgValueFormat,
                src: Option<&[u8]>,
            ) -> Result<Value, BoxDynError> {
                Ok(decode_opt::<$ty>(format, src)?.map_or(Value::Null, Value::$variant))
            }

            fn decode_database_value(
                &self,
                _: &PgTypeMap,
                _: u32,
                format: PgValueFormat,
                src: Option<&[u8]>,
            ) -> Result<Value, BoxDynError> {
                Ok(decode_opt::<$ty>(format, src)?.map_or(Value::Null, |n| Value::Int8(n.into())))
            }
        }
    };
}

int_codec!(
    /// `int2` (`SMALLINT`).
    Int2Codec, i16, Int2
);
int_codec!(
    /// `int4` (`INT`).
    Int4Codec, i32, Int4
);
int_codec!(
    /// `int8` (`BIGINT`).
    Int8Codec, i64, Int8
);
int_codec!(
    /// Unsigned 32-bit identifiers: `oid`, `xid`, `cid`.
    Uint32Codec, u32, Oid
);

/// `xid8`, a 64-bit transaction id.
#[derive(Debug, Default, Clone, Copy)]
pub struct Uint64Codec;

impl Codec for Uint64Codec {
    fn format_supported(&self, _: PgValueFormat) -> bool {
        true
    }

    fn preferred_format(&self) -> PgValueFormat {
        PgValueFormat::Binary
    }

    fn plan_encode(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
    ) -> Option<Arc<dyn EncodePlan>> {
        plan_int_encode::<u64>(format, value)
    }

    fn plan_scan(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        plan_int_scan::<u64>(format, target)
    }

    fn decode_value(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        Ok(decode_opt::<u64>(format, src)?.map_or(Value::Null, Value::Uint64))
    }
}

/// The single-byte `"char"` type.
#[derive(Debug, Default, Clone, Copy)]
pub struct QCharCodec;

impl Codec for QCharCodec {
    fn format_supported(&self, _: PgValueFormat) -> bool {
        true
    }

    fn preferred_format(&self) -> PgValueFormat {
        PgValueFormat::Binary
    }

    fn plan_encode(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
    ) -> Option<Arc<dyn EncodePlan>> {
        plan_int_encode::<i8>(format, value)
    }

    fn plan_scan(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        plan_int_scan::<i8>(format, target)
    }

    fn decode_value(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        Ok(decode_opt::<i8>(format, src)?.map_or(Value::Null, Value::Char))
    }
}
