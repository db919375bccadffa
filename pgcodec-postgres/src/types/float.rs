use std::any::Any;
use std::fmt::{self, Debug};
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

pub(crate) trait WireFloat: WireValue + Copy + Debug + Any + Send + Sync {
    const PG_NAME: &'static str;

    fn from_f64(v: f64) -> Self;

    fn to_f64(self) -> f64;
}

fn encode_float_text(v: f64, buf: &mut PgArgumentBuffer) {
    if v.is_nan() {
        buf.put_str("NaN");
    } else if v.is_infinite() {
        buf.put_str(if v > 0.0 { "Infinity" } else { "-Infinity" });
    } else {
        buf.put_str(&v.to_string());
    }
}

fn decode_float_text<T: std::str::FromStr>(src: &str) -> Result<T, BoxDynError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    // Rust spells these `NaN`, `inf` and `-inf`
    let src = match src {
        "Infinity" => "inf",
        "-Infinity" => "-inf",
        s => s,
    };

    Ok(src.parse()?)
}

impl WireValue for f32 {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.extend(&self.to_be_bytes());
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        if self.is_finite() {
            buf.put_str(&self.to_string());
        } else {
            encode_float_text(f64::from(*self), buf);
        }
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        expect_len(src, 4, "float4")?;
        Ok(BigEndian::read_f32(src))
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        decode_float_text(src)
    }
}

impl WireFloat for f32 {
    const PG_NAME: &'static str = "float4";

    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl WireValue for f64 {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.extend(&self.to_be_bytes());
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        encode_float_text(*self, buf);
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        expect_len(src, 8, "float8")?;
        Ok(BigEndian::read_f64(src))
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        decode_float_text(src)
    }
}

impl WireFloat for f64 {
    const PG_NAME: &'static str = "float8";

    fn from_f64(v: f64) -> Self {
        v
    }

    fn to_f64(self) -> f64 {
        self
    }
}

/// Converts a float to `i64` when it is integral and in range.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn float_to_int64(v: f64) -> Result<i64, BoxDynError> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if v.fract() != 0.0 || !(-LIMIT..LIMIT).contains(&v) {
        return Err(Error::overflow(format!("cannot convert {v} to int8 without loss")).into());
    }

    Ok(v as i64)
}

#[derive(Debug, Copy, Clone)]
enum Source {
    Float64Valuer,
    Int64Valuer,
}

struct FloatEncodePlan<T> {
    source: Source,
    format: PgValueFormat,
    marker: PhantomData<fn() -> T>,
}

impl<T: WireFloat> Debug for FloatEncodePlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FloatEncodePlan")
            .field("wire", &T::PG_NAME)
            .field("source", &self.source)
            .field("format", &self.format)
            .finish()
    }
}

impl<T: WireFloat> EncodePlan for FloatEncodePlan<T> {
    #[allow(clippy::cast_precision_loss)]
    fn encode(
        &self,
        _: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        let v = match self.source {
            Source::Float64Valuer => value
                .as_float64_valuer()
                .ok_or_else(|| missing_capability(value.type_name(), "Float64Valuer"))?
                .float64_value()?,
            Source::Int64Valuer => value
                .as_int64_valuer()
                .ok_or_else(|| missing_capability(value.type_name(), "Int64Valuer"))?
                .int64_value()?
                .map(|n| n as f64),
        };

        let Some(v) = v else {
            return Ok(IsNull::Yes);
        };

        T::from_f64(v).encode(self.format, buf)?;

        Ok(IsNull::No)
    }
}

#[derive(Debug, Copy, Clone)]
enum Sink {
    Float64Scanner,
    Int64Scanner,
}

struct FloatScanPlan<T> {
    sink: Sink,
    format: PgValueFormat,
    marker: PhantomData<fn() -> T>,
}

impl<T: WireFloat> Debug for FloatScanPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FloatScanPlan")
            .field("wire", &T::PG_NAME)
            .field("sink", &self.sink)
            .field("format", &self.format)
            .finish()
    }
}

impl<T: WireFloat> ScanPlan for FloatScanPlan<T> {
    fn scan(
        &self,
        _: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let v = decode_opt::<T>(self.format, src)?.map(T::to_f64);
        let host = target.type_name();

        match self.sink {
            Sink::Float64Scanner => target
                .as_float64_scanner()
                .ok_or_else(|| missing_capability(host, "Float64Scanner"))?
                .scan_float64(v),
            Sink::Int64Scanner => {
                let n = v.map(float_to_int64).transpose()?;

                target
                    .as_int64_scanner()
                    .ok_or_else(|| missing_capability(host, "Int64Scanner"))?
                    .scan_int64(n)
            }
        }
    }
}

fn plan_float_encode<T: WireFloat>(
    format: PgValueFormat,
    value: &dyn HostValue,
) -> Option<Arc<dyn EncodePlan>> {
    if value.is::<T>() {
        return Some(native_encode_plan::<T>(format));
    }

    let source = if value.as_float64_valuer().is_some() {
        Source::Float64Valuer
    } else if value.as_int64_valuer().is_some() {
        Source::Int64Valuer
    } else {
        return None;
    };

    Some(Arc::new(FloatEncodePlan::<T> {
        source,
        format,
        marker: PhantomData,
    }))
}

fn plan_float_scan<T: WireFloat>(
    format: PgValueFormat,
    target: &mut dyn HostValue,
) -> Option<Arc<dyn ScanPlan>> {
    if target.is::<T>() {
        return Some(native_scan_plan::<T>(format));
    }

    let sink = if target.as_float64_scanner().is_some() {
        Sink::Float64Scanner
    } else if target.as_int64_scanner().is_some() {
        Sink::Int64Scanner
    } else {
        return None;
    };

    Some(Arc::new(FloatScanPlan::<T> {
        sink,
        format,
        marker: PhantomData,
    }))
}

macro_rules! float_codec {
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
                plan_float_encode::<$ty>(format, value)
            }

            fn plan_scan(
                &self,
                _: &PgTypeMap,
                _: u32,
                format: PgValueFormat,
                target: &mut dyn HostValue,
            ) -> Option<Arc<dyn ScanPlan>> {
                plan_float_scan::<$ty>(format, target)
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
                Ok(decode_opt::<$ty>(format, src)?
                    .map_or(Value::Null, |v| Value::Float8(v.to_f64())))
            }
        }
    };
}

float_codec!(
    /// `float4` (`REAL`).
    Float4Codec, f32, Float4
);
float_codec!(
    /// `float8` (`DOUBLE PRECISION`).
    Float8Codec, f64, Float8
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_values_text() {
        let mut buf = PgArgumentBuffer::new();
        f64::NEG_INFINITY.encode_text(&mut buf).unwrap();
        assert_eq!(&buf[..], b"-Infinity");

        assert!(f64::decode_text("NaN").unwrap().is_nan());
        assert_eq!(f32::decode_text("Infinity").unwrap(), f32::INFINITY);
        assert_eq!(f64::decode_text("-1.5").unwrap(), -1.5);
    }

    #[test]
    fn test_float4_binary() {
        let mut buf = PgArgumentBuffer::new();
        1.5_f32.encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x3f, 0xc0, 0, 0]);
        assert_eq!(f32::decode_binary(&buf).unwrap(), 1.5);
    }

    #[test]
    fn test_float_to_int64() {
        assert_eq!(float_to_int64(-3.0).unwrap(), -3);
        assert!(float_to_int64(0.5).is_err());
        assert!(float_to_int64(f64::INFINITY).is_err());
    }
}
