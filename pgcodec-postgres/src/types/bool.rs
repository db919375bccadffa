use std::sync::Arc;

use pgcodec_core::error::BoxDynError;
use pgcodec_core::IsNull;

use crate::arguments::PgArgumentBuffer;
use crate::codec::Codec;
use crate::host::HostValue;
use crate::map::PgTypeMap;
use crate::plan::{expect_len, missing_capability, EncodeFn, EncodePlan, ScanFn, ScanPlan};
use crate::types::{decode_opt, native_encode_plan, native_scan_plan, WireValue};
use crate::value::{PgValueFormat, Value};

impl WireValue for bool {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.push(u8::from(*self));
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.push(if *self { b't' } else { b'f' });
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        expect_len(src, 1, "bool")?;
        Ok(src[0] != 0)
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        match src {
            "t" | "true" | "TRUE" | "y" | "yes" | "on" | "1" => Ok(true),
            "f" | "false" | "FALSE" | "n" | "no" | "off" | "0" => Ok(false),

            s => Err(format!("unexpected value {s:?} for boolean").into()),
        }
    }
}

/// `bool`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoolCodec;

impl Codec for BoolCodec {
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
        if value.is::<bool>() {
            return Some(native_encode_plan::<bool>(format));
        }

        if value.as_bool_valuer().is_none() {
            return None;
        }

        let plan = match format {
            PgValueFormat::Binary => EncodeFn::arc("BoolValuer to bool", |_, value, buf| {
                encode_bool_valuer(value, buf, PgValueFormat::Binary)
            }),
            PgValueFormat::Text => EncodeFn::arc("BoolValuer to bool", |_, value, buf| {
                encode_bool_valuer(value, buf, PgValueFormat::Text)
            }),
        };

        Some(plan)
    }

    fn plan_scan(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        if target.is::<bool>() {
            return Some(native_scan_plan::<bool>(format));
        }

        if target.as_bool_scanner().is_none() {
            return None;
        }

        let plan = match format {
            PgValueFormat::Binary => ScanFn::arc("bool to BoolScanner", |_, src, target| {
                scan_bool_scanner(src, target, PgValueFormat::Binary)
            }),
            PgValueFormat::Text => ScanFn::arc("bool to BoolScanner", |_, src, target| {
                scan_bool_scanner(src, target, PgValueFormat::Text)
            }),
        };

        Some(plan)
    }

    fn decode_value(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        Ok(decode_opt::<bool>(format, src)?.map_or(Value::Null, Value::Bool))
    }

    fn decode_database_value(
        &self,
        map: &PgTypeMap,
        oid: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        self.decode_value(map, oid, format, src)
    }
}

fn encode_bool_valuer(
    value: &dyn HostValue,
    buf: &mut PgArgumentBuffer,
    format: PgValueFormat,
) -> Result<IsNull, BoxDynError> {
    let valuer = value
        .as_bool_valuer()
        .ok_or_else(|| missing_capability(value.type_name(), "BoolValuer"))?;

    match valuer.bool_value()? {
        Some(b) => {
            b.encode(format, buf)?;
            Ok(IsNull::No)
        }
        None => Ok(IsNull::Yes),
    }
}

fn scan_bool_scanner(
    src: Option<&[u8]>,
    target: &mut dyn HostValue,
    format: PgValueFormat,
) -> Result<(), BoxDynError> {
    let host = target.type_name();
    let scanner = target
        .as_bool_scanner()
        .ok_or_else(|| missing_capability(host, "BoolScanner"))?;

    scanner.scan_bool(decode_opt::<bool>(format, src)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_bool() {
        assert!(bool::decode_binary(&[1]).unwrap());
        assert!(!bool::decode_binary(&[0]).unwrap());
        assert!(bool::decode_binary(&[]).is_err());

        assert!(bool::decode_text("t").unwrap());
        assert!(!bool::decode_text("f").unwrap());
        assert!(bool::decode_text("maybe").is_err());
    }
}
