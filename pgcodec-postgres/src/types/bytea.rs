use std::sync::Arc;

use pgcodec_core::error::BoxDynError;

use crate::arguments::PgArgumentBuffer;
use crate::codec::Codec;
use crate::host::HostValue;
use crate::map::PgTypeMap;
use crate::plan::{EncodePlan, ScanPlan};
use crate::types::{decode_opt, native_encode_plan, native_scan_plan, WireValue};
use crate::value::{PgValueFormat, Value};

impl WireValue for Vec<u8> {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.extend_from_slice(self);
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.put_str("\\x");
        buf.put_str(&hex::encode(self));
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        Ok(src.to_vec())
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        // only the hex output format (the server default since 9.0) is understood
        let hex = src
            .strip_prefix("\\x")
            .ok_or("bytea text must use the hex format (\\x...)")?;

        Ok(hex::decode(hex)?)
    }
}

/// `bytea`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteaCodec;

impl Codec for ByteaCodec {
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
        value
            .is::<Vec<u8>>()
            .then(|| native_encode_plan::<Vec<u8>>(format))
    }

    fn plan_scan(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        target
            .is::<Vec<u8>>()
            .then(|| native_scan_plan::<Vec<u8>>(format))
    }

    fn decode_value(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        Ok(decode_opt::<Vec<u8>>(format, src)?.map_or(Value::Null, Value::Bytes))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytea_hex_text() {
        let mut buf = PgArgumentBuffer::new();
        vec![0xde_u8, 0xad, 0xbe, 0xef].encode_text(&mut buf).unwrap();
        assert_eq!(&buf[..], b"\\xdeadbeef");

        assert_eq!(Vec::<u8>::decode_text("\\x0102").unwrap(), vec![1, 2]);
        assert_eq!(Vec::<u8>::decode_text("\\x").unwrap(), Vec::<u8>::new());
        assert!(Vec::<u8>::decode_text("abc").is_err());
    }
}
