//! Anonymous `record` values.
//!
//! A record carries the OID of every field on the wire, so it can be decoded without a
//! registered composite type. PostgreSQL never accepts a record as a parameter, so this codec
//! only scans.
use std::sync::Arc;

use pgcodec_core::error::BoxDynError;

use super::composite::BinaryFields;
use crate::codec::{decode_value_for_oid, Codec};
use crate::host::HostValue;
use crate::map::PgTypeMap;
use crate::plan::{missing_capability, not_null_for, text, EncodePlan, ScanPlan};
use crate::value::{PgValueFormat, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct RecordCodec;

impl Codec for RecordCodec {
    fn format_supported(&self, format: PgValueFormat) -> bool {
        format == PgValueFormat::Binary
    }

    fn preferred_format(&self) -> PgValueFormat {
        PgValueFormat::Binary
    }

    fn plan_encode(
        &self,
        _: &PgTypeMap,
        _: u32,
        _: PgValueFormat,
        _: &dyn HostValue,
    ) -> Option<Arc<dyn EncodePlan>> {
        None
    }

    fn plan_scan(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        if format != PgValueFormat::Binary {
            return None;
        }

        target.as_composite_scanner()?;

        Some(Arc::new(RecordScanPlan))
    }

    fn decode_value(
        &self,
        map: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        let Some(src) = src else {
            return Ok(Value::Null);
        };

        if format == PgValueFormat::Text {
            return Ok(Value::Text(text(src)?.to_owned()));
        }

        let mut reader = BinaryFields::any(src)?;
        let mut fields = Vec::with_capacity(reader.len());

        while let Some((oid, field)) = reader.next_field()? {
            fields.push(decode_value_for_oid(map, oid, format, field)?);
        }

        reader.finish()?;

        Ok(Value::Record(fields))
    }
}

/// Scans each field with the plan for the OID it arrived with.
#[derive(Debug)]
struct RecordScanPlan;

impl ScanPlan for RecordScanPlan {
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let host = target.type_name();
        let src = not_null_for(src, host)?;

        let scanner = target
            .as_composite_scanner()
            .ok_or_else(|| missing_capability(host, "CompositeScanner"))?;

        let mut reader = BinaryFields::new(src, scanner.field_count())?;
        let mut i = 0;

        while let Some((oid, field)) = reader.next_field()? {
            let slot = scanner
                .scan_field(i)
                .ok_or_else(|| format!("record target has no field {i}"))?;

            map.scan_raw(oid, PgValueFormat::Binary, field, slot)?;
            i += 1;
        }

        reader.finish()
    }
}
