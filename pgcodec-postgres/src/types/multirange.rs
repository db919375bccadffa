//! Multiranges: ordered lists of ranges, kept exactly as given.
use std::sync::Arc;

use pgcodec_core::error::{BoxDynError, Error};
use pgcodec_core::io::BufExt;
use pgcodec_core::IsNull;

use crate::arguments::{put_len, PgArgumentBuffer};
use crate::codec::{decode_value_for_oid, Codec};
use crate::host::{HostValue, MultirangeGetter, MultirangeSetter};
use crate::map::PgTypeMap;
use crate::plan::{
    encode_element, missing_capability, not_null_for, render_element, text, EncodePlan,
    ScanPlan,
};
use crate::type_info::PgType;
use crate::types::range::split_multirange;
use crate::types::PgRange;
use crate::value::{PgValueFormat, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct PgMultirange<T>(pub Vec<PgRange<T>>);

impl<T> Default for PgMultirange<T> {
    fn default() -> Self {
        PgMultirange(Vec::new())
    }
}

impl<T> From<Vec<PgRange<T>>> for PgMultirange<T> {
    fn from(ranges: Vec<PgRange<T>>) -> Self {
        PgMultirange(ranges)
    }
}

impl<T: HostValue + Default + 'static> MultirangeGetter for PgMultirange<T> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn index(&self, i: usize) -> Option<&dyn HostValue> {
        self.0.get(i).map(|r| r as &dyn HostValue)
    }

    fn index_type(&self) -> Box<dyn HostValue> {
        Box::new(PgRange::<T>::default())
    }
}

impl<T: HostValue + Default + 'static> MultirangeSetter for PgMultirange<T> {
    fn set_len(&mut self, n: usize) -> Result<(), BoxDynError> {
        self.0.clear();
        self.0.resize_with(n, PgRange::default);
        Ok(())
    }

    fn scan_index(&mut self, i: usize) -> Option<&mut dyn HostValue> {
        self.0.get_mut(i).map(|r| r as &mut dyn HostValue)
    }

    fn scan_index_type(&self) -> Box<dyn HostValue> {
        Box::new(PgRange::<T>::default())
    }
}

impl<T: HostValue + Default + 'static> HostValue for PgMultirange<T> {
    crate::impl_host_any!();

    fn as_multirange_getter(&self) -> Option<&dyn MultirangeGetter> {
        Some(self)
    }

    fn as_multirange_setter(&mut self) -> Option<&mut dyn MultirangeSetter> {
        Some(self)
    }
}

/// Codec for a multirange type, delegating each range to the codec of its range type.
#[derive(Debug, Clone)]
pub struct MultirangeCodec {
    range: Arc<PgType>,
}

impl MultirangeCodec {
    pub fn new(range: Arc<PgType>) -> Self {
        MultirangeCodec { range }
    }

    pub fn range(&self) -> &Arc<PgType> {
        &self.range
    }
}

impl Codec for MultirangeCodec {
    fn format_supported(&self, format: PgValueFormat) -> bool {
        self.range.codec().format_supported(format)
    }

    fn preferred_format(&self) -> PgValueFormat {
        self.range.codec().preferred_format()
    }

    fn plan_encode(
        &self,
        map: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
    ) -> Option<Arc<dyn EncodePlan>> {
        let sample = value.as_multirange_getter()?.index_type();
        let range_plan = map.plan_encode(self.range.oid(), format, &*sample)?;

        Some(Arc::new(MultirangeEncodePlan { format, range_plan }))
    }

    fn plan_scan(
        &self,
        map: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        let mut sample = target.as_multirange_setter()?.scan_index_type();
        let range_plan = map.try_plan_scan(self.range.oid(), format, &mut *sample)?;

        Some(Arc::new(MultirangeScanPlan { format, range_plan }))
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

        let range_oid = self.range.oid();

        let payloads = read_ranges(format, src)?;

        let mut ranges = Vec::with_capacity(payloads.len());
        for range in payloads {
            match decode_value_for_oid(map, range_oid, format, Some(range))? {
                Value::Range(range) => ranges.push(*range),
                other => return Err(format!("multirange element decoded to {other:?}").into()),
            }
        }

        Ok(Value::Multirange(PgMultirange(ranges)))
    }
}

/// Split `src` into the payloads of its ranges.
fn read_ranges(format: PgValueFormat, mut src: &[u8]) -> Result<Vec<&[u8]>, BoxDynError> {
    match format {
        PgValueFormat::Binary => {
            let count = src.try_get_i32()?;
            let count = usize::try_from(count)
                .map_err(|_| Error::protocol(format!("invalid multirange length: {count}")))?;

            // every range takes at least its 4-byte length
            if count > src.len() / 4 {
                return Err(Error::protocol(format!(
                    "multirange declares {count} ranges but only {} bytes remain",
                    src.len()
                ))
                .into());
            }

            let mut ranges = Vec::with_capacity(count);
            for _ in 0..count {
                let range = src
                    .try_get_len_prefixed()?
                    .ok_or_else(|| Error::protocol("multirange element cannot be NULL"))?;

                ranges.push(range);
            }

            if !src.is_empty() {
                return Err(Error::protocol(format!(
                    "{} unexpected trailing bytes after multirange elements",
                    src.len()
                ))
                .into());
            }

            Ok(ranges)
        }

        PgValueFormat::Text => Ok(split_multirange(text(src)?)?
            .into_iter()
            .map(str::as_bytes)
            .collect()),
    }
}

#[derive(Debug)]
struct MultirangeEncodePlan {
    format: PgValueFormat,
    range_plan: Arc<dyn EncodePlan>,
}

impl EncodePlan for MultirangeEncodePlan {
    fn encode(
        &self,
        map: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        let getter = value
            .as_multirange_getter()
            .ok_or_else(|| missing_capability(value.type_name(), "MultirangeGetter"))?;

        let range = |i: usize| {
            getter
                .index(i)
                .ok_or_else(|| BoxDynError::from(format!("multirange element {i} is missing")))
        };

        match self.format {
            PgValueFormat::Binary => {
                put_len(buf, getter.len())?;

                for i in 0..getter.len() {
                    let element = range(i)?;

                    buf.encode_len_prefixed(|buf| {
                        let is_null = encode_element(map, &*self.range_plan, element, buf)?;

                        if is_null.is_null() {
                            return Err("multirange element cannot be NULL".into());
                        }

                        Ok(is_null)
                    })?;
                }
            }

            PgValueFormat::Text => {
                let mut out = String::from("{");

                for i in 0..getter.len() {
                    if i > 0 {
                        out.push(',');
                    }

                    let rendered = render_element(map, &*self.range_plan, range(i)?)?
                        .ok_or("multirange element cannot be NULL")?;

                    out.push_str(&rendered);
                }

                out.push('}');
                buf.put_str(&out);
            }
        }

        Ok(IsNull::No)
    }
}

#[derive(Debug)]
struct MultirangeScanPlan {
    format: PgValueFormat,
    range_plan: Arc<dyn ScanPlan>,
}

impl ScanPlan for MultirangeScanPlan {
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let host = target.type_name();
        let src = not_null_for(src, host)?;

        let setter = target
            .as_multirange_setter()
            .ok_or_else(|| missing_capability(host, "MultirangeSetter"))?;

        let ranges = read_ranges(self.format, src)?;
        setter.set_len(ranges.len())?;

        for (i, range) in ranges.into_iter().enumerate() {
            let slot = setter
                .scan_index(i)
                .ok_or_else(|| format!("multirange target has no element {i}"))?;

            self.range_plan.scan(map, Some(range), slot)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BoundType;
    use crate::oid;

    fn sample() -> PgMultirange<i32> {
        PgMultirange(vec![
            PgRange::from(1..3),
            PgRange::from(5..=7),
            PgRange::from(10..),
        ])
    }

    #[test]
    fn it_round_trips_in_order() {
        let map = PgTypeMap::new();

        for format in [PgValueFormat::Binary, PgValueFormat::Text] {
            let mut buf = PgArgumentBuffer::new();
            map.encode(oid::INT4_MULTIRANGE, format, &sample(), &mut buf)
                .unwrap();

            let mut out = PgMultirange::<i32>::default();
            map.scan(oid::INT4_MULTIRANGE, format, Some(&buf), &mut out)
                .unwrap();

            assert_eq!(out, sample(), "{format}");
        }
    }

    #[test]
    fn it_encodes_text() {
        let map = PgTypeMap::new();
        let mut buf = PgArgumentBuffer::new();

        map.encode(oid::INT4_MULTIRANGE, PgValueFormat::Text, &sample(), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"{[1,3),[5,7],[10,)}");

        buf.clear();
        map.encode(
            oid::INT4_MULTIRANGE,
            PgValueFormat::Text,
            &PgMultirange::<i32>::default(),
            &mut buf,
        )
        .unwrap();
        assert_eq!(&buf[..], b"{}");
    }

    #[test]
    fn it_decodes_values() {
        let map = PgTypeMap::new();
        let mut value = Value::Null;

        map.scan(
            oid::INT4_MULTIRANGE,
            PgValueFormat::Text,
            Some(b"{[1,3), empty}"),
            &mut value,
        )
        .unwrap();

        let Value::Multirange(multirange) = value else {
            panic!("expected a multirange");
        };

        assert_eq!(multirange.0.len(), 2);
        assert_eq!(multirange.0[0].lower, Value::Int4(1));
        assert_eq!(multirange.0[1].lower_type, BoundType::Empty);
    }

    #[test]
    fn it_rejects_bad_counts() {
        let map = PgTypeMap::new();
        let mut out = PgMultirange::<i32>::default();

        assert!(map
            .scan(
                oid::INT4_MULTIRANGE,
                PgValueFormat::Binary,
                Some(&[0x7f, 0xff, 0xff, 0xff]),
                &mut out
            )
            .is_err());
    }
}
