use std::ops::{Bound, Range, RangeFrom, RangeInclusive, RangeTo, RangeToInclusive};
use std::sync::Arc;

use pgcodec_core::error::{BoxDynError, Error};
use pgcodec_core::io::BufExt;
use pgcodec_core::IsNull;

use crate::arguments::PgArgumentBuffer;
use crate::codec::{decode_value_for_oid, Codec};
use crate::host::{BoundType, HostValue, RangeScanner, RangeValuer};
use crate::map::PgTypeMap;
use crate::plan::{
    encode_element, missing_capability, not_null_for, render_element, text, EncodePlan,
    ScanPlan,
};
use crate::type_info::PgType;
use crate::value::{PgValueFormat, Value};

mod parse;

pub(crate) use parse::split_multirange;
use parse::{parse_range, write_bound};

bitflags::bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    struct RangeFlags: u8 {
        const EMPTY = 0x01;
        const LB_INC = 0x02;
        const UB_INC = 0x04;
        const LB_INF = 0x08;
        const UB_INF = 0x10;
        const LB_NULL = 0x20;
        const UB_NULL = 0x40;
        const CONTAIN_EMPTY = 0x80;
    }
}

/// A PostgreSQL range.
///
/// The bound types say how each side is bounded; a bound value is only meaningful for an
/// [`Inclusive`][BoundType::Inclusive] or [`Exclusive`][BoundType::Exclusive] side. If either
/// side is [`Empty`][BoundType::Empty] both are, and the value is the empty range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PgRange<T> {
    pub lower: T,
    pub upper: T,
    pub lower_type: BoundType,
    pub upper_type: BoundType,
}

impl<T: Default> PgRange<T> {
    pub fn new(lower: Bound<T>, upper: Bound<T>) -> Self {
        let (lower, lower_type) = split_bound(lower);
        let (upper, upper_type) = split_bound(upper);

        PgRange {
            lower,
            upper,
            lower_type,
            upper_type,
        }
    }

    pub fn empty() -> Self {
        PgRange {
            lower: T::default(),
            upper: T::default(),
            lower_type: BoundType::Empty,
            upper_type: BoundType::Empty,
        }
    }
}

impl<T> PgRange<T> {
    pub fn is_empty(&self) -> bool {
        self.lower_type == BoundType::Empty
    }

    /// The lower bound, or `None` for the empty range.
    pub fn lower_bound(&self) -> Option<Bound<&T>> {
        to_bound(&self.lower, self.lower_type)
    }

    /// The upper bound, or `None` for the empty range.
    pub fn upper_bound(&self) -> Option<Bound<&T>> {
        to_bound(&self.upper, self.upper_type)
    }
}

fn split_bound<T: Default>(bound: Bound<T>) -> (T, BoundType) {
    match bound {
        Bound::Included(v) => (v, BoundType::Inclusive),
        Bound::Excluded(v) => (v, BoundType::Exclusive),
        Bound::Unbounded => (T::default(), BoundType::Unbounded),
    }
}

fn to_bound<T>(value: &T, bound_type: BoundType) -> Option<Bound<&T>> {
    match bound_type {
        BoundType::Inclusive => Some(Bound::Included(value)),
        BoundType::Exclusive => Some(Bound::Excluded(value)),
        BoundType::Unbounded => Some(Bound::Unbounded),
        BoundType::Empty => None,
    }
}

impl<T: Default> From<(Bound<T>, Bound<T>)> for PgRange<T> {
    fn from((lower, upper): (Bound<T>, Bound<T>)) -> Self {
        PgRange::new(lower, upper)
    }
}

impl<T: Default> From<Range<T>> for PgRange<T> {
    fn from(from: Range<T>) -> Self {
        PgRange::new(Bound::Included(from.start), Bound::Excluded(from.end))
    }
}

impl<T: Default> From<RangeInclusive<T>> for PgRange<T> {
    fn from(from: RangeInclusive<T>) -> Self {
        let (start, end) = from.into_inner();
        PgRange::new(Bound::Included(start), Bound::Included(end))
    }
}

impl<T: Default> From<RangeFrom<T>> for PgRange<T> {
    fn from(from: RangeFrom<T>) -> Self {
        PgRange::new(Bound::Included(from.start), Bound::Unbounded)
    }
}

impl<T: Default> From<RangeTo<T>> for PgRange<T> {
    fn from(from: RangeTo<T>) -> Self {
        PgRange::new(Bound::Unbounded, Bound::Excluded(from.end))
    }
}

impl<T: Default> From<RangeToInclusive<T>> for PgRange<T> {
    fn from(from: RangeToInclusive<T>) -> Self {
        PgRange::new(Bound::Unbounded, Bound::Included(from.end))
    }
}

impl<T> TryFrom<PgRange<T>> for Range<T> {
    type Error = Error;

    fn try_from(from: PgRange<T>) -> Result<Self, Error> {
        match (from.lower_type, from.upper_type) {
            (BoundType::Inclusive, BoundType::Exclusive) => Ok(from.lower..from.upper),
            _ => Err(Error::Decode("invalid data for core::ops::Range".into())),
        }
    }
}

impl<T> TryFrom<PgRange<T>> for RangeInclusive<T> {
    type Error = Error;

    fn try_from(from: PgRange<T>) -> Result<Self, Error> {
        match (from.lower_type, from.upper_type) {
            (BoundType::Inclusive, BoundType::Inclusive) => Ok(from.lower..=from.upper),
            _ => Err(Error::Decode("invalid data for core::ops::RangeInclusive".into())),
        }
    }
}

impl<T: HostValue + Default + 'static> RangeValuer for PgRange<T> {
    fn bound_types(&self) -> (BoundType, BoundType) {
        (self.lower_type, self.upper_type)
    }

    fn bounds(&self) -> (&dyn HostValue, &dyn HostValue) {
        (&self.lower, &self.upper)
    }

    fn bound_sample(&self) -> Box<dyn HostValue> {
        Box::new(T::default())
    }
}

impl<T: HostValue + Default + 'static> RangeScanner for PgRange<T> {
    fn set_bound_types(&mut self, lower: BoundType, upper: BoundType) -> Result<(), BoxDynError> {
        if (lower == BoundType::Empty) != (upper == BoundType::Empty) {
            return Err(format!(
                "an empty range cannot have a non-empty bound: ({lower:?}, {upper:?})"
            )
            .into());
        }

        // no stale value survives on a side without a bound
        if matches!(lower, BoundType::Unbounded | BoundType::Empty) {
            self.lower = T::default();
        }

        if matches!(upper, BoundType::Unbounded | BoundType::Empty) {
            self.upper = T::default();
        }

        self.lower_type = lower;
        self.upper_type = upper;

        Ok(())
    }

    fn scan_bounds(&mut self) -> (&mut dyn HostValue, &mut dyn HostValue) {
        (&mut self.lower, &mut self.upper)
    }

    fn bound_sample(&self) -> Box<dyn HostValue> {
        Box::new(T::default())
    }
}

impl<T: HostValue + Default + 'static> HostValue for PgRange<T> {
    crate::impl_host_any!();

    fn as_range_valuer(&self) -> Option<&dyn RangeValuer> {
        Some(self)
    }

    fn as_range_scanner(&mut self) -> Option<&mut dyn RangeScanner> {
        Some(self)
    }
}

/// Codec for a range type, delegating the bounds to the codec of its element type.
#[derive(Debug, Clone)]
pub struct RangeCodec {
    element: Arc<PgType>,
}

impl RangeCodec {
    pub fn new(element: Arc<PgType>) -> Self {
        RangeCodec { element }
    }

    pub fn element(&self) -> &Arc<PgType> {
        &self.element
    }
}

impl Codec for RangeCodec {
    fn format_supported(&self, format: PgValueFormat) -> bool {
        self.element.codec().format_supported(format)
    }

    fn preferred_format(&self) -> PgValueFormat {
        self.element.codec().preferred_format()
    }

    fn plan_encode(
        &self,
        map: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
    ) -> Option<Arc<dyn EncodePlan>> {
        let sample = value.as_range_valuer()?.bound_sample();
        let bound_plan = map.plan_encode(self.element.oid(), format, &*sample)?;

        Some(Arc::new(RangeEncodePlan { format, bound_plan }))
    }

    fn plan_scan(
        &self,
        map: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        let mut sample = target.as_range_scanner()?.bound_sample();
        let bound_plan = map.try_plan_scan(self.element.oid(), format, &mut *sample)?;

        Some(Arc::new(RangeScanPlan { format, bound_plan }))
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

        let element_oid = self.element.oid();

        let (lower_type, upper_type, lower, upper) = match format {
            PgValueFormat::Binary => {
                let raw = read_binary_range(src)?;
                (raw.lower_type, raw.upper_type, raw.lower, raw.upper)
            }
            PgValueFormat::Text => {
                let raw = parse_range(text(src)?)?;

                let lower = raw
                    .lower
                    .map(|s| decode_value_for_oid(map, element_oid, format, Some(s.as_bytes())))
                    .transpose()?;

                let upper = raw
                    .upper
                    .map(|s| decode_value_for_oid(map, element_oid, format, Some(s.as_bytes())))
                    .transpose()?;

                return Ok(Value::Range(Box::new(PgRange {
                    lower: lower.unwrap_or_default(),
                    upper: upper.unwrap_or_default(),
                    lower_type: raw.lower_type,
                    upper_type: raw.upper_type,
                })));
            }
        };

        let decode = |bound: Option<&[u8]>| match bound {
            Some(bound) => decode_value_for_oid(map, element_oid, format, Some(bound)),
            None => Ok(Value::Null),
        };

        Ok(Value::Range(Box::new(PgRange {
            lower: decode(lower)?,
            upper: decode(upper)?,
            lower_type,
            upper_type,
        })))
    }
}

/// The parts of a binary range payload.
struct BinaryRange<'a> {
    lower_type: BoundType,
    upper_type: BoundType,
    lower: Option<&'a [u8]>,
    upper: Option<&'a [u8]>,
}

fn read_binary_range(mut src: &[u8]) -> Result<BinaryRange<'_>, BoxDynError> {
    let flags = RangeFlags::from_bits_truncate(src.try_get_u8()?);

    if flags.contains(RangeFlags::EMPTY) {
        return Ok(BinaryRange {
            lower_type: BoundType::Empty,
            upper_type: BoundType::Empty,
            lower: None,
            upper: None,
        });
    }

    let mut read = |infinite: RangeFlags, inclusive: RangeFlags| {
        if flags.contains(infinite) {
            return Ok::<_, BoxDynError>((BoundType::Unbounded, None));
        }

        let bound = src
            .try_get_len_prefixed()?
            .ok_or_else(|| Error::protocol("range bound cannot be NULL"))?;

        let bound_type = if flags.contains(inclusive) {
            BoundType::Inclusive
        } else {
            BoundType::Exclusive
        };

        Ok((bound_type, Some(bound)))
    };

    let (lower_type, lower) = read(RangeFlags::LB_INF, RangeFlags::LB_INC)?;
    let (upper_type, upper) = read(RangeFlags::UB_INF, RangeFlags::UB_INC)?;

    if !src.is_empty() {
        return Err(Error::protocol(format!(
            "{} unexpected trailing bytes after range bounds",
            src.len()
        ))
        .into());
    }

    Ok(BinaryRange {
        lower_type,
        upper_type,
        lower,
        upper,
    })
}

#[derive(Debug)]
struct RangeEncodePlan {
    format: PgValueFormat,
    bound_plan: Arc<dyn EncodePlan>,
}

impl RangeEncodePlan {
    fn encode_binary(
        &self,
        map: &PgTypeMap,
        valuer: &dyn RangeValuer,
        buf: &mut PgArgumentBuffer,
    ) -> Result<(), BoxDynError> {
        let (lower_type, upper_type) = valuer.bound_types();

        if lower_type == BoundType::Empty {
            buf.push(RangeFlags::EMPTY.bits());
            return Ok(());
        }

        let mut flags = RangeFlags::empty();

        for (bound_type, inclusive, infinite) in [
            (lower_type, RangeFlags::LB_INC, RangeFlags::LB_INF),
            (upper_type, RangeFlags::UB_INC, RangeFlags::UB_INF),
        ] {
            match bound_type {
                BoundType::Inclusive => flags |= inclusive,
                BoundType::Unbounded => flags |= infinite,
                _ => {}
            }
        }

        buf.push(flags.bits());

        let (lower, upper) = valuer.bounds();

        for (bound_type, bound) in [(lower_type, lower), (upper_type, upper)] {
            if bound_type.is_unbounded() {
                continue;
            }

            buf.encode_len_prefixed(|buf| {
                let is_null = encode_element(map, &*self.bound_plan, bound, buf)?;

                if is_null.is_null() {
                    return Err("range bound cannot be NULL".into());
                }

                Ok(is_null)
            })?;
        }

        Ok(())
    }

    fn encode_text(
        &self,
        map: &PgTypeMap,
        valuer: &dyn RangeValuer,
        buf: &mut PgArgumentBuffer,
    ) -> Result<(), BoxDynError> {
        let (lower_type, upper_type) = valuer.bound_types();

        if lower_type == BoundType::Empty {
            buf.put_str("empty");
            return Ok(());
        }

        let (lower, upper) = valuer.bounds();
        let mut out = String::new();

        out.push(if lower_type == BoundType::Inclusive { '[' } else { '(' });

        for (i, (bound_type, bound)) in [(lower_type, lower), (upper_type, upper)]
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                out.push(',');
            }

            if bound_type.is_unbounded() {
                continue;
            }

            let rendered = render_element(map, &*self.bound_plan, bound)?
                .ok_or("range bound cannot be NULL")?;

            write_bound(&rendered, &mut out);
        }

        out.push(if upper_type == BoundType::Inclusive { ']' } else { ')' });

        buf.put_str(&out);

        Ok(())
    }
}

impl EncodePlan for RangeEncodePlan {
    fn encode(
        &self,
        map: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        let valuer = value
            .as_range_valuer()
            .ok_or_else(|| missing_capability(value.type_name(), "RangeValuer"))?;

        let (lower_type, upper_type) = valuer.bound_types();
        if (lower_type == BoundType::Empty) != (upper_type == BoundType::Empty) {
            return Err(format!(
                "an empty range cannot have a non-empty bound: ({lower_type:?}, {upper_type:?})"
            )
            .into());
        }

        match self.format {
            PgValueFormat::Binary => self.encode_binary(map, valuer, buf)?,
            PgValueFormat::Text => self.encode_text(map, valuer, buf)?,
        }

        Ok(IsNull::No)
    }
}

#[derive(Debug)]
struct RangeScanPlan {
    format: PgValueFormat,
    bound_plan: Arc<dyn ScanPlan>,
}

impl RangeScanPlan {
    fn scan_parts(
        &self,
        map: &PgTypeMap,
        scanner: &mut dyn RangeScanner,
        (lower_type, lower): (BoundType, Option<&[u8]>),
        (upper_type, upper): (BoundType, Option<&[u8]>),
    ) -> Result<(), BoxDynError> {
        let (lower_target, upper_target) = scanner.scan_bounds();

        if lower.is_some() {
            self.bound_plan.scan(map, lower, lower_target)?;
        }

        if upper.is_some() {
            self.bound_plan.scan(map, upper, upper_target)?;
        }

        scanner.set_bound_types(lower_type, upper_type)
    }
}

impl ScanPlan for RangeScanPlan {
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let host = target.type_name();
        let src = not_null_for(src, host)?;

        let scanner = target
            .as_range_scanner()
            .ok_or_else(|| missing_capability(host, "RangeScanner"))?;

        match self.format {
            PgValueFormat::Binary => {
                let raw = read_binary_range(src)?;

                self.scan_parts(
                    map,
                    scanner,
                    (raw.lower_type, raw.lower),
                    (raw.upper_type, raw.upper),
                )
            }

            PgValueFormat::Text => {
                let raw = parse_range(text(src)?)?;

                self.scan_parts(
                    map,
                    scanner,
                    (raw.lower_type, raw.lower.as_deref().map(str::as_bytes)),
                    (raw.upper_type, raw.upper.as_deref().map(str::as_bytes)),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn it_converts_std_ranges() {
        let range = PgRange::from(1_i32..5);
        assert_eq!(range.lower_bound(), Some(Bound::Included(&1)));
        assert_eq!(range.upper_bound(), Some(Bound::Excluded(&5)));

        let range = PgRange::from(1_i32..=5);
        assert_eq!(range.upper_type, BoundType::Inclusive);
        assert_eq!(RangeInclusive::try_from(range).unwrap(), 1..=5);

        let range = PgRange::from(..7_i64);
        assert_eq!(range.lower_type, BoundType::Unbounded);
        assert!(Range::try_from(range).is_err());

        assert_eq!(PgRange::<i32>::empty().lower_bound(), None);
    }

    #[test]
    fn it_round_trips_every_bound_combination() {
        use BoundType::*;

        let map = PgTypeMap::new();
        let sides = [Inclusive, Exclusive, Unbounded];

        for format in [PgValueFormat::Binary, PgValueFormat::Text] {
            let mut cases: Vec<PgRange<i32>> = Vec::new();

            for lower_type in sides {
                for upper_type in sides {
                    let mut range = PgRange {
                        lower: 1,
                        upper: 10,
                        lower_type,
                        upper_type,
                    };

                    // unbounded sides scan back as the default value
                    range.set_bound_types(lower_type, upper_type).unwrap();
                    cases.push(range);
                }
            }

            cases.push(PgRange::empty());

            for range in cases {
                let mut buf = PgArgumentBuffer::new();
                map.encode(oid::INT4_RANGE, format, &range, &mut buf)
                    .unwrap();

                let mut out = PgRange::<i32>::default();
                map.scan(oid::INT4_RANGE, format, Some(&buf), &mut out)
                    .unwrap();

                assert_eq!(out, range, "{format}");
            }
        }
    }

    #[test]
    fn it_encodes_text() {
        let map = PgTypeMap::new();
        let mut buf = PgArgumentBuffer::new();

        map.encode(
            oid::INT8_RANGE,
            PgValueFormat::Text,
            &PgRange::from(3_i64..),
            &mut buf,
        )
        .unwrap();
        assert_eq!(&buf[..], b"[3,)");

        buf.clear();
        map.encode(
            oid::INT8_RANGE,
            PgValueFormat::Binary,
            &PgRange::<i64>::empty(),
            &mut buf,
        )
        .unwrap();
        assert_eq!(&buf[..], [0x01]);
    }

    #[test]
    fn it_encodes_binary() {
        let map = PgTypeMap::new();
        let mut buf = PgArgumentBuffer::new();

        map.encode(
            oid::INT4_RANGE,
            PgValueFormat::Binary,
            &PgRange::from(1_i32..5),
            &mut buf,
        )
        .unwrap();

        assert_eq!(
            &buf[..],
            [0x02, 0, 0, 0, 4, 0, 0, 0, 1, 0, 0, 0, 4, 0, 0, 0, 5]
        );
    }

    #[test]
    fn it_rejects_mixed_empty_bounds() {
        let mut range = PgRange::<i32>::default();
        assert!(range
            .set_bound_types(BoundType::Empty, BoundType::Inclusive)
            .is_err());

        let map = PgTypeMap::new();
        let mut buf = PgArgumentBuffer::new();
        let mixed = PgRange {
            lower: 1_i32,
            upper: 2,
            lower_type: BoundType::Inclusive,
            upper_type: BoundType::Empty,
        };

        assert!(map
            .encode(oid::INT4_RANGE, PgValueFormat::Binary, &mixed, &mut buf)
            .is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn it_rejects_truncated_binary() {
        let map = PgTypeMap::new();
        let mut out = PgRange::<i32>::default();

        assert!(map
            .scan(
                oid::INT4_RANGE,
                PgValueFormat::Binary,
                Some(&[0x02, 0, 0, 0, 4, 0, 0]),
                &mut out
            )
            .is_err());
    }

    #[test]
    fn it_decodes_values() {
        let map = PgTypeMap::new();

        let value = map
            .decode_database_value(oid::INT4_RANGE, PgValueFormat::Text, Some(b"[1,5)"))
            .unwrap();
        assert_eq!(value, Value::Text("[1,5)".to_owned()));

        let mut value = Value::Null;
        map.scan(
            oid::INT4_RANGE,
            PgValueFormat::Text,
            Some(b"(,5]"),
            &mut value,
        )
        .unwrap();

        assert_eq!(
            value,
            Value::Range(Box::new(PgRange {
                lower: Value::Null,
                upper: Value::Int4(5),
                lower_type: BoundType::Unbounded,
                upper_type: BoundType::Inclusive,
            }))
        );
    }
}
