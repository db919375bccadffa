//! Adapters for bare standard library and `chrono` values.
//!
//! Integers, floats, booleans and strings are wrapped in small adapters that expose the
//! `Int64`/`Float64`/`Bool`/`Text` capabilities. Date, time, network, map and UUID values are
//! converted to the crate's own wire types instead.
use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use ipnetwork::IpNetwork;
use pgcodec_core::error::{unexpected_null, BoxDynError, Error};
use uuid::Uuid;

use crate::host::{
    BoolScanner, BoolValuer, Float64Scanner, Float64Valuer, HostValue, Int64Scanner,
    Int64Valuer, TextScanner, TextValuer,
};
use crate::map::PgTypeMap;
use crate::plan::{target_mut, value_ref, ScanPlan};
use crate::types::{
    float_to_int64, PgDate, PgHstore, PgInterval, PgTime, PgTimestamp, PgTimestamptz,
};
use crate::value::PgValueFormat;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BuiltinKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Isize,
    Usize,
    F32,
    F64,
    Bool,
    String,
    Str,
    Date,
    DateTime,
    Time,
    DateTimeUtc,
    TimeDelta,
    IpAddr,
    Hstore,
    StringMap,
    Uuid,
}

impl BuiltinKind {
    pub(crate) fn of(value: &dyn HostValue) -> Option<Self> {
        let id = value.host_type_id()?;

        macro_rules! kinds {
            ($($ty:ty => $kind:ident),+ $(,)?) => {
                $(
                    if id == TypeId::of::<$ty>() {
                        return Some(BuiltinKind::$kind);
                    }
                )+
            };
        }

        kinds!(
            i8 => I8,
            u8 => U8,
            i16 => I16,
            u16 => U16,
            i32 => I32,
            u32 => U32,
            i64 => I64,
            u64 => U64,
            isize => Isize,
            usize => Usize,
            f32 => F32,
            f64 => F64,
            bool => Bool,
            String => String,
            &'static str => Str,
            NaiveDate => Date,
            NaiveDateTime => DateTime,
            NaiveTime => Time,
            DateTime<Utc> => DateTimeUtc,
            TimeDelta => TimeDelta,
            IpAddr => IpAddr,
            HashMap<String, Option<String>> => Hstore,
            HashMap<String, String> => StringMap,
            [u8; 16] => Uuid,
        );

        None
    }

    /// Adapt `value` for the next plan.
    pub(crate) fn adapt<'v>(
        self,
        value: &'v dyn HostValue,
    ) -> Result<Box<dyn HostValue + 'v>, BoxDynError> {
        Ok(match self {
            BuiltinKind::I8 => Box::new(IntValue(i64::from(*value_ref::<i8>(value)?))),
            BuiltinKind::U8 => Box::new(IntValue(i64::from(*value_ref::<u8>(value)?))),
            BuiltinKind::I16 => Box::new(IntValue(i64::from(*value_ref::<i16>(value)?))),
            BuiltinKind::U16 => Box::new(IntValue(i64::from(*value_ref::<u16>(value)?))),
            BuiltinKind::I32 => Box::new(IntValue(i64::from(*value_ref::<i32>(value)?))),
            BuiltinKind::U32 => Box::new(IntValue(i64::from(*value_ref::<u32>(value)?))),
            BuiltinKind::I64 => Box::new(IntValue(*value_ref::<i64>(value)?)),
            BuiltinKind::U64 => Box::new(UintValue(*value_ref::<u64>(value)?)),
            BuiltinKind::Isize => Box::new(IntValue(i64::try_from(*value_ref::<isize>(value)?)?)),
            BuiltinKind::Usize => Box::new(UintValue(u64::try_from(*value_ref::<usize>(value)?)?)),
            BuiltinKind::F32 => Box::new(FloatValue(f64::from(*value_ref::<f32>(value)?))),
            BuiltinKind::F64 => Box::new(FloatValue(*value_ref::<f64>(value)?)),
            BuiltinKind::Bool => Box::new(BoolValue(*value_ref::<bool>(value)?)),
            BuiltinKind::String => Box::new(StrValue(value_ref::<String>(value)?)),
            BuiltinKind::Str => Box::new(StrValue(value_ref::<&'static str>(value)?)),
            BuiltinKind::Date => Box::new(PgDate::Finite(*value_ref::<NaiveDate>(value)?)),
            BuiltinKind::DateTime => {
                Box::new(PgTimestamp::Finite(*value_ref::<NaiveDateTime>(value)?))
            }
            BuiltinKind::Time => Box::new(PgTime::from(*value_ref::<NaiveTime>(value)?)),
            BuiltinKind::DateTimeUtc => {
                Box::new(PgTimestamptz::Finite(*value_ref::<DateTime<Utc>>(value)?))
            }
            BuiltinKind::TimeDelta => Box::new(PgInterval::try_from(*value_ref::<TimeDelta>(value)?)?),
            BuiltinKind::IpAddr => Box::new(IpNetwork::from(*value_ref::<IpAddr>(value)?)),
            BuiltinKind::Hstore => Box::new(
                value_ref::<HashMap<String, Option<String>>>(value)?
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<PgHstore>(),
            ),
            BuiltinKind::StringMap => Box::new(
                value_ref::<HashMap<String, String>>(value)?
                    .iter()
                    .map(|(k, v)| (k.clone(), Some(v.clone())))
                    .collect::<PgHstore>(),
            ),
            BuiltinKind::Uuid => Box::new(Uuid::from_bytes(*value_ref::<[u8; 16]>(value)?)),
        })
    }

    /// Plan the scan the adapter for `target` will be handed to.
    pub(crate) fn plan_scan(
        self,
        map: &PgTypeMap,
        oid: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
        depth: usize,
    ) -> Option<Arc<dyn ScanPlan>> {
        macro_rules! plan_with {
            ($adapter:expr) => {{
                let mut adapter = $adapter;
                map.resolve_scan(oid, format, &mut adapter, depth + 1)
            }};
        }

        match self {
            BuiltinKind::I8 => plan_with!(IntTarget(target.downcast_mut::<i8>()?)),
            BuiltinKind::U8 => plan_with!(IntTarget(target.downcast_mut::<u8>()?)),
            BuiltinKind::I16 => plan_with!(IntTarget(target.downcast_mut::<i16>()?)),
            BuiltinKind::U16 => plan_with!(IntTarget(target.downcast_mut::<u16>()?)),
            BuiltinKind::I32 => plan_with!(IntTarget(target.downcast_mut::<i32>()?)),
            BuiltinKind::U32 => plan_with!(IntTarget(target.downcast_mut::<u32>()?)),
            BuiltinKind::I64 => plan_with!(IntTarget(target.downcast_mut::<i64>()?)),
            BuiltinKind::U64 => plan_with!(IntTarget(target.downcast_mut::<u64>()?)),
            BuiltinKind::Isize => plan_with!(IntTarget(target.downcast_mut::<isize>()?)),
            BuiltinKind::Usize => plan_with!(IntTarget(target.downcast_mut::<usize>()?)),
            BuiltinKind::F32 => plan_with!(FloatTarget::F32(target.downcast_mut::<f32>()?)),
            BuiltinKind::F64 => plan_with!(FloatTarget::F64(target.downcast_mut::<f64>()?)),
            BuiltinKind::Bool => plan_with!(BoolTarget(target.downcast_mut::<bool>()?)),
            BuiltinKind::String => plan_with!(StringTarget(target.downcast_mut::<String>()?)),
            BuiltinKind::Date => plan_with!(PgDate::default()),
            BuiltinKind::DateTime => plan_with!(PgTimestamp::default()),
            BuiltinKind::Time => plan_with!(PgTime::default()),
            BuiltinKind::DateTimeUtc => plan_with!(PgTimestamptz::default()),
            BuiltinKind::TimeDelta => plan_with!(PgInterval::default()),
            BuiltinKind::IpAddr => plan_with!(unspecified_network()),
            BuiltinKind::Hstore | BuiltinKind::StringMap => plan_with!(PgHstore::default()),
            BuiltinKind::Uuid => plan_with!(Uuid::nil()),
            BuiltinKind::Str => None,
        }
    }

    pub(crate) fn scan(
        self,
        next: &dyn ScanPlan,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        macro_rules! scan_with {
            ($adapter:expr) => {{
                let mut adapter = $adapter;
                next.scan(map, src, &mut adapter)
            }};
        }

        match self {
            BuiltinKind::I8 => scan_with!(IntTarget(target_mut::<i8>(target)?)),
            BuiltinKind::U8 => scan_with!(IntTarget(target_mut::<u8>(target)?)),
            BuiltinKind::I16 => scan_with!(IntTarget(target_mut::<i16>(target)?)),
            BuiltinKind::U16 => scan_with!(IntTarget(target_mut::<u16>(target)?)),
            BuiltinKind::I32 => scan_with!(IntTarget(target_mut::<i32>(target)?)),
            BuiltinKind::U32 => scan_with!(IntTarget(target_mut::<u32>(target)?)),
            BuiltinKind::I64 => scan_with!(IntTarget(target_mut::<i64>(target)?)),
            BuiltinKind::U64 => scan_with!(IntTarget(target_mut::<u64>(target)?)),
            BuiltinKind::Isize => scan_with!(IntTarget(target_mut::<isize>(target)?)),
            BuiltinKind::Usize => scan_with!(IntTarget(target_mut::<usize>(target)?)),
            BuiltinKind::F32 => scan_with!(FloatTarget::F32(target_mut::<f32>(target)?)),
            BuiltinKind::F64 => scan_with!(FloatTarget::F64(target_mut::<f64>(target)?)),
            BuiltinKind::Bool => scan_with!(BoolTarget(target_mut::<bool>(target)?)),
            BuiltinKind::String => scan_with!(StringTarget(target_mut::<String>(target)?)),
            BuiltinKind::Date => {
                scan_via(next, map, src, target, PgDate::default(), NaiveDate::try_from)
            }
            BuiltinKind::DateTime => scan_via(
                next,
                map,
                src,
                target,
                PgTimestamp::default(),
                NaiveDateTime::try_from,
            ),
            BuiltinKind::Time => {
                scan_via(next, map, src, target, PgTime::default(), NaiveTime::try_from)
            }
            BuiltinKind::DateTimeUtc => scan_via(
                next,
                map,
                src,
                target,
                PgTimestamptz::default(),
                DateTime::<Utc>::try_from,
            ),
            BuiltinKind::TimeDelta => {
                scan_via(next, map, src, target, PgInterval::default(), TimeDelta::try_from)
            }
            BuiltinKind::IpAddr => scan_via(next, map, src, target, unspecified_network(), |net| {
                if net.prefix() != max_prefix(&net) {
                    return Err(format!("cannot scan network {net} into an IP address").into());
                }

                Ok(net.ip())
            }),
            BuiltinKind::Hstore => scan_via(next, map, src, target, PgHstore::default(), |h| {
                Ok(h.into_iter().collect::<HashMap<String, Option<String>>>())
            }),
            BuiltinKind::StringMap => scan_via(next, map, src, target, PgHstore::default(), |h| {
                h.into_iter()
                    .map(|(k, v)| match v {
                        Some(v) => Ok((k, v)),
                        None => Err(format!("hstore key {k:?} has a NULL value").into()),
                    })
                    .collect::<Result<HashMap<String, String>, BoxDynError>>()
            }),
            BuiltinKind::Uuid => {
                scan_via(next, map, src, target, Uuid::nil(), |u| Ok(u.into_bytes()))
            }
            BuiltinKind::Str => Err(format!("cannot scan into {}", type_name::<&str>()).into()),
        }
    }
}

fn max_prefix(net: &IpNetwork) -> u8 {
    match net {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    }
}

/// `0.0.0.0/32`, the scratch value networks are scanned into.
fn unspecified_network() -> IpNetwork {
    IpNetwork::from(IpAddr::from([0, 0, 0, 0]))
}

/// Scan into a scratch `S`, then convert it and store it in the `T` target.
fn scan_via<S, T>(
    next: &dyn ScanPlan,
    map: &PgTypeMap,
    src: Option<&[u8]>,
    target: &mut dyn HostValue,
    mut scratch: S,
    convert: impl FnOnce(S) -> Result<T, BoxDynError>,
) -> Result<(), BoxDynError>
where
    S: HostValue + 'static,
    T: Any,
{
    if src.is_none() {
        return Err(unexpected_null::<T>());
    }

    next.scan(map, src, &mut scratch)?;

    *target_mut::<T>(target)? = convert(scratch)?;

    Ok(())
}

#[derive(Debug)]
struct IntValue(i64);

impl Int64Valuer for IntValue {
    fn int64_value(&self) -> Result<Option<i64>, BoxDynError> {
        Ok(Some(self.0))
    }
}

impl HostValue for IntValue {
    crate::impl_host_any!();

    fn as_int64_valuer(&self) -> Option<&dyn Int64Valuer> {
        Some(self)
    }
}

#[derive(Debug)]
struct UintValue(u64);

impl Int64Valuer for UintValue {
    fn int64_value(&self) -> Result<Option<i64>, BoxDynError> {
        let n = self.0;

        i64::try_from(n)
            .map(Some)
            .map_err(|_| Error::overflow(format!("{n} is greater than maximum value for int8")).into())
    }
}

impl HostValue for UintValue {
    crate::impl_host_any!();

    fn as_int64_valuer(&self) -> Option<&dyn Int64Valuer> {
        Some(self)
    }
}

#[derive(Debug)]
struct FloatValue(f64);

impl Float64Valuer for FloatValue {
    fn float64_value(&self) -> Result<Option<f64>, BoxDynError> {
        Ok(Some(self.0))
    }
}

impl Int64Valuer for FloatValue {
    fn int64_value(&self) -> Result<Option<i64>, BoxDynError> {
        float_to_int64(self.0).map(Some)
    }
}

impl HostValue for FloatValue {
    crate::impl_host_any!();

    fn as_float64_valuer(&self) -> Option<&dyn Float64Valuer> {
        Some(self)
    }

    fn as_int64_valuer(&self) -> Option<&dyn Int64Valuer> {
        Some(self)
    }
}

#[derive(Debug)]
struct BoolValue(bool);

impl BoolValuer for BoolValue {
    fn bool_value(&self) -> Result<Option<bool>, BoxDynError> {
        Ok(Some(self.0))
    }
}

impl HostValue for BoolValue {
    crate::impl_host_any!();

    fn as_bool_valuer(&self) -> Option<&dyn BoolValuer> {
        Some(self)
    }
}

#[derive(Debug)]
struct StrValue<'a>(&'a str);

impl TextValuer for StrValue<'_> {
    fn text_value(&self) -> Result<Option<Cow<'_, str>>, BoxDynError> {
        Ok(Some(Cow::Borrowed(self.0)))
    }
}

impl HostValue for StrValue<'_> {
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn as_text_valuer(&self) -> Option<&dyn TextValuer> {
        Some(self)
    }
}

#[derive(Debug)]
struct IntTarget<'t, T>(&'t mut T);

impl<T> Int64Scanner for IntTarget<'_, T>
where
    T: TryFrom<i64>,
{
    fn scan_int64(&mut self, v: Option<i64>) -> Result<(), BoxDynError> {
        let v = v.ok_or_else(unexpected_null::<T>)?;

        *self.0 = T::try_from(v).map_err(|_| {
            let bound = if v < 0 { "less than minimum" } else { "greater than maximum" };
            Error::overflow(format!("{v} is {bound} value for {}", type_name::<T>()))
        })?;

        Ok(())
    }
}

impl<T> HostValue for IntTarget<'_, T>
where
    T: TryFrom<i64> + Debug,
{
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_int64_scanner(&mut self) -> Option<&mut dyn Int64Scanner> {
        Some(self)
    }
}

#[derive(Debug)]
enum FloatTarget<'t> {
    F32(&'t mut f32),
    F64(&'t mut f64),
}

impl Float64Scanner for FloatTarget<'_> {
    #[allow(clippy::cast_possible_truncation)]
    fn scan_float64(&mut self, v: Option<f64>) -> Result<(), BoxDynError> {
        match self {
            FloatTarget::F32(t) => **t = v.ok_or_else(unexpected_null::<f32>)? as f32,
            FloatTarget::F64(t) => **t = v.ok_or_else(unexpected_null::<f64>)?,
        }

        Ok(())
    }
}

impl Int64Scanner for FloatTarget<'_> {
    #[allow(clippy::cast_precision_loss)]
    fn scan_int64(&mut self, v: Option<i64>) -> Result<(), BoxDynError> {
        self.scan_float64(v.map(|v| v as f64))
    }
}

impl HostValue for FloatTarget<'_> {
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn type_name(&self) -> &'static str {
        match self {
            FloatTarget::F32(_) => "f32",
            FloatTarget::F64(_) => "f64",
        }
    }

    fn as_float64_scanner(&mut self) -> Option<&mut dyn Float64Scanner> {
        Some(self)
    }

    fn as_int64_scanner(&mut self) -> Option<&mut dyn Int64Scanner> {
        Some(self)
    }
}

#[derive(Debug)]
struct BoolTarget<'t>(&'t mut bool);

impl BoolScanner for BoolTarget<'_> {
    fn scan_bool(&mut self, v: Option<bool>) -> Result<(), BoxDynError> {
        *self.0 = v.ok_or_else(unexpected_null::<bool>)?;
        Ok(())
    }
}

impl HostValue for BoolTarget<'_> {
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn as_bool_scanner(&mut self) -> Option<&mut dyn BoolScanner> {
        Some(self)
    }
}

#[derive(Debug)]
struct StringTarget<'t>(&'t mut String);

impl TextScanner for StringTarget<'_> {
    fn scan_text(&mut self, v: Option<&str>) -> Result<(), BoxDynError> {
        let v = v.ok_or_else(unexpected_null::<String>)?;

        self.0.clear();
        self.0.push_str(v);

        Ok(())
    }
}

impl HostValue for StringTarget<'_> {
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn type_name(&self) -> &'static str {
        type_name::<String>()
    }

    fn as_text_scanner(&mut self) -> Option<&mut dyn TextScanner> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_above_int8_max_overflows() {
        let err = UintValue(u64::MAX).int64_value().unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Overflow(_))));
        assert_eq!(
            err.to_string(),
            "18446744073709551615 is greater than maximum value for int8"
        );

        assert_eq!(UintValue(42).int64_value().unwrap(), Some(42));
    }

    #[test]
    fn int_target_checks_range() {
        let mut small = 0_i16;
        let mut target = IntTarget(&mut small);

        let err = target.scan_int64(Some(40_000)).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Overflow(_))));
        assert!(target.scan_int64(Some(-40_000)).is_err());
        assert!(target.scan_int64(None).is_err());

        target.scan_int64(Some(-7)).unwrap();
        assert_eq!(small, -7);
    }

    #[test]
    fn float_to_int_requires_integral_value() {
        assert_eq!(FloatValue(12.0).int64_value().unwrap(), Some(12));
        assert!(FloatValue(12.5).int64_value().is_err());
        assert!(FloatValue(f64::NAN).int64_value().is_err());
        assert!(FloatValue(1e19).int64_value().is_err());
    }

    #[test]
    fn kinds_are_detected_by_type() {
        assert_eq!(BuiltinKind::of(&7_u16), Some(BuiltinKind::U16));
        assert_eq!(BuiltinKind::of(&[0_u8; 16]), Some(BuiltinKind::Uuid));
        assert_eq!(BuiltinKind::of(&Some(1_i32)), None);
    }
}
