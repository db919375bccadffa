//! The wrapping chain.
//!
//! When no codec accepts a host type directly, the registry tries to adapt the value into
//! something a codec does accept: dereferencing an `Option` or `Box`, converting a standard
//! library scalar, unwrapping a renamed type, or viewing a struct, list or nested lists as a
//! composite or array. Each adaptation re-enters plan resolution one level deeper; the first
//! one that resolves wins.
use std::fmt;
use std::sync::Arc;

use pgcodec_core::error::BoxDynError;
use pgcodec_core::IsNull;

use crate::arguments::PgArgumentBuffer;
use crate::host::{HostValue, Shape, ShapeMut};
use crate::map::PgTypeMap;
use crate::plan::{DatabaseValuerPlan, EncodePlan, ScanPlan};
use crate::value::PgValueFormat;

mod builtin;
mod slice;
mod structs;

use builtin::BuiltinKind;
use slice::{nesting_depth, ListArray, ListArrayTarget, MultiDimArray, MultiDimTarget};
use structs::{StructComposite, StructCompositeTarget};

/// An adapted value, either borrowed from the original or built from it.
enum Adapted<'v> {
    Borrowed(&'v dyn HostValue),
    Owned(Box<dyn HostValue + 'v>),
}

impl Adapted<'_> {
    fn get(&self) -> &dyn HostValue {
        match self {
            Adapted::Borrowed(v) => *v,
            Adapted::Owned(v) => &**v,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum EncodeWrap {
    /// `Option<T>` or `Box<T>` to `T`; `None` encodes as `NULL`.
    DerefPointer,
    Builtin(BuiltinKind),
    /// A renamed type to the type it wraps.
    Underlying,
    Struct,
    Slice,
    MultiDimSlice { depth: usize },
    FixedArray,
}

impl EncodeWrap {
    /// Every wrapper that applies to `value`, in the order they are tried.
    fn candidates(value: &dyn HostValue) -> Vec<EncodeWrap> {
        match value.shape() {
            Shape::Nullable(_) | Shape::Pointer(_) => vec![EncodeWrap::DerefPointer],
            Shape::Builtin => BuiltinKind::of(value)
                .map(EncodeWrap::Builtin)
                .into_iter()
                .collect(),
            Shape::Newtype(_) if !value.skip_underlying_type_plan() => {
                vec![EncodeWrap::Underlying]
            }
            Shape::Struct(_) => vec![EncodeWrap::Struct],
            Shape::Slice(list) => {
                let mut wraps = vec![EncodeWrap::Slice];
                let depth = nesting_depth(list.element_sample());
                if depth > 1 {
                    wraps.push(EncodeWrap::MultiDimSlice { depth });
                }
                wraps
            }
            Shape::FixedArray(list) => {
                let mut wraps = vec![EncodeWrap::FixedArray];
                let depth = nesting_depth(list.element_sample());
                if depth > 1 {
                    wraps.push(EncodeWrap::MultiDimSlice { depth });
                }
                wraps
            }
            _ => Vec::new(),
        }
    }

    /// The value to plan the next step with.
    fn plan_sample<'v>(self, value: &'v dyn HostValue) -> Option<Adapted<'v>> {
        match (self, value.shape()) {
            (EncodeWrap::DerefPointer, Shape::Nullable(n)) => Some(Adapted::Owned(n.sample())),
            (EncodeWrap::MultiDimSlice { depth }, Shape::Slice(list) | Shape::FixedArray(list)) => {
                Some(Adapted::Owned(Box::new(MultiDimArray::sample(list, depth))))
            }
            _ => match self.adapt(value) {
                Ok(adapted) => adapted,
                Err(error) => {
                    tracing::trace!(wrap = ?self, %error, "cannot adapt value for planning");
                    None
                }
            },
        }
    }

    /// The value to hand to the next plan, or `None` for `NULL`.
    fn adapt<'v>(self, value: &'v dyn HostValue) -> Result<Option<Adapted<'v>>, BoxDynError> {
        let adapted = match (self, value.shape()) {
            (EncodeWrap::DerefPointer, Shape::Nullable(n)) => match n.get() {
                Some(inner) => Adapted::Borrowed(inner),
                None => return Ok(None),
            },
            (EncodeWrap::DerefPointer, Shape::Pointer(inner)) => Adapted::Borrowed(inner),
            (EncodeWrap::Builtin(kind), _) => Adapted::Owned(kind.adapt(value)?),
            (EncodeWrap::Underlying, Shape::Newtype(inner)) => Adapted::Borrowed(inner),
            (EncodeWrap::Struct, Shape::Struct(fields)) => {
                Adapted::Owned(Box::new(StructComposite(fields)))
            }
            (EncodeWrap::Slice, Shape::Slice(list))
            | (EncodeWrap::FixedArray, Shape::FixedArray(list)) => {
                Adapted::Owned(Box::new(ListArray(list)))
            }
            (EncodeWrap::MultiDimSlice { depth }, Shape::Slice(list) | Shape::FixedArray(list)) => {
                Adapted::Owned(Box::new(MultiDimArray::new(list, depth)?))
            }
            (wrap, _) => {
                return Err(format!("{} cannot be adapted by {wrap:?}", value.type_name()).into())
            }
        };

        Ok(Some(adapted))
    }
}

struct WrapEncodePlan {
    wrap: EncodeWrap,
    next: Arc<dyn EncodePlan>,
    oid: u32,
    format: PgValueFormat,
}

impl fmt::Debug for WrapEncodePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapEncodePlan")
            .field("wrap", &self.wrap)
            .field("next", &self.next)
            .finish()
    }
}

impl EncodePlan for WrapEncodePlan {
    fn encode(
        &self,
        map: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        match self.wrap.adapt(value)? {
            Some(adapted) => self.next.encode(map, adapted.get(), buf),
            // an absent value may still delegate to something other than `NULL`
            None if value.as_database_valuer().is_some() => DatabaseValuerPlan {
                oid: self.oid,
                format: self.format,
            }
            .encode(map, value, buf),
            None => Ok(IsNull::Yes),
        }
    }
}

pub(crate) fn try_wrap_encode(
    map: &PgTypeMap,
    oid: u32,
    format: PgValueFormat,
    value: &dyn HostValue,
    depth: usize,
) -> Option<Arc<dyn EncodePlan>> {
    for wrap in EncodeWrap::candidates(value) {
        let Some(sample) = wrap.plan_sample(value) else {
            continue;
        };

        if let Some(next) = map.resolve_encode(oid, format, sample.get(), depth + 1) {
            tracing::trace!(?wrap, oid, host_type = value.type_name(), "wrapped encode plan");
            return Some(Arc::new(WrapEncodePlan {
                wrap,
                next,
                oid,
                format,
            }));
        }
    }

    None
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ScanWrap {
    /// `Option<T>` or `Box<T>` to `T`; `NULL` clears an `Option`.
    DerefPointer,
    Builtin(BuiltinKind),
    Underlying,
    Struct,
    Slice,
    MultiDimSlice { depth: usize },
    FixedArray,
}

impl ScanWrap {
    fn candidates(target: &mut dyn HostValue) -> Vec<ScanWrap> {
        let builtin = BuiltinKind::of(target);
        let skip_underlying = target.skip_underlying_type_plan();

        match target.shape_mut() {
            ShapeMut::Nullable(_) | ShapeMut::Pointer(_) => vec![ScanWrap::DerefPointer],
            ShapeMut::Builtin => builtin.map(ScanWrap::Builtin).into_iter().collect(),
            ShapeMut::Newtype(_) if !skip_underlying => vec![ScanWrap::Underlying],
            ShapeMut::Struct(_) => vec![ScanWrap::Struct],
            ShapeMut::Slice(list) => {
                let mut wraps = vec![ScanWrap::Slice];
                let depth = nesting_depth(list.element_sample());
                if depth > 1 {
                    wraps.push(ScanWrap::MultiDimSlice { depth });
                }
                wraps
            }
            ShapeMut::FixedArray(list) => {
                let mut wraps = vec![ScanWrap::FixedArray];
                let depth = nesting_depth(list.element_sample());
                if depth > 1 {
                    wraps.push(ScanWrap::MultiDimSlice { depth });
                }
                wraps
            }
            _ => Vec::new(),
        }
    }

    fn plan(
        self,
        map: &PgTypeMap,
        oid: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
        depth: usize,
    ) -> Option<Arc<dyn ScanPlan>> {
        if let ScanWrap::Builtin(kind) = self {
            return kind.plan_scan(map, oid, format, target, depth);
        }

        let depth = depth + 1;

        match (self, target.shape_mut()) {
            (ScanWrap::DerefPointer, ShapeMut::Nullable(n)) => {
                let mut sample = n.sample();
                map.resolve_scan(oid, format, &mut *sample, depth)
            }
            (ScanWrap::DerefPointer, ShapeMut::Pointer(inner))
            | (ScanWrap::Underlying, ShapeMut::Newtype(inner)) => {
                map.resolve_scan(oid, format, inner, depth)
            }
            (ScanWrap::Struct, ShapeMut::Struct(fields)) => {
                map.resolve_scan(oid, format, &mut StructCompositeTarget(fields), depth)
            }
            (ScanWrap::Slice, ShapeMut::Slice(list))
            | (ScanWrap::FixedArray, ShapeMut::FixedArray(list)) => {
                map.resolve_scan(oid, format, &mut ListArrayTarget(list), depth)
            }
            (
                ScanWrap::MultiDimSlice { depth: levels },
                ShapeMut::Slice(list) | ShapeMut::FixedArray(list),
            ) => map.resolve_scan(oid, format, &mut MultiDimTarget::new(list, levels), depth),
            _ => None,
        }
    }

    fn scan(
        self,
        next: &dyn ScanPlan,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        if let ScanWrap::Builtin(kind) = self {
            return kind.scan(next, map, src, target);
        }

        let host_type = target.type_name();

        match (self, target.shape_mut()) {
            (ScanWrap::DerefPointer, ShapeMut::Nullable(n)) => match src {
                None => {
                    n.set_none();
                    Ok(())
                }
                Some(_) => next.scan(map, src, n.insert_default()),
            },
            (ScanWrap::DerefPointer, ShapeMut::Pointer(inner))
            | (ScanWrap::Underlying, ShapeMut::Newtype(inner)) => next.scan(map, src, inner),
            (ScanWrap::Struct, ShapeMut::Struct(fields)) => {
                next.scan(map, src, &mut StructCompositeTarget(fields))
            }
            (ScanWrap::Slice, ShapeMut::Slice(list))
            | (ScanWrap::FixedArray, ShapeMut::FixedArray(list)) => {
                next.scan(map, src, &mut ListArrayTarget(list))
            }
            (
                ScanWrap::MultiDimSlice { depth },
                ShapeMut::Slice(list) | ShapeMut::FixedArray(list),
            ) => next.scan(map, src, &mut MultiDimTarget::new(list, depth)),
            (wrap, _) => Err(format!("{host_type} cannot be adapted by {wrap:?}").into()),
        }
    }
}

struct WrapScanPlan {
    wrap: ScanWrap,
    next: Arc<dyn ScanPlan>,
}

impl fmt::Debug for WrapScanPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapScanPlan")
            .field("wrap", &self.wrap)
            .field("next", &self.next)
            .finish()
    }
}

impl ScanPlan for WrapScanPlan {
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        self.wrap.scan(&*self.next, map, src, target)
    }
}

pub(crate) fn try_wrap_scan(
    map: &PgTypeMap,
    oid: u32,
    format: PgValueFormat,
    target: &mut dyn HostValue,
    depth: usize,
) -> Option<Arc<dyn ScanPlan>> {
    for wrap in ScanWrap::candidates(target) {
        if let Some(next) = wrap.plan(map, oid, format, target, depth) {
            tracing::trace!(?wrap, oid, host_type = target.type_name(), "wrapped scan plan");
            return Some(Arc::new(WrapScanPlan { wrap, next }));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Celsius(f64);

    crate::impl_host_newtype!(Celsius);

    #[test]
    fn candidates_follow_shape() {
        assert_eq!(
            EncodeWrap::candidates(&Some(1_i32)),
            vec![EncodeWrap::DerefPointer]
        );
        assert_eq!(
            EncodeWrap::candidates(&Celsius(1.5)),
            vec![EncodeWrap::Underlying]
        );
        assert_eq!(
            EncodeWrap::candidates(&vec![vec![1_i16]]),
            vec![EncodeWrap::Slice, EncodeWrap::MultiDimSlice { depth: 2 }]
        );
        assert_eq!(
            ScanWrap::candidates(&mut 0_u32),
            vec![ScanWrap::Builtin(BuiltinKind::U32)]
        );
    }

    #[test]
    fn none_adapts_to_null() {
        let none: Option<i64> = None;
        assert!(EncodeWrap::DerefPointer.adapt(&none).unwrap().is_none());

        let some = Some(3_i64);
        let adapted = EncodeWrap::DerefPointer.adapt(&some).unwrap().unwrap();
        assert_eq!(adapted.get().downcast_ref::<i64>(), Some(&3));
    }
}
