//! Capabilities a host value can expose to the codecs.
//!
//! A codec never inspects a value's concrete type beyond the few types it handles natively.
//! Everything else is reached through these traits, which [`HostValue`] hands out through its
//! `as_*` accessors. Valuers return `Ok(None)` for SQL `NULL`; scanners receive `None` for it.
use std::borrow::Cow;

use pgcodec_core::error::BoxDynError;

use super::HostValue;
use crate::value::Value;

pub trait BoolValuer {
    fn bool_value(&self) -> Result<Option<bool>, BoxDynError>;
}

pub trait BoolScanner {
    fn scan_bool(&mut self, v: Option<bool>) -> Result<(), BoxDynError>;
}

pub trait Int64Valuer {
    fn int64_value(&self) -> Result<Option<i64>, BoxDynError>;
}

pub trait Int64Scanner {
    fn scan_int64(&mut self, v: Option<i64>) -> Result<(), BoxDynError>;
}

pub trait Float64Valuer {
    fn float64_value(&self) -> Result<Option<f64>, BoxDynError>;
}

pub trait Float64Scanner {
    fn scan_float64(&mut self, v: Option<f64>) -> Result<(), BoxDynError>;
}

pub trait TextValuer {
    fn text_value(&self) -> Result<Option<Cow<'_, str>>, BoxDynError>;
}

pub trait TextScanner {
    fn scan_text(&mut self, v: Option<&str>) -> Result<(), BoxDynError>;
}

/// Produces serialized JSON text.
pub trait JsonValuer {
    fn json_value(&self) -> Result<Option<Vec<u8>>, BoxDynError>;
}

/// Consumes serialized JSON text.
pub trait JsonScanner {
    fn scan_json(&mut self, v: Option<&[u8]>) -> Result<(), BoxDynError>;
}

/// One dimension of a PostgreSQL array.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ArrayDimension {
    pub length: i32,
    pub lower_bound: i32,
}

impl ArrayDimension {
    pub const fn new(length: i32) -> Self {
        ArrayDimension {
            length,
            lower_bound: 1,
        }
    }
}

/// Total number of elements described by `dimensions`.
pub fn cardinality(dimensions: &[ArrayDimension]) -> Result<usize, BoxDynError> {
    if dimensions.is_empty() {
        return Ok(0);
    }

    dimensions.iter().try_fold(1_usize, |acc, dim| {
        let len = usize::try_from(dim.length)
            .map_err(|_| format!("invalid array dimension length: {}", dim.length))?;

        acc.checked_mul(len)
            .ok_or_else(|| BoxDynError::from("array cardinality overflows usize"))
    })
}

/// Read access to an array value: dimensions plus row-major flattened elements.
pub trait ArrayGetter {
    fn dimensions(&self) -> Result<Vec<ArrayDimension>, BoxDynError>;

    fn index(&self, i: usize) -> Option<&dyn HostValue>;

    /// A representative element used to plan element encoding.
    fn index_type(&self) -> Box<dyn HostValue>;
}

/// Write access to an array target.
pub trait ArraySetter {
    /// Resize the target for `dimensions`; every element slot is then reachable through
    /// [`scan_index`][Self::scan_index].
    fn set_dimensions(&mut self, dimensions: &[ArrayDimension]) -> Result<(), BoxDynError>;

    fn scan_index(&mut self, i: usize) -> Option<&mut dyn HostValue>;

    /// A representative element used to plan element scanning.
    fn scan_index_type(&self) -> Box<dyn HostValue>;
}

/// Positional access to the fields of a composite value.
pub trait CompositeGetter {
    fn field_count(&self) -> usize;

    fn field(&self, i: usize) -> Option<&dyn HostValue>;
}

pub trait CompositeScanner {
    fn field_count(&self) -> usize;

    fn scan_field(&mut self, i: usize) -> Option<&mut dyn HostValue>;
}

/// How one side of a range is bounded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BoundType {
    #[default]
    Inclusive,
    Exclusive,
    Unbounded,
    Empty,
}

impl BoundType {
    pub fn is_unbounded(self) -> bool {
        matches!(self, BoundType::Unbounded)
    }
}

pub trait RangeValuer {
    fn bound_types(&self) -> (BoundType, BoundType);

    fn bounds(&self) -> (&dyn HostValue, &dyn HostValue);

    fn bound_sample(&self) -> Box<dyn HostValue>;
}

pub trait RangeScanner {
    /// Called after both bounds are scanned. Rejects an `Empty` side paired with a
    /// non-`Empty` one.
    fn set_bound_types(&mut self, lower: BoundType, upper: BoundType) -> Result<(), BoxDynError>;

    fn scan_bounds(&mut self) -> (&mut dyn HostValue, &mut dyn HostValue);

    fn bound_sample(&self) -> Box<dyn HostValue>;
}

pub trait MultirangeGetter {
    fn len(&self) -> usize;

    fn index(&self, i: usize) -> Option<&dyn HostValue>;

    fn index_type(&self) -> Box<dyn HostValue>;
}

pub trait MultirangeSetter {
    fn set_len(&mut self, n: usize) -> Result<(), BoxDynError>;

    fn scan_index(&mut self, i: usize) -> Option<&mut dyn HostValue>;

    fn scan_index_type(&self) -> Box<dyn HostValue>;
}

/// Receives a fully decoded [`Value`] instead of raw bytes.
///
/// Lets a type outside the built-in set accept any wire type it understands.
pub trait DynamicScanner {
    fn scan_value(&mut self, value: Value) -> Result<(), BoxDynError>;
}

/// Hands encoding off to a simpler representation.
///
/// Consulted when no codec or wrapper applies, and for an absent nullable value, which would
/// otherwise be `NULL`. A returned [`Value::Text`] that cannot be encoded directly is parsed in
/// text format and re-encoded.
pub trait DatabaseValuer {
    fn database_value(&self) -> Result<Value, BoxDynError>;
}
