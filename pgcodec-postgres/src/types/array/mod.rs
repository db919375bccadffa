//! Arrays of any element type, in any number of dimensions.
//!
//! The binary layout is
//!
//! ```text
//! ndim: int4, has_null: int4, element_oid: oid,
//! ndim * (length: int4, lower_bound: int4),
//! cardinality * (len: int4, payload)
//! ```
//!
//! with `ndim = 0` for an empty array. The text layout is the brace literal described in
//! [`parse`].
use std::fmt::Write as _;
use std::sync::Arc;

use pgcodec_core::error::{BoxDynError, Error};
use pgcodec_core::io::BufExt;
use pgcodec_core::IsNull;

use crate::arguments::{put_len, PgArgumentBuffer};
use crate::codec::{decode_value_for_oid, Codec};
use crate::host::{cardinality, ArrayDimension, ArrayGetter, ArraySetter, HostValue};
use crate::map::PgTypeMap;
use crate::plan::{
    encode_element, missing_capability, not_null_for, render_element, text, EncodePlan,
    ScanPlan,
};
use crate::type_info::PgType;
use crate::value::{PgValueFormat, Value};

mod parse;

use parse::{parse_array, write_element};

/// A PostgreSQL array: its dimensions and its elements in row-major order.
///
/// A plain `Vec<T>` (or nested `Vec`s) already encodes and scans as a one-dimensional (or
/// rectangular multidimensional) array; `PgArray` is needed to keep explicit lower bounds or
/// to scan arrays of unknown rank.
#[derive(Debug, Clone, PartialEq)]
pub struct PgArray<T> {
    pub dimensions: Vec<ArrayDimension>,
    pub elements: Vec<T>,
}

impl<T> Default for PgArray<T> {
    fn default() -> Self {
        PgArray {
            dimensions: Vec::new(),
            elements: Vec::new(),
        }
    }
}

impl<T> PgArray<T> {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T> From<Vec<T>> for PgArray<T> {
    fn from(elements: Vec<T>) -> Self {
        let dimensions = if elements.is_empty() {
            Vec::new()
        } else {
            // a Vec longer than i32::MAX is rejected by `dimensions()` at encode time
            vec![ArrayDimension::new(
                i32::try_from(elements.len()).unwrap_or(i32::MAX),
            )]
        };

        PgArray {
            dimensions,
            elements,
        }
    }
}

impl<T> FromIterator<T> for PgArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<T>>().into()
    }
}

impl<T: HostValue + Default + 'static> ArrayGetter for PgArray<T> {
    fn dimensions(&self) -> Result<Vec<ArrayDimension>, BoxDynError> {
        let expected = cardinality(&self.dimensions)?;

        if expected != self.elements.len() {
            return Err(format!(
                "array dimensions {:?} describe {expected} elements but {} are present",
                self.dimensions,
                self.elements.len()
            )
            .into());
        }

        Ok(self.dimensions.clone())
    }

    fn index(&self, i: usize) -> Option<&dyn HostValue> {
        self.elements.get(i).map(|e| e as &dyn HostValue)
    }

    fn index_type(&self) -> Box<dyn HostValue> {
        Box::new(T::default())
    }
}

impl<T: HostValue + Default + 'static> ArraySetter for PgArray<T> {
    fn set_dimensions(&mut self, dimensions: &[ArrayDimension]) -> Result<(), BoxDynError> {
        let len = cardinality(dimensions)?;

        self.dimensions = dimensions.to_vec();
        self.elements.clear();
        self.elements.resize_with(len, T::default);

        Ok(())
    }

    fn scan_index(&mut self, i: usize) -> Option<&mut dyn HostValue> {
        self.elements.get_mut(i).map(|e| e as &mut dyn HostValue)
    }

    fn scan_index_type(&self) -> Box<dyn HostValue> {
        Box::new(T::default())
    }
}

impl<T: HostValue + Default + 'static> HostValue for PgArray<T> {
    crate::impl_host_any!();

    fn as_array_getter(&self) -> Option<&dyn ArrayGetter> {
        Some(self)
    }

    fn as_array_setter(&mut self) -> Option<&mut dyn ArraySetter> {
        Some(self)
    }
}

/// Codec for an array type, delegating each element to the codec of its element type.
#[derive(Debug, Clone)]
pub struct ArrayCodec {
    element: Arc<PgType>,
    delimiter: char,
}

impl ArrayCodec {
    pub fn new(element: Arc<PgType>) -> Self {
        ArrayCodec {
            element,
            delimiter: ',',
        }
    }

    /// Use `delimiter` between elements in text format; `box` arrays use `;`.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn element(&self) -> &Arc<PgType> {
        &self.element
    }
}

impl Codec for ArrayCodec {
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
        let getter = value.as_array_getter()?;
        let sample = getter.index_type();
        let element_plan = map.plan_encode(self.element.oid(), format, &*sample)?;

        Some(Arc::new(ArrayEncodePlan {
            element_oid: self.element.oid(),
            delimiter: self.delimiter,
            format,
            element_plan,
        }))
    }

    fn plan_scan(
        &self,
        map: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        let mut sample = target.as_array_setter()?.scan_index_type();
        let element_plan = map.try_plan_scan(self.element.oid(), format, &mut *sample)?;

        Some(Arc::new(ArrayScanPlan {
            delimiter: self.delimiter,
            format,
            element_plan,
        }))
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

        let array = match format {
            PgValueFormat::Binary => {
                let (dimensions, mut body) = read_binary_header(src)?;
                let count = cardinality(&dimensions)?;

                let mut elements = Vec::with_capacity(count);
                for _ in 0..count {
                    let element = body.try_get_len_prefixed()?;
                    elements.push(decode_value_for_oid(map, element_oid, format, element)?);
                }

                expect_consumed(body)?;

                PgArray {
                    dimensions,
                    elements,
                }
            }

            PgValueFormat::Text => {
                let parsed = parse_array(text(src)?, self.delimiter)?;

                let elements = parsed
                    .elements
                    .iter()
                    .map(|e| {
                        let e = e.as_deref().map(str::as_bytes);
                        decode_value_for_oid(map, element_oid, format, e)
                    })
                    .collect::<Result<_, _>>()?;

                PgArray {
                    dimensions: parsed.dimensions,
                    elements,
                }
            }
        };

        Ok(Value::Array(array))
    }
}

#[derive(Debug)]
struct ArrayEncodePlan {
    element_oid: u32,
    delimiter: char,
    format: PgValueFormat,
    element_plan: Arc<dyn EncodePlan>,
}

impl ArrayEncodePlan {
    fn encode_binary(
        &self,
        map: &PgTypeMap,
        dimensions: &[ArrayDimension],
        elements: &[&dyn HostValue],
        buf: &mut PgArgumentBuffer,
    ) -> Result<(), BoxDynError> {
        if elements.is_empty() {
            buf.extend_from_slice(&0_i32.to_be_bytes());
            buf.extend_from_slice(&0_i32.to_be_bytes());
            buf.extend_from_slice(&self.element_oid.to_be_bytes());
            return Ok(());
        }

        put_len(buf, dimensions.len())?;

        // patched once the elements are written
        let has_null_at = buf.len();
        buf.extend_from_slice(&0_i32.to_be_bytes());

        buf.extend_from_slice(&self.element_oid.to_be_bytes());

        for dim in dimensions {
            buf.extend_from_slice(&dim.length.to_be_bytes());
            buf.extend_from_slice(&dim.lower_bound.to_be_bytes());
        }

        let mut has_null = false;

        for element in elements {
            buf.encode_len_prefixed(|buf| {
                let is_null = encode_element(map, &*self.element_plan, *element, buf)?;
                has_null |= is_null.is_null();
                Ok(is_null)
            })?;
        }

        if has_null {
            buf[has_null_at..has_null_at + 4].copy_from_slice(&1_i32.to_be_bytes());
        }

        Ok(())
    }

    fn encode_text(
        &self,
        map: &PgTypeMap,
        dimensions: &[ArrayDimension],
        elements: &[&dyn HostValue],
        buf: &mut PgArgumentBuffer,
    ) -> Result<(), BoxDynError> {
        if elements.is_empty() {
            buf.put_str("{}");
            return Ok(());
        }

        let mut out = String::new();

        if dimensions.iter().any(|dim| dim.lower_bound != 1) {
            for dim in dimensions {
                let upper = i64::from(dim.lower_bound) + i64::from(dim.length) - 1;
                write!(out, "[{}:{upper}]", dim.lower_bound)?;
            }

            out.push('=');
        }

        // strides[k] is the number of elements in one sub-array at level k
        let mut strides = Vec::with_capacity(dimensions.len());
        let mut stride = 1_usize;
        for dim in dimensions.iter().rev() {
            stride *= usize::try_from(dim.length)?;
            strides.push(stride);
        }

        for (i, element) in elements.iter().enumerate() {
            if i == 0 {
                out.extend(std::iter::repeat('{').take(dimensions.len()));
            } else {
                let boundaries = strides.iter().filter(|s| i % **s == 0).count();

                out.extend(std::iter::repeat('}').take(boundaries));
                out.push(self.delimiter);
                out.extend(std::iter::repeat('{').take(boundaries));
            }

            match render_element(map, &*self.element_plan, *element)? {
                Some(rendered) => write_element(&rendered, self.delimiter, &mut out),
                None => out.push_str("NULL"),
            }
        }

        out.extend(std::iter::repeat('}').take(dimensions.len()));

        buf.put_str(&out);

        Ok(())
    }
}

impl EncodePlan for ArrayEncodePlan {
    fn encode(
        &self,
        map: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        let getter = value
            .as_array_getter()
            .ok_or_else(|| missing_capability(value.type_name(), "ArrayGetter"))?;

        let dimensions = getter.dimensions()?;
        let count = cardinality(&dimensions)?;

        let elements = (0..count)
            .map(|i| {
                getter
                    .index(i)
                    .ok_or_else(|| BoxDynError::from(format!("array element {i} is missing")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match self.format {
            PgValueFormat::Binary => self.encode_binary(map, &dimensions, &elements, buf)?,
            PgValueFormat::Text => self.encode_text(map, &dimensions, &elements, buf)?,
        }

        Ok(IsNull::No)
    }
}

#[derive(Debug)]
struct ArrayScanPlan {
    delimiter: char,
    format: PgValueFormat,
    element_plan: Arc<dyn ScanPlan>,
}

impl ScanPlan for ArrayScanPlan {
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let host = target.type_name();
        let src = not_null_for(src, host)?;

        let setter = target
            .as_array_setter()
            .ok_or_else(|| missing_capability(host, "ArraySetter"))?;

        match self.format {
            PgValueFormat::Binary => {
                let (dimensions, mut body) = read_binary_header(src)?;
                setter.set_dimensions(&dimensions)?;

                for i in 0..cardinality(&dimensions)? {
                    let element = body.try_get_len_prefixed()?;
                    let slot = setter
                        .scan_index(i)
                        .ok_or_else(|| format!("array target has no element {i}"))?;

                    self.element_plan.scan(map, element, slot)?;
                }

                expect_consumed(body)
            }

            PgValueFormat::Text => {
                let parsed = parse_array(text(src)?, self.delimiter)?;
                setter.set_dimensions(&parsed.dimensions)?;

                for (i, element) in parsed.elements.iter().enumerate() {
                    let slot = setter
                        .scan_index(i)
                        .ok_or_else(|| format!("array target has no element {i}"))?;

                    self.element_plan
                        .scan(map, element.as_deref().map(str::as_bytes), slot)?;
                }

                Ok(())
            }
        }
    }
}

/// Read the binary header, returning the dimensions and the element payloads that follow.
fn read_binary_header(mut src: &[u8]) -> Result<(Vec<ArrayDimension>, &[u8]), BoxDynError> {
    let ndim = src.try_get_i32()?;
    // has_null is informational; every element carries its own length
    let _has_null = src.try_get_i32()?;
    let _element_oid = src.try_get_u32()?;

    let ndim = usize::try_from(ndim)
        .map_err(|_| Error::protocol(format!("invalid array dimension count: {ndim}")))?;

    // each dimension takes 8 bytes, so a larger count cannot be genuine
    if ndim > src.len() / 8 {
        return Err(Error::protocol(format!(
            "array declares {ndim} dimensions but only {} bytes remain",
            src.len()
        ))
        .into());
    }

    let mut dimensions = Vec::with_capacity(ndim);
    for _ in 0..ndim {
        let length = src.try_get_i32()?;
        let lower_bound = src.try_get_i32()?;

        if length < 0 {
            return Err(Error::protocol(format!("invalid array dimension length: {length}")).into());
        }

        dimensions.push(ArrayDimension {
            length,
            lower_bound,
        });
    }

    // every element takes at least its 4-byte length
    let count = cardinality(&dimensions)?;
    if count > src.len() / 4 {
        return Err(Error::protocol(format!(
            "array declares {count} elements but only {} bytes remain",
            src.len()
        ))
        .into());
    }

    Ok((dimensions, src))
}

fn expect_consumed(rest: &[u8]) -> Result<(), BoxDynError> {
    if !rest.is_empty() {
        return Err(Error::protocol(format!(
            "{} unexpected trailing bytes after array elements",
            rest.len()
        ))
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    const BUF_BINARY_I32: &[u8] = b"\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00\x17\x00\x00\x00\x04\x00\x00\x00\x01\x00\x00\x00\x04\x00\x00\x00\x01\x00\x00\x00\x04\x00\x00\x00\x02\x00\x00\x00\x04\x00\x00\x00\x03\x00\x00\x00\x04\x00\x00\x00\x04";

    #[test]
    fn it_encodes_i32_vec_binary() {
        let map = PgTypeMap::new();
        let mut buf = PgArgumentBuffer::new();

        map.encode(
            oid::INT4_ARRAY,
            PgValueFormat::Binary,
            &vec![1_i32, 2, 3, 4],
            &mut buf,
        )
        .unwrap();

        assert_eq!(&buf[..], BUF_BINARY_I32);
    }

    #[test]
    fn it_scans_i32_vec_binary() {
        let map = PgTypeMap::new();
        let mut v: Vec<i32> = Vec::new();

        map.scan(
            oid::INT4_ARRAY,
            PgValueFormat::Binary,
            Some(BUF_BINARY_I32),
            &mut v,
        )
        .unwrap();

        assert_eq!(v, [1, 2, 3, 4]);
    }

    #[test]
    fn it_scans_bool_array_with_nulls() {
        let map = PgTypeMap::new();
        let src = b"\x00\x00\x00\x01\x00\x00\x00\x01\x00\x00\x00\x10\x00\x00\x00\x04\x00\x00\x00\x01\xff\xff\xff\xff\x00\x00\x00\x01\x01\xff\xff\xff\xff\x00\x00\x00\x01\x00";

        let mut v: Vec<Option<bool>> = Vec::new();
        map.scan(oid::BOOL_ARRAY, PgValueFormat::Binary, Some(src), &mut v)
            .unwrap();

        assert_eq!(v, [None, Some(true), None, Some(false)]);

        let mut buf = PgArgumentBuffer::new();
        map.encode(oid::BOOL_ARRAY, PgValueFormat::Binary, &v, &mut buf)
            .unwrap();

        assert_eq!(&buf[..], &src[..]);
    }

    #[test]
    fn it_scans_text_literals() {
        let map = PgTypeMap::new();

        let mut ints: Vec<i32> = Vec::new();
        map.scan(
            oid::INT4_ARRAY,
            PgValueFormat::Text,
            Some(b"{1,152,-12412}"),
            &mut ints,
        )
        .unwrap();
        assert_eq!(ints, [1, 152, -12412]);

        let mut strings: Vec<String> = Vec::new();
        map.scan(
            oid::TEXT_ARRAY,
            PgValueFormat::Text,
            Some(br#"{"","\"",abc}"#),
            &mut strings,
        )
        .unwrap();
        assert_eq!(strings, ["", "\"", "abc"]);
    }

    #[test]
    fn it_encodes_multidimensional_text() {
        let map = PgTypeMap::new();
        let mut buf = PgArgumentBuffer::new();

        map.encode(
            oid::INT4_ARRAY,
            PgValueFormat::Text,
            &vec![vec![1_i32, 2], vec![3, 4]],
            &mut buf,
        )
        .unwrap();

        assert_eq!(&buf[..], b"{{1,2},{3,4}}");
    }

    #[test]
    fn it_rejects_ragged_slices() {
        let map = PgTypeMap::new();
        let mut buf = PgArgumentBuffer::new();

        let err = map.encode(
            oid::INT4_ARRAY,
            PgValueFormat::Binary,
            &vec![vec![1_i32, 2], vec![3]],
            &mut buf,
        );

        assert!(err.is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn it_keeps_lower_bounds_through_values() {
        let map = PgTypeMap::new();
        let mut value = Value::Null;

        map.scan(
            oid::TEXT_ARRAY,
            PgValueFormat::Text,
            Some(b"[0:1]={a,b}"),
            &mut value,
        )
        .unwrap();

        let Value::Array(array) = &value else {
            panic!("expected an array, got {value:?}");
        };

        assert_eq!(
            array.dimensions,
            [ArrayDimension {
                length: 2,
                lower_bound: 0
            }]
        );
        assert_eq!(array.elements, [Value::from("a"), Value::from("b")]);

        let mut buf = PgArgumentBuffer::new();
        map.encode(oid::TEXT_ARRAY, PgValueFormat::Text, &value, &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"[0:1]={a,b}");
    }

    #[test]
    fn it_encodes_empty_arrays() {
        let map = PgTypeMap::new();
        let mut buf = PgArgumentBuffer::new();

        map.encode(oid::INT4_ARRAY, PgValueFormat::Text, &Vec::<i32>::new(), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"{}");

        buf.clear();
        map.encode(
            oid::INT4_ARRAY,
            PgValueFormat::Binary,
            &Vec::<i32>::new(),
            &mut buf,
        )
        .unwrap();
        assert_eq!(&buf[..], b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x17");
    }

    #[test]
    fn it_rejects_null_for_slices() {
        let map = PgTypeMap::new();
        let mut v: Vec<i32> = vec![1];

        assert!(map
            .scan(oid::INT4_ARRAY, PgValueFormat::Binary, None, &mut v)
            .is_err());
    }

    #[test]
    fn it_rejects_truncated_payloads() {
        let map = PgTypeMap::new();
        let mut v: Vec<i32> = Vec::new();

        assert!(map
            .scan(
                oid::INT4_ARRAY,
                PgValueFormat::Binary,
                Some(&BUF_BINARY_I32[..BUF_BINARY_I32.len() - 2]),
                &mut v
            )
            .is_err());
    }

    #[test]
    fn pg_array_checks_its_dimensions() {
        let array = PgArray {
            dimensions: vec![ArrayDimension::new(3)],
            elements: vec![1_i32, 2],
        };

        assert!(array.dimensions().is_err());
        assert_eq!(PgArray::from(vec![1_i32]).dimensions, [ArrayDimension::new(1)]);
        assert!(PgArray::<i32>::from(Vec::new()).dimensions.is_empty());
    }
}
