use std::any::Any;
use std::fmt;

use pgcodec_core::error::BoxDynError;

use crate::host::{
    cardinality, ArrayDimension, ArrayGetter, ArraySetter, HostValue, ListTarget, ListValue,
    Shape, ShapeMut,
};

pub(super) fn as_list(value: &dyn HostValue) -> Option<&dyn ListValue> {
    match value.shape() {
        Shape::Slice(list) | Shape::FixedArray(list) => Some(list),
        _ => None,
    }
}

/// How many list levels a list nests, counting itself, given the sample of its elements.
pub(super) fn nesting_depth(mut sample: Box<dyn HostValue>) -> usize {
    let mut depth = 1;

    loop {
        let next = match sample.shape() {
            Shape::Slice(inner) | Shape::FixedArray(inner) => inner.element_sample(),
            _ => return depth,
        };

        depth += 1;
        sample = next;
    }
}

/// Descend from the sample of a list's elements to the sample of its innermost elements.
fn innermost_sample(mut sample: Box<dyn HostValue>, depth: usize) -> Box<dyn HostValue> {
    for _ in 1..depth {
        let next = match sample.shape() {
            Shape::Slice(inner) | Shape::FixedArray(inner) => inner.element_sample(),
            _ => break,
        };

        sample = next;
    }

    sample
}

fn dimension(len: usize) -> Result<ArrayDimension, BoxDynError> {
    Ok(ArrayDimension::new(i32::try_from(len)?))
}

/// A one-dimensional list seen as an array.
pub(super) struct ListArray<'a>(pub(super) &'a dyn ListValue);

impl ArrayGetter for ListArray<'_> {
    fn dimensions(&self) -> Result<Vec<ArrayDimension>, BoxDynError> {
        Ok(vec![dimension(self.0.len())?])
    }

    fn index(&self, i: usize) -> Option<&dyn HostValue> {
        self.0.get(i)
    }

    fn index_type(&self) -> Box<dyn HostValue> {
        self.0.element_sample()
    }
}

impl fmt::Debug for ListArray<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListArray").field("len", &self.0.len()).finish()
    }
}

impl HostValue for ListArray<'_> {
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn as_array_getter(&self) -> Option<&dyn ArrayGetter> {
        Some(self)
    }
}

/// Nested lists seen as one rectangular multidimensional array.
pub(super) struct MultiDimArray<'a> {
    list: &'a dyn ListValue,
    depth: usize,
    dims: Vec<usize>,
}

impl<'a> MultiDimArray<'a> {
    /// An adapter that is only good for planning; its dimensions are not computed.
    pub(super) fn sample(list: &'a dyn ListValue, depth: usize) -> Self {
        MultiDimArray {
            list,
            depth,
            dims: Vec::new(),
        }
    }

    pub(super) fn new(list: &'a dyn ListValue, depth: usize) -> Result<Self, BoxDynError> {
        let mut dims = Vec::with_capacity(depth);
        collect_dims(list, depth, &mut dims);

        if !is_rectangular(list, &dims) {
            return Err(format!(
                "cannot encode a ragged multidimensional slice: every sub-slice at a level must \
                 have the same length (expected dimensions {dims:?})"
            )
            .into());
        }

        Ok(MultiDimArray { list, depth, dims })
    }
}

fn collect_dims(list: &dyn ListValue, depth: usize, dims: &mut Vec<usize>) {
    dims.push(list.len());

    if depth > 1 {
        if let Some(inner) = list.get(0).and_then(as_list) {
            collect_dims(inner, depth - 1, dims);
        }
    }
}

fn is_rectangular(list: &dyn ListValue, dims: &[usize]) -> bool {
    let Some((&len, rest)) = dims.split_first() else {
        return true;
    };

    if list.len() != len {
        return false;
    }

    if rest.is_empty() {
        return true;
    }

    (0..len).all(|i| {
        list.get(i)
            .and_then(as_list)
            .is_some_and(|inner| is_rectangular(inner, rest))
    })
}

impl ArrayGetter for MultiDimArray<'_> {
    fn dimensions(&self) -> Result<Vec<ArrayDimension>, BoxDynError> {
        self.dims.iter().map(|len| dimension(*len)).collect()
    }

    fn index(&self, i: usize) -> Option<&dyn HostValue> {
        let mut list = self.list;
        let mut rem = i;

        for (level, _) in self.dims.iter().enumerate() {
            let stride: usize = self.dims[level + 1..].iter().product();
            if stride == 0 {
                return None;
            }

            let elem = list.get(rem / stride)?;
            rem %= stride;

            if level + 1 == self.dims.len() {
                return Some(elem);
            }

            list = as_list(elem)?;
        }

        None
    }

    fn index_type(&self) -> Box<dyn HostValue> {
        innermost_sample(self.list.element_sample(), self.depth)
    }
}

impl fmt::Debug for MultiDimArray<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiDimArray")
            .field("depth", &self.depth)
            .field("dims", &self.dims)
            .finish()
    }
}

impl HostValue for MultiDimArray<'_> {
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn as_array_getter(&self) -> Option<&dyn ArrayGetter> {
        Some(self)
    }
}

/// A list target receiving an array of any dimensionality, flattened in row-major order.
pub(super) struct ListArrayTarget<'a>(pub(super) &'a mut dyn ListTarget);

impl ArraySetter for ListArrayTarget<'_> {
    fn set_dimensions(&mut self, dimensions: &[ArrayDimension]) -> Result<(), BoxDynError> {
        self.0.resize(cardinality(dimensions)?)
    }

    fn scan_index(&mut self, i: usize) -> Option<&mut dyn HostValue> {
        self.0.get_mut(i)
    }

    fn scan_index_type(&self) -> Box<dyn HostValue> {
        self.0.element_sample()
    }
}

impl fmt::Debug for ListArrayTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListArrayTarget")
            .field("len", &self.0.len())
            .finish()
    }
}

impl HostValue for ListArrayTarget<'_> {
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn as_array_setter(&mut self) -> Option<&mut dyn ArraySetter> {
        Some(self)
    }
}

/// Nested list targets receiving an array with exactly as many dimensions as they nest.
pub(super) struct MultiDimTarget<'a> {
    list: &'a mut dyn ListTarget,
    depth: usize,
    dims: Vec<usize>,
}

impl<'a> MultiDimTarget<'a> {
    pub(super) fn new(list: &'a mut dyn ListTarget, depth: usize) -> Self {
        MultiDimTarget {
            list,
            depth,
            dims: Vec::new(),
        }
    }
}

fn resize_nested(list: &mut dyn ListTarget, dims: &[usize]) -> Result<(), BoxDynError> {
    let Some((&len, rest)) = dims.split_first() else {
        return Ok(());
    };

    list.resize(len)?;

    if rest.is_empty() {
        return Ok(());
    }

    for i in 0..len {
        let elem = list
            .get_mut(i)
            .ok_or_else(|| format!("index {i} out of range after resizing to {len}"))?;

        match elem.shape_mut() {
            ShapeMut::Slice(inner) | ShapeMut::FixedArray(inner) => resize_nested(inner, rest)?,
            _ => return Err("element of a nested list target is not a list".into()),
        }
    }

    Ok(())
}

fn nav_mut<'t>(
    list: &'t mut dyn ListTarget,
    dims: &[usize],
    i: usize,
) -> Option<&'t mut dyn HostValue> {
    let (_, rest) = dims.split_first()?;

    let stride: usize = rest.iter().product();
    if stride == 0 {
        return None;
    }

    let elem = list.get_mut(i / stride)?;

    if rest.is_empty() {
        return Some(elem);
    }

    match elem.shape_mut() {
        ShapeMut::Slice(inner) | ShapeMut::FixedArray(inner) => nav_mut(inner, rest, i % stride),
        _ => None,
    }
}

impl ArraySetter for MultiDimTarget<'_> {
    fn set_dimensions(&mut self, dimensions: &[ArrayDimension]) -> Result<(), BoxDynError> {
        if dimensions.is_empty() {
            self.dims = vec![0];
            return self.list.resize(0);
        }

        if dimensions.len() != self.depth {
            return Err(format!(
                "cannot scan a {}-dimensional array into a {}-dimensional target",
                dimensions.len(),
                self.depth
            )
            .into());
        }

        let dims = dimensions
            .iter()
            .map(|dim| usize::try_from(dim.length))
            .collect::<Result<Vec<_>, _>>()?;

        resize_nested(&mut *self.list, &dims)?;
        self.dims = dims;

        Ok(())
    }

    fn scan_index(&mut self, i: usize) -> Option<&mut dyn HostValue> {
        nav_mut(&mut *self.list, &self.dims, i)
    }

    fn scan_index_type(&self) -> Box<dyn HostValue> {
        innermost_sample(self.list.element_sample(), self.depth)
    }
}

impl fmt::Debug for MultiDimTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiDimTarget")
            .field("depth", &self.depth)
            .field("dims", &self.dims)
            .finish()
    }
}

impl HostValue for MultiDimTarget<'_> {
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn as_array_setter(&mut self) -> Option<&mut dyn ArraySetter> {
        Some(self)
    }
}
