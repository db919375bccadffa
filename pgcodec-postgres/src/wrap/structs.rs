use std::any::Any;
use std::fmt;

use crate::host::{
    CompositeGetter, CompositeScanner, HostValue, StructFields, StructFieldsMut,
};

/// A struct's fields seen as a composite, in declaration order.
pub(super) struct StructComposite<'a>(pub(super) &'a dyn StructFields);

impl CompositeGetter for StructComposite<'_> {
    fn field_count(&self) -> usize {
        self.0.field_count()
    }

    fn field(&self, i: usize) -> Option<&dyn HostValue> {
        self.0.field(i)
    }
}

impl fmt::Debug for StructComposite<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructComposite")
            .field("fields", &self.0.field_count())
            .finish()
    }
}

impl HostValue for StructComposite<'_> {
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn as_composite_getter(&self) -> Option<&dyn CompositeGetter> {
        Some(self)
    }
}

pub(super) struct StructCompositeTarget<'a>(pub(super) &'a mut dyn StructFieldsMut);

impl CompositeScanner for StructCompositeTarget<'_> {
    fn field_count(&self) -> usize {
        self.0.field_count()
    }

    fn scan_field(&mut self, i: usize) -> Option<&mut dyn HostValue> {
        self.0.field_mut(i)
    }
}

impl fmt::Debug for StructCompositeTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructCompositeTarget")
            .field("fields", &self.0.field_count())
            .finish()
    }
}

impl HostValue for StructCompositeTarget<'_> {
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }

    fn as_composite_scanner(&mut self) -> Option<&mut dyn CompositeScanner> {
        Some(self)
    }
}
