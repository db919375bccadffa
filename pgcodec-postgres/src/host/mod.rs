//! Host values: anything that can be encoded from or scanned into.
//!
//! Every value crosses the codec boundary as `&dyn HostValue` (encode) or
//! `&mut dyn HostValue` (scan). A value describes itself in two ways:
//!
//! * its [`Shape`], the closed set of structural categories the wrapping chain understands
//!   (nullable, pointer, renamed scalar, struct, slice, fixed array, dynamic); and
//! * its capabilities, the `as_*` accessors returning the traits in [`capability`].
//!
//! Plans are resolved once per `(oid, host type, format)` from these answers.
use std::any::{Any, TypeId};
use std::fmt;

pub mod capability;
mod impls;

pub use capability::*;

/// Structural category of a value, for encoding.
pub enum Shape<'a> {
    /// Handled by codecs directly or through capabilities.
    Scalar,

    /// A bare standard library type that the builtin augmentation step knows how to adapt.
    Builtin,

    /// An optional value; absent is SQL `NULL`.
    Nullable(&'a dyn NullableValue),

    /// An always-present indirection such as `Box<T>`.
    Pointer(&'a dyn HostValue),

    /// A renamed scalar; encoding falls back to the wrapped value.
    Newtype(&'a dyn HostValue),

    /// A record with positional fields.
    Struct(&'a dyn StructFields),

    /// A growable list.
    Slice(&'a dyn ListValue),

    /// A list whose length is part of its type.
    FixedArray(&'a dyn ListValue),

    /// A runtime-typed [`Value`][crate::Value]; `None` is SQL `NULL`.
    Dynamic(Option<&'a dyn HostValue>),
}

/// Structural category of a target, for scanning.
pub enum ShapeMut<'a> {
    Scalar,
    Builtin,
    Nullable(&'a mut dyn NullableTarget),
    Pointer(&'a mut dyn HostValue),
    Newtype(&'a mut dyn HostValue),
    Struct(&'a mut dyn StructFieldsMut),
    Slice(&'a mut dyn ListTarget),
    FixedArray(&'a mut dyn ListTarget),
    Dynamic,
}

pub trait NullableValue {
    fn get(&self) -> Option<&dyn HostValue>;

    /// A default inner value used to plan before any value is present.
    fn sample(&self) -> Box<dyn HostValue>;
}

pub trait NullableTarget {
    fn set_none(&mut self);

    /// Replace the content with a fresh default and return it for scanning.
    fn insert_default(&mut self) -> &mut dyn HostValue;

    fn sample(&self) -> Box<dyn HostValue>;
}

pub trait StructFields {
    fn field_count(&self) -> usize;

    fn field(&self, i: usize) -> Option<&dyn HostValue>;
}

pub trait StructFieldsMut {
    fn field_count(&self) -> usize;

    fn field_mut(&mut self, i: usize) -> Option<&mut dyn HostValue>;
}

pub trait ListValue {
    fn len(&self) -> usize;

    fn get(&self, i: usize) -> Option<&dyn HostValue>;

    fn element_sample(&self) -> Box<dyn HostValue>;
}

pub trait ListTarget {
    fn len(&self) -> usize;

    /// Make room for exactly `len` default elements. Fixed-size lists reject any other length.
    fn resize(&mut self, len: usize) -> Result<(), pgcodec_core::BoxDynError>;

    fn get_mut(&mut self, i: usize) -> Option<&mut dyn HostValue>;

    fn element_sample(&self) -> Box<dyn HostValue>;
}

/// A value that can be encoded from or scanned into.
///
/// Implementations for `'static` types should include [`impl_host_any!`] so plans can be
/// memoized per type; adapters that borrow return `None` from both `as_any` methods.
pub trait HostValue: fmt::Debug {
    fn as_any(&self) -> Option<&dyn Any>;

    fn as_any_mut(&mut self) -> Option<&mut dyn Any>;

    fn type_name(&self) -> &'static str {
        std::any::type_name_of_val(self)
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Scalar
    }

    fn shape_mut(&mut self) -> ShapeMut<'_> {
        ShapeMut::Scalar
    }

    /// Keep the identity of a renamed type instead of unwrapping it to the inner value.
    fn skip_underlying_type_plan(&self) -> bool {
        false
    }

    fn as_bool_valuer(&self) -> Option<&dyn BoolValuer> {
        None
    }

    fn as_bool_scanner(&mut self) -> Option<&mut dyn BoolScanner> {
        None
    }

    fn as_int64_valuer(&self) -> Option<&dyn Int64Valuer> {
        None
    }

    fn as_int64_scanner(&mut self) -> Option<&mut dyn Int64Scanner> {
        None
    }

    fn as_float64_valuer(&self) -> Option<&dyn Float64Valuer> {
        None
    }

    fn as_float64_scanner(&mut self) -> Option<&mut dyn Float64Scanner> {
        None
    }

    fn as_text_valuer(&self) -> Option<&dyn TextValuer> {
        None
    }

    fn as_text_scanner(&mut self) -> Option<&mut dyn TextScanner> {
        None
    }

    fn as_json_valuer(&self) -> Option<&dyn JsonValuer> {
        None
    }

    fn as_json_scanner(&mut self) -> Option<&mut dyn JsonScanner> {
        None
    }

    fn as_array_getter(&self) -> Option<&dyn ArrayGetter> {
        None
    }

    fn as_array_setter(&mut self) -> Option<&mut dyn ArraySetter> {
        None
    }

    fn as_composite_getter(&self) -> Option<&dyn CompositeGetter> {
        None
    }

    fn as_composite_scanner(&mut self) -> Option<&mut dyn CompositeScanner> {
        None
    }

    fn as_range_valuer(&self) -> Option<&dyn RangeValuer> {
        None
    }

    fn as_range_scanner(&mut self) -> Option<&mut dyn RangeScanner> {
        None
    }

    fn as_multirange_getter(&self) -> Option<&dyn MultirangeGetter> {
        None
    }

    fn as_multirange_setter(&mut self) -> Option<&mut dyn MultirangeSetter> {
        None
    }

    fn as_dynamic_scanner(&mut self) -> Option<&mut dyn DynamicScanner> {
        None
    }

    fn as_database_valuer(&self) -> Option<&dyn DatabaseValuer> {
        None
    }
}

impl dyn HostValue + '_ {
    /// The [`TypeId`] of the concrete type, if it is `'static`.
    pub fn host_type_id(&self) -> Option<TypeId> {
        self.as_any().map(Any::type_id)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any()?.downcast_ref()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut()?.downcast_mut()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// Whether this value encodes as SQL `NULL` without consulting any codec.
    pub fn is_null(&self) -> bool {
        match self.shape() {
            Shape::Nullable(n) => n.get().is_none(),
            Shape::Dynamic(inner) => inner.is_none(),
            _ => false,
        }
    }
}

/// Implements the `as_any` pair of [`HostValue`] for a `'static` type.
#[macro_export]
macro_rules! impl_host_any {
    () => {
        fn as_any(&self) -> ::std::option::Option<&dyn ::std::any::Any> {
            ::std::option::Option::Some(self)
        }

        fn as_any_mut(&mut self) -> ::std::option::Option<&mut dyn ::std::any::Any> {
            ::std::option::Option::Some(self)
        }
    };
}

/// Implements [`HostValue`] for a scalar type handled natively by a codec.
#[macro_export]
macro_rules! impl_host_scalar {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::host::HostValue for $ty {
                $crate::impl_host_any!();
            }
        )+
    };
}

/// Implements [`HostValue`] for a single-field tuple struct that renames another host type.
///
/// Encoding and scanning fall through to the wrapped field unless the type also exposes a
/// capability a codec accepts directly.
///
/// ```rust,ignore
/// #[derive(Debug, Default)]
/// struct UserId(i64);
///
/// impl_host_newtype!(UserId);
/// ```
#[macro_export]
macro_rules! impl_host_newtype {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::host::HostValue for $ty {
                $crate::impl_host_any!();

                fn shape(&self) -> $crate::host::Shape<'_> {
                    $crate::host::Shape::Newtype(&self.0)
                }

                fn shape_mut(&mut self) -> $crate::host::ShapeMut<'_> {
                    $crate::host::ShapeMut::Newtype(&mut self.0)
                }
            }
        )+
    };
}

/// Implements [`HostValue`] for a struct so it encodes and scans as a composite, one field
/// per listed member in order.
///
/// ```rust,ignore
/// #[derive(Debug, Default)]
/// struct InventoryItem { name: String, supplier_id: i32, price: Option<PgNumeric> }
///
/// impl_host_struct!(InventoryItem { name, supplier_id, price });
/// ```
#[macro_export]
macro_rules! impl_host_struct {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::host::StructFields for $ty {
            fn field_count(&self) -> usize {
                [$(stringify!($field)),+].len()
            }

            #[allow(unused_assignments)]
            fn field(&self, i: usize) -> ::std::option::Option<&dyn $crate::host::HostValue> {
                let mut n = 0_usize;
                $(
                    if i == n {
                        return ::std::option::Option::Some(&self.$field);
                    }
                    n += 1;
                )+
                ::std::option::Option::None
            }
        }

        impl $crate::host::StructFieldsMut for $ty {
            fn field_count(&self) -> usize {
                [$(stringify!($field)),+].len()
            }

            #[allow(unused_assignments)]
            fn field_mut(
                &mut self,
                i: usize,
            ) -> ::std::option::Option<&mut dyn $crate::host::HostValue> {
                let mut n = 0_usize;
                $(
                    if i == n {
                        return ::std::option::Option::Some(&mut self.$field);
                    }
                    n += 1;
                )+
                ::std::option::Option::None
            }
        }

        impl $crate::host::HostValue for $ty {
            $crate::impl_host_any!();

            fn shape(&self) -> $crate::host::Shape<'_> {
                $crate::host::Shape::Struct(self)
            }

            fn shape_mut(&mut self) -> $crate::host::ShapeMut<'_> {
                $crate::host::ShapeMut::Struct(self)
            }
        }
    };
}
