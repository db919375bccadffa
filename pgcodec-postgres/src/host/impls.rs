use std::any::TypeId;
use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use pgcodec_core::error::BoxDynError;

use super::{
    HostValue, ListTarget, ListValue, NullableTarget, NullableValue, Shape, ShapeMut,
    StructFields, StructFieldsMut,
};

// Standard library scalars are adapted by the builtin wrapping step rather than exposing
// capabilities themselves, so codecs can keep exact fast paths for their natural types.
macro_rules! impl_host_builtin {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl HostValue for $ty {
                crate::impl_host_any!();

                fn shape(&self) -> Shape<'_> {
                    Shape::Builtin
                }

                fn shape_mut(&mut self) -> ShapeMut<'_> {
                    ShapeMut::Builtin
                }
            }
        )+
    };
}

impl_host_builtin!(
    bool,
    i8,
    u8,
    i16,
    u16,
    i32,
    u32,
    i64,
    u64,
    isize,
    usize,
    f32,
    f64,
    String,
    &'static str,
    NaiveDate,
    NaiveDateTime,
    NaiveTime,
    DateTime<Utc>,
    TimeDelta,
    IpAddr,
    HashMap<String, Option<String>>,
    HashMap<String, String>,
);

impl<T> NullableValue for Option<T>
where
    T: HostValue + Default + 'static,
{
    fn get(&self) -> Option<&dyn HostValue> {
        self.as_ref().map(|v| v as &dyn HostValue)
    }

    fn sample(&self) -> Box<dyn HostValue> {
        Box::new(T::default())
    }
}

impl<T> NullableTarget for Option<T>
where
    T: HostValue + Default + 'static,
{
    fn set_none(&mut self) {
        *self = None;
    }

    fn insert_default(&mut self) -> &mut dyn HostValue {
        self.insert(T::default())
    }

    fn sample(&self) -> Box<dyn HostValue> {
        Box::new(T::default())
    }
}

impl<T> HostValue for Option<T>
where
    T: HostValue + Default + 'static,
{
    crate::impl_host_any!();

    fn shape(&self) -> Shape<'_> {
        Shape::Nullable(self)
    }

    fn shape_mut(&mut self) -> ShapeMut<'_> {
        ShapeMut::Nullable(self)
    }
}

impl<T> HostValue for Box<T>
where
    T: HostValue + 'static,
{
    crate::impl_host_any!();

    fn shape(&self) -> Shape<'_> {
        Shape::Pointer(&**self)
    }

    fn shape_mut(&mut self) -> ShapeMut<'_> {
        ShapeMut::Pointer(&mut **self)
    }
}

impl<T> ListValue for Vec<T>
where
    T: HostValue + Default + 'static,
{
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, i: usize) -> Option<&dyn HostValue> {
        self.as_slice().get(i).map(|v| v as &dyn HostValue)
    }

    fn element_sample(&self) -> Box<dyn HostValue> {
        Box::new(T::default())
    }
}

impl<T> ListTarget for Vec<T>
where
    T: HostValue + Default + 'static,
{
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn resize(&mut self, len: usize) -> Result<(), BoxDynError> {
        self.clear();
        self.resize_with(len, T::default);
        Ok(())
    }

    fn get_mut(&mut self, i: usize) -> Option<&mut dyn HostValue> {
        self.as_mut_slice()
            .get_mut(i)
            .map(|v| v as &mut dyn HostValue)
    }

    fn element_sample(&self) -> Box<dyn HostValue> {
        Box::new(T::default())
    }
}

// `Vec<u8>` is `bytea`, not an array of `"char"`.
impl<T> HostValue for Vec<T>
where
    T: HostValue + Default + 'static,
{
    crate::impl_host_any!();

    fn shape(&self) -> Shape<'_> {
        if TypeId::of::<T>() == TypeId::of::<u8>() {
            Shape::Builtin
        } else {
            Shape::Slice(self)
        }
    }

    fn shape_mut(&mut self) -> ShapeMut<'_> {
        if TypeId::of::<T>() == TypeId::of::<u8>() {
            ShapeMut::Builtin
        } else {
            ShapeMut::Slice(self)
        }
    }
}

impl<T, const N: usize> ListValue for [T; N]
where
    T: HostValue + Default + 'static,
{
    fn len(&self) -> usize {
        N
    }

    fn get(&self, i: usize) -> Option<&dyn HostValue> {
        self.as_slice().get(i).map(|v| v as &dyn HostValue)
    }

    fn element_sample(&self) -> Box<dyn HostValue> {
        Box::new(T::default())
    }
}

impl<T, const N: usize> ListTarget for [T; N]
where
    T: HostValue + Default + 'static,
{
    fn len(&self) -> usize {
        N
    }

    fn resize(&mut self, len: usize) -> Result<(), BoxDynError> {
        if len != N {
            return Err(format!(
                "cannot scan an array of {len} elements into a fixed array of {N} elements"
            )
            .into());
        }

        Ok(())
    }

    fn get_mut(&mut self, i: usize) -> Option<&mut dyn HostValue> {
        self.as_mut_slice()
            .get_mut(i)
            .map(|v| v as &mut dyn HostValue)
    }

    fn element_sample(&self) -> Box<dyn HostValue> {
        Box::new(T::default())
    }
}

// `[u8; 16]` is a UUID.
impl<T, const N: usize> HostValue for [T; N]
where
    T: HostValue + Default + 'static,
{
    crate::impl_host_any!();

    fn shape(&self) -> Shape<'_> {
        if TypeId::of::<[T; N]>() == TypeId::of::<[u8; 16]>() {
            Shape::Builtin
        } else {
            Shape::FixedArray(self)
        }
    }

    fn shape_mut(&mut self) -> ShapeMut<'_> {
        if TypeId::of::<[T; N]>() == TypeId::of::<[u8; 16]>() {
            ShapeMut::Builtin
        } else {
            ShapeMut::FixedArray(self)
        }
    }
}

macro_rules! impl_host_tuple {
    ($len:literal; $($idx:tt : $T:ident),+) => {
        impl<$($T),+> StructFields for ($($T,)+)
        where
            $($T: HostValue + 'static,)+
        {
            fn field_count(&self) -> usize {
                $len
            }

            fn field(&self, i: usize) -> Option<&dyn HostValue> {
                match i {
                    $($idx => Some(&self.$idx),)+
                    _ => None,
                }
            }
        }

        impl<$($T),+> StructFieldsMut for ($($T,)+)
        where
            $($T: HostValue + 'static,)+
        {
            fn field_count(&self) -> usize {
                $len
            }

            fn field_mut(&mut self, i: usize) -> Option<&mut dyn HostValue> {
                match i {
                    $($idx => Some(&mut self.$idx),)+
                    _ => None,
                }
            }
        }

        impl<$($T),+> HostValue for ($($T,)+)
        where
            $($T: HostValue + 'static,)+
        {
            crate::impl_host_any!();

            fn shape(&self) -> Shape<'_> {
                Shape::Struct(self)
            }

            fn shape_mut(&mut self) -> ShapeMut<'_> {
                ShapeMut::Struct(self)
            }
        }
    };
}

impl_host_tuple!(1; 0: T1);
impl_host_tuple!(2; 0: T1, 1: T2);
impl_host_tuple!(3; 0: T1, 1: T2, 2: T3);
impl_host_tuple!(4; 0: T1, 1: T2, 2: T3, 3: T4);
impl_host_tuple!(5; 0: T1, 1: T2, 2: T3, 3: T4, 4: T5);
impl_host_tuple!(6; 0: T1, 1: T2, 2: T3, 3: T4, 4: T5, 5: T6);
impl_host_tuple!(7; 0: T1, 1: T2, 2: T3, 3: T4, 4: T5, 5: T6, 6: T7);
impl_host_tuple!(8; 0: T1, 1: T2, 2: T3, 3: T4, 4: T5, 5: T6, 6: T7, 7: T8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_and_uuid_arrays_are_builtin() {
        assert!(matches!(vec![1_u8, 2].shape(), Shape::Builtin));
        assert!(matches!([0_u8; 16].shape(), Shape::Builtin));
        assert!(matches!(vec![1_i32].shape(), Shape::Slice(_)));
        assert!(matches!([0_u8; 4].shape(), Shape::FixedArray(_)));
    }

    #[test]
    fn option_reports_null() {
        let none: Option<i32> = None;
        let some = Some(5_i32);

        assert!((&none as &dyn HostValue).is_null());
        assert!(!(&some as &dyn HostValue).is_null());
    }

    #[test]
    fn fixed_array_rejects_resize() {
        let mut arr = [0_i32; 3];

        assert!(ListTarget::resize(&mut arr, 3).is_ok());
        assert!(ListTarget::resize(&mut arr, 2).is_err());
    }

    #[test]
    fn tuple_fields_in_order() {
        let t = (1_i32, String::from("a"), Some(2.5_f64));
        let fields: &dyn StructFields = &t;

        assert_eq!(fields.field_count(), 3);
        assert!(fields.field(1).is_some_and(|f| f.downcast_ref::<String>().is_some()));
        assert!(fields.field(3).is_none());
    }
}
