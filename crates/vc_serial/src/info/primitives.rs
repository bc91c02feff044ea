use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use super::{TypeKind, TypeShape, Typed};

macro_rules! impl_primitive {
    ($($ty:ty => $path:literal, $id:literal;)*) => {
        $(
            impl Typed for $ty {
                #[inline]
                fn type_shape() -> TypeShape {
                    TypeShape::leaf::<$ty>($path, TypeKind::Value).with_stable_id($id)
                }
            }
        )*

        /// Returns the reserved stable id of a built-in type path.
        ///
        /// ```
        /// assert_eq!(vc_serial::info::reserved_id("u32"), Some("u4"));
        /// assert_eq!(vc_serial::info::reserved_id("demo::Leaf"), None);
        /// ```
        pub fn reserved_id(path: &str) -> Option<&'static str> {
            match path {
                $($path => Some($id),)*
                "alloc::vec::Vec" => Some(LIST_ID),
                _ => None,
            }
        }
    };
}

const LIST_ID: &str = "list";

impl_primitive! {
    bool => "bool", "z";
    u8 => "u8", "u1";
    i8 => "i8", "i1";
    u16 => "u16", "u2";
    i16 => "i16", "i2";
    u32 => "u32", "u4";
    i32 => "i32", "i4";
    u64 => "u64", "u8";
    i64 => "i64", "i8";
    u128 => "u128", "u16";
    i128 => "i128", "i16";
    f32 => "f32", "f4";
    f64 => "f64", "f8";
    char => "char", "c";
    String => "alloc::string::String", "s";
}

impl<T: Typed> Typed for Vec<T> {
    fn type_shape() -> TypeShape {
        TypeShape::generic::<Self>("alloc::vec::Vec", TypeKind::Value, vec![T::type_shape()])
            .with_stable_id(LIST_ID)
    }
}
