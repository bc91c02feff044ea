//! Static type descriptions.
//!
//! Every type that crosses a dynamic slot implements [`Typed`], which hands
//! out a [`TypeShape`]: the runtime discriminant, a stable path, the crate
//! version, an optional stable identifier, the value/reference kind and, for
//! generic instances, the open definition plus its argument shapes.
//!
//! Resolvers encode shapes, the registry indexes them and the AOT guard
//! classifies generic definitions by them.

// -----------------------------------------------------------------------------
// Modules

mod primitives;
mod shape;

// -----------------------------------------------------------------------------
// Exports

pub use primitives::reserved_id;
pub use shape::{TypeKind, TypeShape, Typed};

/// Implements [`Typed`] for a non-generic type.
///
/// The path is `module_path!()::Name`, the version is the calling crate's
/// `CARGO_PKG_VERSION`. An optional third argument sets the stable id.
///
/// # Examples
///
/// ```
/// use vc_serial::impl_typed;
/// use vc_serial::info::{TypeKind, Typed};
///
/// #[derive(Default)]
/// struct Leaf(u32);
///
/// impl_typed!(Leaf, Reference, "leaf");
///
/// let shape = Leaf::type_shape();
/// assert_eq!(shape.kind(), TypeKind::Reference);
/// assert_eq!(shape.stable_id(), Some("leaf"));
/// assert!(shape.path().ends_with("::Leaf"));
/// ```
#[macro_export]
macro_rules! impl_typed {
    ($ty:ident, $kind:ident) => {
        impl $crate::info::Typed for $ty {
            fn type_shape() -> $crate::info::TypeShape {
                $crate::info::TypeShape::leaf::<$ty>(
                    concat!(module_path!(), "::", stringify!($ty)),
                    $crate::info::TypeKind::$kind,
                )
                .with_version(env!("CARGO_PKG_VERSION"))
            }
        }
    };
    ($ty:ident, $kind:ident, $id:literal) => {
        impl $crate::info::Typed for $ty {
            fn type_shape() -> $crate::info::TypeShape {
                $crate::info::TypeShape::leaf::<$ty>(
                    concat!(module_path!(), "::", stringify!($ty)),
                    $crate::info::TypeKind::$kind,
                )
                .with_version(env!("CARGO_PKG_VERSION"))
                .with_stable_id($id)
            }
        }
    };
}
