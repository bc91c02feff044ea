//! Static registration support for [`auto_register!`](crate::auto_register).

pub use inventory;

use crate::SerialResult;
use crate::registry::TypeRegistry;

/// A registration function submitted at link time.
pub struct AutoRegistration(pub fn(&TypeRegistry) -> SerialResult<bool>);

inventory::collect!(AutoRegistration);

pub(crate) fn apply(registry: &TypeRegistry) {
    for AutoRegistration(register) in inventory::iter::<AutoRegistration> {
        if let Err(err) = register(registry) {
            log::warn!("auto registration skipped a type: {err}");
        }
    }
}

/// Submits types for [`TypeRegistry::auto_register`].
///
/// Each entry names a type and the registration method to call on it:
/// `value`, `versioned` or `object`.
///
/// # Examples
///
/// ```no_run
/// use vc_serial::contract::SerialObject;
/// use vc_serial::engine::Serializer;
/// use vc_serial::registry::TypeRegistry;
/// use vc_serial::{SerialResult, auto_register, impl_typed};
///
/// #[derive(Default)]
/// struct Leaf(u32);
///
/// impl SerialObject for Leaf {
///     fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
///         s.add_u32(&mut self.0)
///     }
/// }
///
/// impl_typed!(Leaf, Reference, "leaf");
/// auto_register!(Leaf => object);
///
/// let registry = TypeRegistry::empty();
/// assert!(registry.auto_register());
/// assert!(registry.contains_type::<Leaf>());
/// ```
#[macro_export]
macro_rules! auto_register {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            const _: () = {
                fn __register(
                    registry: &$crate::registry::TypeRegistry,
                ) -> $crate::SerialResult<bool> {
                    $crate::__auto_register_call!(registry, $ty, $kind)
                }

                $crate::registry::auto::inventory::submit! {
                    $crate::registry::auto::AutoRegistration(__register)
                }
            };
        )*
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __auto_register_call {
    ($registry:ident, $ty:ty, value) => {
        $registry.register_value::<$ty>()
    };
    ($registry:ident, $ty:ty, versioned) => {
        $registry.register_versioned::<$ty>()
    };
    ($registry:ident, $ty:ty, object) => {
        $registry.register_object::<$ty>()
    };
}
