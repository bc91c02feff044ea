//! The serialization contract.
//!
//! A payload describes its fields once, through a [`Serializer`]; the same
//! method encodes or decodes depending on the serializer's direction.
//!
//! - [`SerialValue`]: copied, no identity, always recursed into.
//! - [`Versioned`]: a value whose body is preceded by a schema version byte.
//! - [`SerialObject`]: reference semantics, held through [`Obj`].
//! - [`Dynamic`]: a payload whose concrete type is only known at runtime.
//!
//! [`Serializer`]: crate::engine::Serializer

// -----------------------------------------------------------------------------
// Modules

mod dynamic;
mod impls;
mod obj;

// -----------------------------------------------------------------------------
// Exports

pub use dynamic::Dynamic;
pub use obj::Obj;

pub(crate) use obj::address_of;

use crate::SerialResult;
use crate::engine::Serializer;

// -----------------------------------------------------------------------------
// Traits

/// A value-semantic payload.
///
/// # Examples
///
/// ```
/// use vc_serial::contract::SerialValue;
/// use vc_serial::engine::Serializer;
/// use vc_serial::SerialResult;
///
/// #[derive(Default, PartialEq, Debug)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl SerialValue for Point {
///     fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
///         s.add_i32(&mut self.x)?;
///         s.add_i32(&mut self.y)
///     }
/// }
/// ```
pub trait SerialValue: Default + 'static {
    fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()>;
}

/// A value payload with a schema version.
///
/// On write `version` is [`VERSION`](Self::VERSION); on read it is the byte
/// found in the stream, so older layouts can be decoded.
pub trait Versioned: Default + 'static {
    const VERSION: u8;

    fn transfer_versioned(&mut self, s: &mut Serializer<'_>, version: u8) -> SerialResult<()>;
}

/// A reference-semantic payload.
///
/// Instances live in an [`Obj`] so that graphs can share and cycle through
/// them. Objects that evolve call
/// [`Serializer::add_version`](crate::engine::Serializer::add_version)
/// at the start of their body.
pub trait SerialObject: 'static {
    fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()>;
}
