use alloc::format;
use alloc::string::ToString;
use alloc::sync::Arc;
use core::any::{Any, TypeId, type_name};
use core::marker::PhantomData;

use crate::contract::{Dynamic, Obj, SerialObject, SerialValue, Versioned};
use crate::engine::Serializer;
use crate::info::TypeShape;
use crate::{SerialError, SerialResult};

// -----------------------------------------------------------------------------
// Extension

/// Encodes and decodes the body of a [`Dynamic`] payload of one type.
///
/// The engine has already written the type tag and opened the section when
/// `write`/`read` run.
pub trait Extension: Send + Sync {
    /// The payload type this extension is bound to.
    fn element_type(&self) -> TypeId;

    fn write(&self, payload: &mut dyn Any, s: &mut Serializer<'_>) -> SerialResult<()>;

    fn read(&self, s: &mut Serializer<'_>) -> SerialResult<Dynamic>;
}

/// Supplies extensions for runtime shapes.
///
/// Failures are reported by the engine as
/// [`SerialEvent::ExtensionFailed`](crate::events::SerialEvent::ExtensionFailed).
pub trait ExtensionFactory: Send + Sync {
    fn resolve(&self, shape: &TypeShape) -> SerialResult<Arc<dyn Extension>>;
}

fn payload_mismatch<T>() -> SerialError {
    SerialError::misuse(format!(
        "extension for `{}` handed a payload of another type",
        type_name::<T>()
    ))
}

// -----------------------------------------------------------------------------
// ValueExtension

/// Extension for a [`SerialValue`].
pub struct ValueExtension<T>(PhantomData<fn() -> T>);

impl<T> ValueExtension<T> {
    #[inline]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ValueExtension<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SerialValue> Extension for ValueExtension<T> {
    #[inline]
    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn write(&self, payload: &mut dyn Any, s: &mut Serializer<'_>) -> SerialResult<()> {
        match payload.downcast_mut::<T>() {
            Some(value) => value.transfer(s),
            None => Err(payload_mismatch::<T>()),
        }
    }

    fn read(&self, s: &mut Serializer<'_>) -> SerialResult<Dynamic> {
        let mut value = T::default();
        value.transfer(s)?;
        Ok(Dynamic::value(value))
    }
}

// -----------------------------------------------------------------------------
// VersionedExtension

/// Extension for a [`Versioned`] value. The body starts with the version byte.
pub struct VersionedExtension<T>(PhantomData<fn() -> T>);

impl<T> VersionedExtension<T> {
    #[inline]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for VersionedExtension<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Versioned> Extension for VersionedExtension<T> {
    #[inline]
    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn write(&self, payload: &mut dyn Any, s: &mut Serializer<'_>) -> SerialResult<()> {
        match payload.downcast_mut::<T>() {
            Some(value) => {
                let version = s.add_version(T::VERSION)?;
                value.transfer_versioned(s, version)
            }
            None => Err(payload_mismatch::<T>()),
        }
    }

    fn read(&self, s: &mut Serializer<'_>) -> SerialResult<Dynamic> {
        let mut value = T::default();
        let version = s.add_version(T::VERSION)?;
        value.transfer_versioned(s, version)?;
        Ok(Dynamic::versioned(value))
    }
}

// -----------------------------------------------------------------------------
// ObjectExtension

/// Extension for a [`SerialObject`]. Goes through the identity layer, so a
/// dynamic slot shares ids with ordinary object slots.
pub struct ObjectExtension<T>(PhantomData<fn() -> T>);

impl<T> ObjectExtension<T> {
    #[inline]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ObjectExtension<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SerialObject> Extension for ObjectExtension<T> {
    #[inline]
    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn write(&self, payload: &mut dyn Any, s: &mut Serializer<'_>) -> SerialResult<()> {
        match payload.downcast_ref::<Obj<T>>() {
            Some(obj) => s.write_reference(obj),
            None => Err(payload_mismatch::<T>()),
        }
    }

    fn read(&self, s: &mut Serializer<'_>) -> SerialResult<Dynamic> {
        s.read_reference::<T>().map(Dynamic::object)
    }
}

/// Error for a shape the factory has no handler for.
pub(crate) fn missing_extension(shape: &TypeShape) -> SerialError {
    SerialError::ExtensionResolution {
        type_name: shape.path().to_string(),
        cause: "no extension registered".to_string(),
    }
}
