use alloc::boxed::Box;
use core::any::{Any, TypeId};
use core::fmt;

use super::{Obj, SerialObject, SerialValue, Versioned};

// -----------------------------------------------------------------------------
// Dynamic

/// A payload whose concrete type is only known at runtime.
///
/// Values are boxed directly; objects are boxed as their [`Obj`] handle,
/// keeping identity. [`payload_type`](Self::payload_type) is always the
/// `TypeId` of the payload type `T`, never of the handle.
///
/// # Examples
///
/// ```
/// use vc_serial::SerialResult;
/// use vc_serial::contract::{Dynamic, Obj, SerialObject};
/// use vc_serial::engine::Serializer;
///
/// #[derive(Default)]
/// struct Cursor(u64);
///
/// impl SerialObject for Cursor {
///     fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
///         s.add_u64(&mut self.0)
///     }
/// }
///
/// let value = Dynamic::value(7_i32);
/// assert_eq!(value.downcast_ref::<i32>(), Some(&7));
///
/// let obj = Obj::new(Cursor(3));
/// let object = Dynamic::object(obj.clone());
/// assert!(object.is::<Cursor>());
/// assert!(object.as_object::<Cursor>().unwrap().ptr_eq(&obj));
/// ```
pub struct Dynamic {
    payload_type: TypeId,
    payload: Box<dyn Any>,
}

impl Dynamic {
    pub fn value<T: SerialValue>(value: T) -> Self {
        Self {
            payload_type: TypeId::of::<T>(),
            payload: Box::new(value),
        }
    }

    pub fn versioned<T: Versioned>(value: T) -> Self {
        Self {
            payload_type: TypeId::of::<T>(),
            payload: Box::new(value),
        }
    }

    pub fn object<T: SerialObject>(obj: Obj<T>) -> Self {
        Self {
            payload_type: TypeId::of::<T>(),
            payload: Box::new(obj),
        }
    }

    /// Wraps an already boxed payload.
    ///
    /// Used by extensions that decode types the caller cannot name.
    pub fn from_parts(payload_type: TypeId, payload: Box<dyn Any>) -> Self {
        Self {
            payload_type,
            payload,
        }
    }

    #[inline]
    pub fn payload_type(&self) -> TypeId {
        self.payload_type
    }

    /// Returns `true` if the payload was built from `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.payload_type == TypeId::of::<T>()
    }

    /// Borrows a value payload.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }

    /// Borrows an object payload's handle.
    #[inline]
    pub fn as_object<T: 'static>(&self) -> Option<&Obj<T>> {
        self.payload.downcast_ref()
    }

    /// Takes a value payload out.
    pub fn into_value<T: 'static>(self) -> Result<T, Self> {
        let Self {
            payload_type,
            payload,
        } = self;
        match payload.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(payload) => Err(Self {
                payload_type,
                payload,
            }),
        }
    }

    #[inline]
    pub(crate) fn payload_mut(&mut self) -> &mut dyn Any {
        &mut *self.payload
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dynamic")
            .field("payload_type", &self.payload_type)
            .finish_non_exhaustive()
    }
}
