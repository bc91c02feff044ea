use alloc::rc::Rc;
use core::any::Any;
use core::cell::{BorrowMutError, Ref, RefCell, RefMut};
use core::fmt;

// -----------------------------------------------------------------------------
// Obj

/// A shared, mutable object with stable identity.
///
/// Cloning an `Obj` clones the handle, not the object. Two handles are the
/// same object exactly when [`ptr_eq`](Self::ptr_eq) holds; structural
/// equality never matters to the graph layer.
///
/// # Examples
///
/// ```
/// use vc_serial::contract::Obj;
///
/// let a = Obj::new(5_u32);
/// let b = a.clone();
/// *b.borrow_mut() += 1;
///
/// assert_eq!(*a.borrow(), 6);
/// assert!(a.ptr_eq(&b));
/// assert!(!a.ptr_eq(&Obj::new(6_u32)));
/// ```
pub struct Obj<T>(Rc<RefCell<T>>);

impl<T> Obj<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Immutably borrows the object.
    ///
    /// # Panics
    ///
    /// Panics if the object is currently mutably borrowed.
    #[inline]
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutably borrows the object.
    ///
    /// # Panics
    ///
    /// Panics if the object is currently borrowed.
    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    #[inline]
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, T>, BorrowMutError> {
        self.0.try_borrow_mut()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The allocation address, unique while any handle is alive.
    #[inline]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl<T: 'static> Obj<T> {
    #[inline]
    pub(crate) fn erased(&self) -> Rc<dyn Any> {
        Rc::clone(&self.0) as Rc<dyn Any>
    }

    /// Recovers a typed handle from an erased slot instance.
    #[inline]
    pub(crate) fn from_erased(instance: Rc<dyn Any>) -> Option<Self> {
        instance.downcast::<RefCell<T>>().ok().map(Self)
    }
}

impl<T> Clone for Obj<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Default> Default for Obj<T> {
    #[inline]
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Obj<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Obj({:#x})", self.identity())
    }
}

/// Erased identity of an instance bound into a slot.
#[inline]
pub(crate) fn address_of(instance: &Rc<dyn Any>) -> usize {
    Rc::as_ptr(instance).cast::<()>() as usize
}

#[cfg(test)]
mod tests {
    use super::{Obj, address_of};

    #[test]
    fn erased_round_trip_keeps_identity() {
        let obj = Obj::new(String::from("node"));
        let erased = obj.erased();
        assert_eq!(address_of(&erased), obj.identity());

        let back = Obj::<String>::from_erased(erased).unwrap();
        assert!(back.ptr_eq(&obj));
        assert!(Obj::<u8>::from_erased(obj.erased()).is_none());
    }
}
