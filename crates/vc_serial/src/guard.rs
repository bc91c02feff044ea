//! Safety check for generic instantiations reached through dynamic slots.
//!
//! Restricted runtimes cannot materialize a generic instantiation that was
//! not compiled ahead of time. The guard records which closed types were
//! registered and, per generic definition, whether its registered
//! instances prove that any reference-typed argument shares one
//! implementation.
//!
//! The guard is inert until [`AotGuard::set_active`] turns it on.

use alloc::format;
use alloc::string::ToString;
use core::any::TypeId;
use core::sync::atomic::{AtomicBool, Ordering};

use vc_utils::hash::{ConcurrentMap, ConcurrentSet, NoOpHashState};

use crate::info::{TypeShape, Typed};
use crate::{SerialError, SerialResult};

// -----------------------------------------------------------------------------
// DefinitionClass

/// What the registered instances of a generic definition prove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionClass {
    /// More than one type argument; never provably shared.
    MultiArgument,
    /// Only value-typed arguments were registered.
    ValueTypedOnly,
    /// A reference-typed argument was registered, so every
    /// reference-typed instance shares its code.
    ReferenceTypeSafe,
}

// -----------------------------------------------------------------------------
// AotGuard

/// Process-wide registry of AOT-compiled instantiations.
///
/// # Examples
///
/// ```
/// use vc_serial::guard::AotGuard;
/// use vc_serial::info::{TypeKind, TypeShape, Typed};
///
/// struct Wrapper<T>(T);
/// impl<T: Typed> Typed for Wrapper<T> {
///     fn type_shape() -> TypeShape {
///         TypeShape::generic::<Self>("demo::Wrapper", TypeKind::Reference, vec![T::type_shape()])
///     }
/// }
///
/// let guard = AotGuard::new();
/// guard.register_type::<Wrapper<i32>>().unwrap();
/// guard.set_active(true);
///
/// assert!(guard.check(&Wrapper::<i32>::type_shape()).is_ok());
/// assert!(guard.check(&Wrapper::<u8>::type_shape()).is_err());
/// // Reported once.
/// assert!(guard.check(&Wrapper::<u8>::type_shape()).is_ok());
/// ```
#[derive(Debug, Default)]
pub struct AotGuard {
    active: AtomicBool,
    registered: ConcurrentSet<TypeId, NoOpHashState>,
    definitions: ConcurrentMap<&'static str, DefinitionClass>,
    flagged: ConcurrentSet<TypeId, NoOpHashState>,
}

impl AotGuard {
    /// Creates an inactive guard.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an active guard.
    pub fn active() -> Self {
        let guard = Self::new();
        guard.set_active(true);
        guard
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    /// Records a closed instantiation as compiled ahead of time.
    ///
    /// Registering a non-generic type while the guard is active is a
    /// contract violation.
    pub fn register(&self, shape: &TypeShape) -> SerialResult<()> {
        let Some(definition) = shape.definition() else {
            if self.is_active() {
                return Err(SerialError::misuse(format!(
                    "`{}` is not generic and cannot be registered with an active AOT guard",
                    shape.path()
                )));
            }
            self.registered.insert(shape.type_id());
            return Ok(());
        };

        let class = match shape.args() {
            [arg] if arg.is_reference() => DefinitionClass::ReferenceTypeSafe,
            [_] => DefinitionClass::ValueTypedOnly,
            _ => DefinitionClass::MultiArgument,
        };
        self.definitions
            .entry(definition)
            .and_modify(|known| {
                // Only upgrades: a proven reference-safe definition stays so.
                if class == DefinitionClass::ReferenceTypeSafe {
                    *known = class;
                }
            })
            .or_insert(class);
        self.registered.insert(shape.type_id());
        Ok(())
    }

    #[inline]
    pub fn register_type<T: Typed>(&self) -> SerialResult<()> {
        self.register(&T::type_shape())
    }

    /// Classification recorded for a generic definition.
    pub fn classification(&self, definition: &str) -> Option<DefinitionClass> {
        self.definitions.get(definition).map(|class| *class)
    }

    /// Returns `true` if `type_id` was registered.
    #[inline]
    pub fn is_registered(&self, type_id: TypeId) -> bool {
        self.registered.contains(&type_id)
    }

    /// Validates a type about to be handled dynamically.
    ///
    /// Passes when the guard is inactive, the type is registered or not
    /// generic, or it has a single reference-typed argument of a
    /// definition classified [`DefinitionClass::ReferenceTypeSafe`]. Any
    /// other instantiation fails with
    /// [`SerialError::AotUnsafeInstantiation`] the first time it is seen,
    /// and passes afterwards.
    pub fn check(&self, shape: &TypeShape) -> SerialResult<()> {
        if !self.is_active() || self.registered.contains(&shape.type_id()) {
            return Ok(());
        }
        let Some(definition) = shape.definition() else {
            return Ok(());
        };

        if let [arg] = shape.args() {
            if arg.is_reference()
                && self.classification(definition) == Some(DefinitionClass::ReferenceTypeSafe)
            {
                return Ok(());
            }
        }

        if self.flagged.insert(shape.type_id()) {
            log::warn!(
                "generic instantiation `{}` was not compiled ahead of time",
                shape.path()
            );
            return Err(SerialError::AotUnsafeInstantiation {
                type_name: shape.path().to_string(),
            });
        }
        Ok(())
    }
}
