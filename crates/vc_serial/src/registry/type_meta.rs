use alloc::rc::Rc;
use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::fmt;

use crate::info::TypeShape;
use crate::registry::Extension;

/// Produces a fresh, default-initialized instance wrapped as the engine
/// stores it (`RefCell<T>` behind an `Rc`).
pub type Constructor = Arc<dyn Fn() -> Rc<dyn Any> + Send + Sync>;

// -----------------------------------------------------------------------------
// TypeMeta

/// Registry entry for one closed type.
#[derive(Clone)]
pub struct TypeMeta {
    shape: TypeShape,
    constructor: Option<Constructor>,
    extension: Option<Arc<dyn Extension>>,
}

impl TypeMeta {
    #[inline]
    pub fn new(shape: TypeShape) -> Self {
        Self {
            shape,
            constructor: None,
            extension: None,
        }
    }

    #[inline]
    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    #[inline]
    pub fn with_extension(mut self, extension: Arc<dyn Extension>) -> Self {
        self.extension = Some(extension);
        self
    }

    #[inline]
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.shape.type_id()
    }

    #[inline]
    pub fn path(&self) -> &str {
        self.shape.path()
    }

    #[inline]
    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    #[inline]
    pub fn extension(&self) -> Option<&Arc<dyn Extension>> {
        self.extension.as_ref()
    }

    /// Runs the constructor, if any.
    #[inline]
    pub fn construct(&self) -> Option<Rc<dyn Any>> {
        self.constructor.as_ref().map(|ctor| ctor())
    }
}

impl fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMeta")
            .field("path", &self.shape.path())
            .field("constructible", &self.constructor.is_some())
            .field("extension", &self.extension.is_some())
            .finish()
    }
}
