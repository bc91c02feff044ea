use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId, type_name};
use core::cell::RefCell;
use core::fmt;

use vc_utils::TypeIdMap;
use vc_utils::hash::ConcurrentMap;

use crate::contract::{SerialObject, SerialValue, Versioned};
use crate::info::{TypeShape, Typed};
use crate::registry::extension::missing_extension;
use crate::registry::{Constructor, Extension, ExtensionFactory, TypeMeta};
use crate::registry::{ObjectExtension, ValueExtension, VersionedExtension};
use crate::resolver::TypeTag;
use crate::{SerialError, SerialResult};

// -----------------------------------------------------------------------------
// ConstructionService

/// Instantiates objects by runtime type during decode.
///
/// The engine never constructs objects itself. The returned instance must
/// be an `Rc<RefCell<T>>` for the requested `T`; `None` means the type is
/// not constructible and surfaces as
/// [`SerialError::ConstructionFailure`].
pub trait ConstructionService: Send + Sync {
    fn construct(&self, type_id: TypeId) -> Option<Rc<dyn Any>>;
}

// -----------------------------------------------------------------------------
// TypeRegistry

/// The closed-world table of serializable types.
///
/// All methods take `&self`, so registration may continue after the
/// registry is shared through an `Arc`. Lookups never block registrations
/// on other shards.
///
/// Registration walks the shape tree and records the argument count of
/// every stable key it meets. Stable tag decoding relies on that table to
/// know how many subtrees follow an id.
///
/// # Examples
///
/// ```
/// use vc_serial::registry::TypeRegistry;
///
/// let registry = TypeRegistry::new();
/// assert!(registry.contains_type::<u32>());
/// assert_eq!(registry.arity("u4"), Some(0));
///
/// registry.register_value::<Vec<u32>>().unwrap();
/// assert_eq!(registry.arity("list"), Some(1));
/// assert!(registry.get_with_name("alloc::vec::Vec<u32>").is_some());
/// ```
pub struct TypeRegistry {
    metas: TypeIdMap<Arc<TypeMeta>>,
    by_name: ConcurrentMap<String, TypeId>,
    by_tag: ConcurrentMap<TypeTag, TypeId>,
    arities: ConcurrentMap<String, usize>,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`].
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! register_builtins {
    ($registry:ident: $($ty:ty),* $(,)?) => {
        $(
            if let Err(err) = $registry.register_value::<$ty>() {
                log::error!("failed to register built-in `{}`: {err}", type_name::<$ty>());
            }
        )*
    };
}

impl TypeRegistry {
    /// Creates a registry without any type.
    pub fn empty() -> Self {
        Self {
            metas: TypeIdMap::new(),
            by_name: ConcurrentMap::default(),
            by_tag: ConcurrentMap::default(),
            arities: ConcurrentMap::default(),
        }
    }

    /// Creates a registry with the built-in value types.
    ///
    /// - `bool` `char` `f32` `f64`
    /// - `i8 - i128` `u8 - u128`
    /// - `String`
    pub fn new() -> Self {
        let registry = Self::empty();
        register_builtins! {
            registry: bool, char, f32, f64,
            u8, u16, u32, u64, u128,
            i8, i16, i32, i64, i128,
            String,
        }
        registry
    }

    // -------------------------------------------------------------------------
    // Registration

    /// Registers a value type.
    ///
    /// Returns `Ok(false)` if the type was already registered.
    pub fn register_value<T: SerialValue + Typed>(&self) -> SerialResult<bool> {
        self.register_meta(
            TypeMeta::new(T::type_shape()).with_extension(Arc::new(ValueExtension::<T>::new())),
        )
    }

    /// Registers a versioned value type.
    pub fn register_versioned<T: Versioned + Typed>(&self) -> SerialResult<bool> {
        self.register_meta(
            TypeMeta::new(T::type_shape())
                .with_extension(Arc::new(VersionedExtension::<T>::new())),
        )
    }

    /// Registers an object type constructed through [`Default`].
    pub fn register_object<T: SerialObject + Typed + Default>(&self) -> SerialResult<bool> {
        self.register_object_with::<T>(T::default)
    }

    /// Registers an object type with a custom constructor.
    pub fn register_object_with<T: SerialObject + Typed>(
        &self,
        ctor: impl Fn() -> T + Send + Sync + 'static,
    ) -> SerialResult<bool> {
        let constructor: Constructor =
            Arc::new(move || Rc::new(RefCell::new(ctor())) as Rc<dyn Any>);
        self.register_meta(
            TypeMeta::new(T::type_shape())
                .with_constructor(constructor)
                .with_extension(Arc::new(ObjectExtension::<T>::new())),
        )
    }

    /// Registers an object type that can be written but never constructed.
    ///
    /// Decoding one fails with [`SerialError::ConstructionFailure`].
    pub fn register_object_unconstructible<T: SerialObject + Typed>(
        &self,
    ) -> SerialResult<bool> {
        self.register_meta(
            TypeMeta::new(T::type_shape()).with_extension(Arc::new(ObjectExtension::<T>::new())),
        )
    }

    /// Registers a prepared [`TypeMeta`].
    ///
    /// Fails with [`SerialError::Misuse`] if the shape contradicts an
    /// earlier registration: a stable key with another argument count, or
    /// a name or tag already bound to another type. Nothing is recorded on
    /// failure.
    pub fn register_meta(&self, meta: TypeMeta) -> SerialResult<bool> {
        let type_id = meta.type_id();
        if self.metas.contains(&type_id) {
            return Ok(false);
        }

        let shape = meta.shape();
        let name = shape.qualified_name();
        let tag = TypeTag::from_shape(shape);

        let mut nodes = Vec::new();
        collect_arities(shape, &mut nodes);
        for &(key, arity) in &nodes {
            if let Some(known) = self.arities.get(key) {
                if *known != arity {
                    return Err(SerialError::misuse(format!(
                        "stable key `{key}` registered with {} arguments, `{}` has {arity}",
                        *known,
                        shape.path(),
                    )));
                }
            }
        }
        if let Some(other) = self.by_tag.get(&tag) {
            if *other != type_id {
                return Err(SerialError::misuse(format!(
                    "tag of `{}` is already bound to another type",
                    shape.path()
                )));
            }
        }
        if let Some(other) = self.by_name.get(&name) {
            if *other != type_id {
                return Err(SerialError::misuse(format!(
                    "name `{name}` is already bound to another type"
                )));
            }
        }

        for (key, arity) in nodes {
            self.arities.entry(key.to_string()).or_insert(arity);
        }
        let inserted = self.metas.try_insert(type_id, || Arc::new(meta));
        if inserted {
            self.by_tag.insert(tag, type_id);
            self.by_name.insert(name, type_id);
        }
        Ok(inserted)
    }

    /// Replaces the extension of a registered type.
    pub fn set_extension<T: Typed>(&self, extension: Arc<dyn Extension>) -> SerialResult<()> {
        let type_id = TypeId::of::<T>();
        let Some(meta) = self.metas.get(&type_id) else {
            return Err(SerialError::misuse(format!(
                "cannot set the extension of unregistered type `{}`",
                type_name::<T>()
            )));
        };
        let updated = TypeMeta::clone(&meta).with_extension(extension);
        self.metas.insert(type_id, Arc::new(updated));
        Ok(())
    }

    /// Applies every registration submitted through
    /// [`auto_register!`](crate::auto_register).
    ///
    /// Repeated calls are cheap and never insert duplicates. Returns
    /// `false` when the `auto_register` feature is disabled.
    pub fn auto_register(&self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            crate::registry::auto::apply(self);
            true
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }

    // -------------------------------------------------------------------------
    // Queries

    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.metas.contains(&type_id)
    }

    #[inline]
    pub fn contains_type<T: 'static>(&self) -> bool {
        self.contains(TypeId::of::<T>())
    }

    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<Arc<TypeMeta>> {
        self.metas.get(&type_id)
    }

    /// Looks a type up by its `path@version` name.
    pub fn get_with_name(&self, name: &str) -> Option<Arc<TypeMeta>> {
        let type_id = *self.by_name.get(name)?;
        self.get(type_id)
    }

    /// Looks a type up by its stable tag.
    pub fn get_with_tag(&self, tag: &TypeTag) -> Option<Arc<TypeMeta>> {
        let type_id = *self.by_tag.get(tag)?;
        self.get(type_id)
    }

    /// Argument count recorded for a stable key.
    pub fn arity(&self, key: &str) -> Option<usize> {
        self.arities.get(key).map(|arity| *arity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }
}

fn collect_arities<'a>(shape: &'a TypeShape, out: &mut Vec<(&'a str, usize)>) {
    out.push((shape.stable_key(), shape.arity()));
    for arg in shape.args() {
        collect_arities(arg, out);
    }
}

impl ConstructionService for TypeRegistry {
    fn construct(&self, type_id: TypeId) -> Option<Rc<dyn Any>> {
        self.metas.with(&type_id, |meta| meta.construct()).flatten()
    }
}

impl ExtensionFactory for TypeRegistry {
    fn resolve(&self, shape: &TypeShape) -> SerialResult<Arc<dyn Extension>> {
        self.metas
            .with(&shape.type_id(), |meta| meta.extension().cloned())
            .flatten()
            .ok_or_else(|| missing_extension(shape))
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.len())
            .field("stable_keys", &self.arities.len())
            .finish()
    }
}
