use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;

// -----------------------------------------------------------------------------
// TypeKind

/// Whether a type has value or reference semantics.
///
/// The AOT guard only trusts generic instantiations shared across
/// reference-typed arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Copied on transfer, no identity.
    Value,
    /// Held through [`Obj`](crate::contract::Obj), has identity.
    Reference,
}

// -----------------------------------------------------------------------------
// TypeShape

/// A runtime description of a closed type.
///
/// Non-generic shapes are built with [`leaf`](Self::leaf), generic
/// instances with [`generic`](Self::generic), which renders the path as
/// `Definition<Arg0, Arg1>`.
///
/// # Examples
///
/// ```
/// use vc_serial::info::{TypeKind, TypeShape, Typed};
///
/// struct Pair<A, B>(A, B);
///
/// let shape = TypeShape::generic::<Pair<u8, String>>(
///     "demo::Pair",
///     TypeKind::Value,
///     vec![u8::type_shape(), String::type_shape()],
/// );
///
/// assert_eq!(shape.path(), "demo::Pair<u8, alloc::string::String>");
/// assert_eq!(shape.definition(), Some("demo::Pair"));
/// assert_eq!(shape.arity(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeShape {
    type_id: TypeId,
    path: Cow<'static, str>,
    version: &'static str,
    stable_id: Option<&'static str>,
    kind: TypeKind,
    definition: Option<&'static str>,
    args: Vec<TypeShape>,
}

impl TypeShape {
    /// Describes a non-generic type.
    pub fn leaf<T: 'static>(path: &'static str, kind: TypeKind) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            path: Cow::Borrowed(path),
            version: "",
            stable_id: None,
            kind,
            definition: None,
            args: Vec::new(),
        }
    }

    /// Describes a closed generic instance of `definition`.
    pub fn generic<T: 'static>(
        definition: &'static str,
        kind: TypeKind,
        args: Vec<TypeShape>,
    ) -> Self {
        let mut path = String::from(definition);
        path.push('<');
        for (index, arg) in args.iter().enumerate() {
            if index > 0 {
                path.push_str(", ");
            }
            path.push_str(arg.path());
        }
        path.push('>');

        Self {
            type_id: TypeId::of::<T>(),
            path: Cow::Owned(path),
            version: "",
            stable_id: None,
            kind,
            definition: Some(definition),
            args,
        }
    }

    /// Sets the stable identifier.
    ///
    /// For a generic instance this identifies the definition; the arguments
    /// carry their own ids.
    #[inline]
    pub fn with_stable_id(mut self, stable_id: &'static str) -> Self {
        self.stable_id = Some(stable_id);
        self
    }

    /// Sets the version qualifier used by name-based tags.
    #[inline]
    pub fn with_version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn version(&self) -> &'static str {
        self.version
    }

    #[inline]
    pub fn stable_id(&self) -> Option<&'static str> {
        self.stable_id
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        self.kind == TypeKind::Reference
    }

    /// The open generic definition, `None` for non-generic types.
    #[inline]
    pub fn definition(&self) -> Option<&'static str> {
        self.definition
    }

    #[inline]
    pub fn args(&self) -> &[TypeShape] {
        &self.args
    }

    #[inline]
    pub fn is_generic(&self) -> bool {
        self.definition.is_some()
    }

    /// Number of generic arguments.
    #[inline]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// The key identifying this node in a stable tag.
    ///
    /// Falls back to the definition path (generic) or the full path when no
    /// stable id was given.
    pub fn stable_key(&self) -> &str {
        match (self.stable_id, self.definition) {
            (Some(id), _) => id,
            (None, Some(definition)) => definition,
            (None, None) => &self.path,
        }
    }

    /// `path@version`, or just the path for unversioned types.
    pub fn qualified_name(&self) -> String {
        if self.version.is_empty() {
            String::from(self.path())
        } else {
            format!("{}@{}", self.path, self.version)
        }
    }

    /// Returns `true` if this shape describes `T`.
    #[inline]
    pub fn type_is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

// -----------------------------------------------------------------------------
// Typed

/// A static accessor to a type's [`TypeShape`].
///
/// Non-generic types usually use [`impl_typed!`](crate::impl_typed).
/// Generic types implement it by hand:
///
/// ```
/// use vc_serial::info::{TypeKind, TypeShape, Typed};
///
/// struct Wrapper<T>(T);
///
/// impl<T: Typed> Typed for Wrapper<T> {
///     fn type_shape() -> TypeShape {
///         TypeShape::generic::<Self>("demo::Wrapper", TypeKind::Reference, vec![T::type_shape()])
///             .with_stable_id("wrapper")
///     }
/// }
///
/// assert_eq!(Wrapper::<i32>::type_shape().path(), "demo::Wrapper<i32>");
/// ```
pub trait Typed: 'static {
    fn type_shape() -> TypeShape;
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::{TypeKind, TypeShape, Typed};

    struct Wrapper<T>(T);

    impl<T: Typed> Typed for Wrapper<T> {
        fn type_shape() -> TypeShape {
            TypeShape::generic::<Self>("tests::Wrapper", TypeKind::Reference, vec![T::type_shape()])
                .with_version("1.0.0")
        }
    }

    #[test]
    fn nested_paths() {
        let shape = Wrapper::<Wrapper<u16>>::type_shape();
        assert_eq!(shape.path(), "tests::Wrapper<tests::Wrapper<u16>>");
        assert_eq!(shape.qualified_name(), "tests::Wrapper<tests::Wrapper<u16>>@1.0.0");
        assert_eq!(shape.args()[0].arity(), 1);
        assert!(shape.type_is::<Wrapper<Wrapper<u16>>>());
    }

    #[test]
    fn stable_key_fallbacks() {
        assert_eq!(u16::type_shape().stable_key(), "u2");
        assert_eq!(Wrapper::<u8>::type_shape().stable_key(), "tests::Wrapper");

        let plain = TypeShape::leaf::<()>("tests::Unit", TypeKind::Value);
        assert_eq!(plain.stable_key(), "tests::Unit");
        assert_eq!(plain.qualified_name(), "tests::Unit");
    }
}
