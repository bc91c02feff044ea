//! Type identity encodings for dynamic payloads.
//!
//! A resolver writes a type tag in front of every dynamic body and maps it
//! back to a registered [`TypeMeta`] when reading. Two strategies exist:
//!
//! - [`NameResolver`]: the `path@version` name. Easy to read, breaks on
//!   renames and version bumps.
//! - [`StableIdResolver`]: explicit short ids in preorder over generic
//!   arguments. Survives renames.
//!
//! Writer and reader must use the same strategy; a mismatch is not
//! detected and shows up as unresolved tags or malformed input.

// -----------------------------------------------------------------------------
// Modules

mod name;
mod stable;
mod tag;

// -----------------------------------------------------------------------------
// Exports

pub use name::NameResolver;
pub use stable::{STABLE_TAG_FORMAT, StableIdResolver};
pub use tag::TypeTag;

use alloc::sync::Arc;

use crate::backend::{ByteReader, ByteWriter};
use crate::config::ResolverKind;
use crate::info::TypeShape;
use crate::registry::{TypeMeta, TypeRegistry};
use crate::{SerialError, SerialResult};

// -----------------------------------------------------------------------------
// TypeResolver

/// Outcome of decoding a type tag.
#[derive(Debug, Clone)]
pub enum TagResolution {
    /// The tag names a registered type.
    Resolved(Arc<TypeMeta>),
    /// The tag was read completely but names nothing usable. The stream
    /// is still aligned, so the following body can be skipped.
    Unresolved(SerialError),
}

/// Encodes and decodes type tags.
///
/// `decode` returns `Err` only when the tag itself cannot be read; an
/// unknown but well-formed tag is [`TagResolution::Unresolved`].
pub trait TypeResolver: Send + Sync {
    fn kind(&self) -> ResolverKind;

    fn encode(&self, writer: &mut dyn ByteWriter, shape: &TypeShape) -> SerialResult<()>;

    fn decode(&self, reader: &mut dyn ByteReader) -> SerialResult<TagResolution>;
}

/// Builds the resolver selected by `kind` over `registry`.
pub fn resolver_for(kind: ResolverKind, registry: Arc<TypeRegistry>) -> Arc<dyn TypeResolver> {
    match kind {
        ResolverKind::Name => Arc::new(NameResolver::new(registry)),
        ResolverKind::StableId => Arc::new(StableIdResolver::new(registry)),
    }
}
