use alloc::format;
use alloc::sync::Arc;

use super::{TagResolution, TypeResolver};
use crate::backend::{ByteReader, ByteWriter};
use crate::config::ResolverKind;
use crate::info::TypeShape;
use crate::registry::TypeRegistry;
use crate::{SerialError, SerialResult};

// -----------------------------------------------------------------------------
// NameResolver

/// Tags payloads with their version-qualified type name.
///
/// Wire shape: a length-prefixed `path@version` string.
#[derive(Debug, Clone)]
pub struct NameResolver {
    registry: Arc<TypeRegistry>,
}

impl NameResolver {
    #[inline]
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }
}

impl TypeResolver for NameResolver {
    #[inline]
    fn kind(&self) -> ResolverKind {
        ResolverKind::Name
    }

    fn encode(&self, writer: &mut dyn ByteWriter, shape: &TypeShape) -> SerialResult<()> {
        writer.write_str(Some(&shape.qualified_name()))
    }

    fn decode(&self, reader: &mut dyn ByteReader) -> SerialResult<TagResolution> {
        let Some(name) = reader.read_str()? else {
            return Err(SerialError::malformed("null type name"));
        };
        Ok(match self.registry.get_with_name(&name) {
            Some(meta) => TagResolution::Resolved(meta),
            None => TagResolution::Unresolved(SerialError::unresolved(format!(
                "no registered type named `{name}`"
            ))),
        })
    }
}
