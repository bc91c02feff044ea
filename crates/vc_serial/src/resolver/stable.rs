use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use vc_utils::TypeIdMap;

use super::{TagResolution, TypeResolver, TypeTag};
use crate::backend::{ByteReader, ByteWriter};
use crate::config::ResolverKind;
use crate::info::TypeShape;
use crate::registry::TypeRegistry;
use crate::{SerialError, SerialResult};

/// Format byte leading every stable tag.
pub const STABLE_TAG_FORMAT: u8 = 1;

// -----------------------------------------------------------------------------
// StableIdResolver

/// Tags payloads with explicit stable ids.
///
/// Wire shape: `[u8 format][u8 count][count × length-prefixed id]`, the ids
/// in preorder over the generic arguments. Decoding looks up the argument
/// count of each id in the registry to rebuild the tree, so every id of a
/// registered shape is known to the reader.
///
/// Id lists are computed once per type and cached.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vc_serial::backend::{MemoryReader, MemoryWriter};
/// use vc_serial::info::Typed;
/// use vc_serial::registry::TypeRegistry;
/// use vc_serial::resolver::{StableIdResolver, TagResolution, TypeResolver};
///
/// let registry = Arc::new(TypeRegistry::new());
/// registry.register_value::<Vec<i32>>().unwrap();
/// let resolver = StableIdResolver::new(registry);
///
/// let mut writer = MemoryWriter::new();
/// resolver.encode(&mut writer, &Vec::<i32>::type_shape()).unwrap();
///
/// let mut reader = MemoryReader::new(writer.as_slice());
/// let TagResolution::Resolved(meta) = resolver.decode(&mut reader).unwrap() else {
///     panic!("tag did not resolve");
/// };
/// assert!(meta.shape().type_is::<Vec<i32>>());
/// ```
#[derive(Debug)]
pub struct StableIdResolver {
    registry: Arc<TypeRegistry>,
    cache: TypeIdMap<Arc<[String]>>,
}

impl StableIdResolver {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            cache: TypeIdMap::new(),
        }
    }

    fn ids_of(&self, shape: &TypeShape) -> SerialResult<Arc<[String]>> {
        if let Some(ids) = self.cache.get(&shape.type_id()) {
            return Ok(ids);
        }
        let ids: Arc<[String]> = TypeTag::from_shape(shape)
            .preorder()
            .into_iter()
            .map(String::from)
            .collect();
        if ids.len() > usize::from(u8::MAX) {
            return Err(SerialError::misuse(format!(
                "stable tag of `{}` has {} ids, at most 255 fit",
                shape.path(),
                ids.len()
            )));
        }
        self.cache.insert(shape.type_id(), Arc::clone(&ids));
        Ok(ids)
    }

    // Rebuilds the subtree rooted at `ids[*cursor]`.
    fn rebuild(&self, ids: &[String], cursor: &mut usize) -> Result<TypeTag, String> {
        let Some(id) = ids.get(*cursor) else {
            return Err(String::from("tag ends before all generic arguments"));
        };
        *cursor += 1;
        let Some(arity) = self.registry.arity(id) else {
            return Err(format!("unknown stable id `{id}`"));
        };
        let mut args = Vec::with_capacity(arity);
        for _ in 0..arity {
            args.push(self.rebuild(ids, cursor)?);
        }
        Ok(TypeTag::new(id.as_str(), args))
    }
}

impl TypeResolver for StableIdResolver {
    #[inline]
    fn kind(&self) -> ResolverKind {
        ResolverKind::StableId
    }

    fn encode(&self, writer: &mut dyn ByteWriter, shape: &TypeShape) -> SerialResult<()> {
        let ids = self.ids_of(shape)?;
        writer.write_u8(STABLE_TAG_FORMAT)?;
        // `ids_of` bounds the count.
        writer.write_u8(ids.len() as u8)?;
        for id in ids.iter() {
            writer.write_str(Some(id))?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut dyn ByteReader) -> SerialResult<TagResolution> {
        let format = reader.read_u8()?;
        if format != STABLE_TAG_FORMAT {
            return Err(SerialError::malformed(format!(
                "unknown stable tag format {format}"
            )));
        }
        let count = reader.read_u8()?;
        let mut ids = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            match reader.read_str()? {
                Some(id) => ids.push(id),
                None => return Err(SerialError::malformed("null id in stable tag")),
            }
        }

        let mut cursor = 0;
        let tag = match self.rebuild(&ids, &mut cursor) {
            Ok(tag) if cursor == ids.len() => tag,
            Ok(tag) => {
                return Ok(TagResolution::Unresolved(SerialError::unresolved(format!(
                    "{} trailing ids after `{tag}`",
                    ids.len() - cursor
                ))));
            }
            Err(detail) => {
                return Ok(TagResolution::Unresolved(SerialError::unresolved(detail)));
            }
        };

        Ok(match self.registry.get_with_tag(&tag) {
            Some(meta) => TagResolution::Resolved(meta),
            None => TagResolution::Unresolved(SerialError::unresolved(format!(
                "no registered type for tag `{tag}`"
            ))),
        })
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use super::{STABLE_TAG_FORMAT, StableIdResolver};
    use crate::SerialError;
    use crate::backend::{ByteWriter, MemoryReader, MemoryWriter};
    use crate::info::Typed;
    use crate::registry::TypeRegistry;
    use crate::resolver::{TagResolution, TypeResolver};

    fn raw_tag(ids: &[&str]) -> MemoryWriter {
        let mut writer = MemoryWriter::new();
        writer.write_u8(STABLE_TAG_FORMAT).unwrap();
        writer.write_u8(ids.len() as u8).unwrap();
        for id in ids {
            writer.write_str(Some(id)).unwrap();
        }
        writer
    }

    fn decode(resolver: &StableIdResolver, writer: &MemoryWriter) -> TagResolution {
        let mut reader = MemoryReader::new(writer.as_slice());
        let resolution = resolver.decode(&mut reader).unwrap();
        assert!(reader.rest().is_empty());
        resolution
    }

    #[test]
    fn wire_layout() {
        let resolver = StableIdResolver::new(Arc::new(TypeRegistry::new()));
        let mut writer = MemoryWriter::new();
        resolver.encode(&mut writer, &u8::type_shape()).unwrap();
        assert_eq!(writer.as_slice(), &[1, 1, 2, 0, 0, 0, b'u', b'1']);
    }

    #[test]
    fn arity_mismatches_are_unresolved() {
        let registry = Arc::new(TypeRegistry::new());
        registry.register_value::<Vec<String>>().unwrap();
        let resolver = StableIdResolver::new(registry);

        assert!(matches!(
            decode(&resolver, &raw_tag(&["list", "s"])),
            TagResolution::Resolved(_)
        ));
        let cases: [&[&str]; 5] = [&["list"], &["list", "s", "s"], &["s", "u4"], &["nope"], &[]];
        for ids in cases {
            match decode(&resolver, &raw_tag(ids)) {
                TagResolution::Unresolved(SerialError::UnresolvedType { .. }) => {}
                other => panic!("{ids:?} resolved to {other:?}"),
            }
        }
    }

    #[test]
    fn unregistered_combination_is_unresolved() {
        let registry = Arc::new(TypeRegistry::new());
        registry.register_value::<Vec<String>>().unwrap();
        let resolver = StableIdResolver::new(registry);

        // Every id is known, the closed type is not.
        assert!(matches!(
            decode(&resolver, &raw_tag(&["list", "u4"])),
            TagResolution::Unresolved(_)
        ));
    }

    #[test]
    fn bad_format_is_malformed() {
        let resolver = StableIdResolver::new(Arc::new(TypeRegistry::new()));
        let mut reader = MemoryReader::new(&[9, 0]);
        assert!(matches!(resolver.decode(&mut reader), Err(SerialError::Malformed(_))));
    }
}
