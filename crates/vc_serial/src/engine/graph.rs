use alloc::format;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use vc_utils::hash::HashMap;

use super::identity::{IdentityLayer, ReadRef, RefWrite};
use crate::backend::{ByteReader, ByteWriter};
use crate::contract::address_of;
use crate::{SerialError, SerialResult};

// -----------------------------------------------------------------------------
// RecordSlot

/// One entry of the decode-side slot table.
#[derive(Default, Clone)]
pub struct RecordSlot {
    instance: Option<Rc<dyn Any>>,
}

impl RecordSlot {
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.instance.is_some()
    }
}

impl fmt::Debug for RecordSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(instance) => write!(f, "RecordSlot({:#x})", address_of(instance)),
            None => f.write_str("RecordSlot(empty)"),
        }
    }
}

// -----------------------------------------------------------------------------
// GraphIdentity

/// Top bit of a written instance id, set when no body follows.
pub const BACK_REFERENCE: u32 = 1 << 31;

/// Reference deduplication and cycle-safe decoding.
///
/// Writing assigns ids in first-sight order, starting at 0, keyed by the
/// allocation address. Every written instance is pinned until the next
/// reset so an address cannot be reused within a pass.
///
/// Back references carry [`BACK_REFERENCE`] in the id's top bit, so a
/// reader can tell a first sight (body follows) from a repeat without
/// having decoded every earlier body.
///
/// Reading grows the slot table lazily up to the id of each first sight.
/// A bound slot resolves immediately, even while its own body is still
/// being decoded, which is what makes cycles terminate. A back reference
/// to a slot that was never bound is reported as [`ReadRef::Missing`].
#[derive(Default)]
pub struct GraphIdentity {
    ids: HashMap<usize, u32>,
    pinned: Vec<Rc<dyn Any>>,
    slots: Vec<RecordSlot>,
}

impl GraphIdentity {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct objects written since the last reset.
    #[inline]
    pub fn written(&self) -> usize {
        self.pinned.len()
    }

    /// The decode slot table.
    #[inline]
    pub fn slots(&self) -> &[RecordSlot] {
        &self.slots
    }
}

impl IdentityLayer for GraphIdentity {
    fn write_ref(
        &mut self,
        instance: &Rc<dyn Any>,
        writer: &mut dyn ByteWriter,
    ) -> SerialResult<RefWrite> {
        let address = address_of(instance);
        if let Some(&id) = self.ids.get(&address) {
            writer.write_u32(id | BACK_REFERENCE)?;
            return Ok(RefWrite::Known);
        }

        let id = u32::try_from(self.pinned.len())
            .ok()
            .filter(|id| id & BACK_REFERENCE == 0)
            .ok_or_else(|| SerialError::misuse("too many objects in one pass"))?;
        writer.write_u32(id)?;
        self.ids.insert(address, id);
        self.pinned.push(Rc::clone(instance));
        Ok(RefWrite::Body)
    }

    fn read_ref(
        &mut self,
        reader: &mut dyn ByteReader,
        max_objects: usize,
    ) -> SerialResult<ReadRef> {
        let raw = reader.read_u32()?;
        let id = raw & !BACK_REFERENCE;
        let index = id as usize;
        if index >= max_objects {
            return Err(SerialError::malformed(format!(
                "instance id {id} exceeds the limit of {max_objects} objects"
            )));
        }

        let bound = self.slots.get(index).and_then(|slot| slot.instance.as_ref());
        if raw & BACK_REFERENCE != 0 {
            return Ok(match bound {
                Some(instance) => ReadRef::Resolved(Rc::clone(instance)),
                None => ReadRef::Missing(id),
            });
        }

        // Ids below the table length were either decoded or skipped.
        if index < self.slots.len() {
            return Err(SerialError::malformed(format!(
                "instance id {id} carries a second body"
            )));
        }
        self.slots.resize_with(index + 1, RecordSlot::default);
        Ok(ReadRef::Pending(Some(id)))
    }

    fn bind(&mut self, slot: Option<u32>, instance: Rc<dyn Any>) {
        if let Some(slot) = slot.and_then(|id| self.slots.get_mut(id as usize)) {
            slot.instance = Some(instance);
        }
    }

    #[inline]
    fn mark(&self) -> usize {
        self.pinned.len()
    }

    fn rollback(&mut self, mark: usize) {
        if mark >= self.pinned.len() {
            return;
        }
        for instance in self.pinned.drain(mark..) {
            self.ids.remove(&address_of(&instance));
        }
    }

    fn reset(&mut self) {
        self.ids.clear();
        self.pinned.clear();
        self.slots.clear();
    }
}

impl fmt::Debug for GraphIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphIdentity")
            .field("written", &self.pinned.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::any::Any;
    use core::cell::RefCell;

    use super::{BACK_REFERENCE, GraphIdentity};
    use crate::SerialError;
    use crate::backend::{ByteWriter, MemoryReader, MemoryWriter};
    use crate::engine::identity::{IdentityLayer, ReadRef, RefWrite};

    fn cell(value: u8) -> Rc<dyn Any> {
        Rc::new(RefCell::new(value))
    }

    #[test]
    fn ids_follow_first_sight() {
        let mut identity = GraphIdentity::new();
        let mut writer = MemoryWriter::new();
        let (a, b) = (cell(1), cell(2));

        assert_eq!(identity.write_ref(&a, &mut writer).unwrap(), RefWrite::Body);
        assert_eq!(identity.write_ref(&b, &mut writer).unwrap(), RefWrite::Body);
        assert_eq!(identity.write_ref(&a, &mut writer).unwrap(), RefWrite::Known);
        assert_eq!(writer.as_slice(), &[0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0x80]);
        assert_eq!(identity.written(), 2);
    }

    #[test]
    fn rollback_forgets_late_ids() {
        let mut identity = GraphIdentity::new();
        let mut writer = MemoryWriter::new();
        let (a, b) = (cell(1), cell(2));

        identity.write_ref(&a, &mut writer).unwrap();
        let mark = identity.mark();
        identity.write_ref(&b, &mut writer).unwrap();
        identity.rollback(mark);

        assert_eq!(identity.written(), 1);
        assert_eq!(identity.write_ref(&b, &mut writer).unwrap(), RefWrite::Body);
    }

    #[test]
    fn slots_grow_lazily_and_bind() {
        let mut identity = GraphIdentity::new();
        let mut writer = MemoryWriter::new();
        writer.write_u32(3).unwrap();
        writer.write_u32(3 | BACK_REFERENCE).unwrap();
        writer.write_u32(9).unwrap();

        let mut reader = MemoryReader::new(writer.as_slice());
        let ReadRef::Pending(slot) = identity.read_ref(&mut reader, 8).unwrap() else {
            panic!("fresh id resolved");
        };
        assert_eq!(slot, Some(3));
        assert_eq!(identity.slots().len(), 4);
        identity.bind(slot, cell(7));

        assert!(matches!(identity.read_ref(&mut reader, 8).unwrap(), ReadRef::Resolved(_)));
        assert!(matches!(
            identity.read_ref(&mut reader, 8),
            Err(SerialError::Malformed(_))
        ));
    }

    #[test]
    fn holes_are_missing_not_pending() {
        let mut identity = GraphIdentity::new();
        let mut writer = MemoryWriter::new();
        writer.write_u32(2).unwrap();
        writer.write_u32(1 | BACK_REFERENCE).unwrap();
        writer.write_u32(5 | BACK_REFERENCE).unwrap();
        writer.write_u32(1).unwrap();

        let mut reader = MemoryReader::new(writer.as_slice());
        let ReadRef::Pending(slot) = identity.read_ref(&mut reader, 8).unwrap() else {
            panic!("fresh id resolved");
        };
        identity.bind(slot, cell(4));

        // Slot 1 was skipped over, slot 5 was never announced.
        assert!(matches!(identity.read_ref(&mut reader, 8).unwrap(), ReadRef::Missing(1)));
        assert!(matches!(identity.read_ref(&mut reader, 8).unwrap(), ReadRef::Missing(5)));
        assert_eq!(identity.slots().len(), 3);

        // A body for an id already passed is never accepted.
        assert!(matches!(
            identity.read_ref(&mut reader, 8),
            Err(SerialError::Malformed(_))
        ));
    }
}
