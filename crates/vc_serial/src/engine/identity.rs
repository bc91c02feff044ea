use alloc::rc::Rc;
use core::any::Any;

use crate::SerialResult;
use crate::backend::{ByteReader, ByteWriter};

// -----------------------------------------------------------------------------
// IdentityLayer

/// Outcome of [`IdentityLayer::write_ref`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefWrite {
    /// First sight: the caller writes the body next.
    Body,
    /// Already written in this pass: nothing follows.
    Known,
}

/// Outcome of [`IdentityLayer::read_ref`].
pub enum ReadRef {
    /// The id names an instance bound earlier in this pass.
    Resolved(Rc<dyn Any>),
    /// A body follows. The caller constructs an instance, binds it to the
    /// slot, then decodes the body.
    Pending(Option<u32>),
    /// A back reference to an id whose body was never decoded in this pass,
    /// typically because it sat inside a skipped payload.
    Missing(u32),
}

/// Per-pass reference bookkeeping used by an [`Engine`](super::Engine).
///
/// Instances are type-erased `Rc<RefCell<T>>` cells.
pub trait IdentityLayer {
    /// Writes whatever identity prefix an object needs.
    fn write_ref(
        &mut self,
        instance: &Rc<dyn Any>,
        writer: &mut dyn ByteWriter,
    ) -> SerialResult<RefWrite>;

    /// Reads the identity prefix of an object.
    fn read_ref(&mut self, reader: &mut dyn ByteReader, max_objects: usize)
    -> SerialResult<ReadRef>;

    /// Binds a freshly constructed instance before its body is decoded.
    fn bind(&mut self, slot: Option<u32>, instance: Rc<dyn Any>);

    /// Checkpoint of the write-side state.
    fn mark(&self) -> usize;

    /// Forgets every id handed out after `mark`.
    fn rollback(&mut self, mark: usize);

    /// Clears all state.
    fn reset(&mut self);
}

// -----------------------------------------------------------------------------
// TreeIdentity

/// No identity tracking: every reference is written in full.
///
/// Shared objects are duplicated on decode. A cycle makes the writer
/// re-enter an object it is still writing, which fails with
/// [`SerialError::Misuse`](crate::SerialError::Misuse).
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeIdentity;

impl IdentityLayer for TreeIdentity {
    #[inline]
    fn write_ref(&mut self, _: &Rc<dyn Any>, _: &mut dyn ByteWriter) -> SerialResult<RefWrite> {
        Ok(RefWrite::Body)
    }

    #[inline]
    fn read_ref(&mut self, _: &mut dyn ByteReader, _: usize) -> SerialResult<ReadRef> {
        Ok(ReadRef::Pending(None))
    }

    #[inline]
    fn bind(&mut self, _: Option<u32>, _: Rc<dyn Any>) {}

    #[inline]
    fn mark(&self) -> usize {
        0
    }

    #[inline]
    fn rollback(&mut self, _: usize) {}

    #[inline]
    fn reset(&mut self) {}
}
