use alloc::vec::Vec;

use super::{ByteReader, ByteWriter, SectionMark};
use crate::{SerialError, SerialResult};

// -----------------------------------------------------------------------------
// MemoryWriter

/// A [`ByteWriter`] over a growable buffer.
///
/// Supports sections and rollback.
///
/// # Examples
///
/// ```
/// use vc_serial::backend::{ByteWriter, MemoryWriter};
///
/// let mut writer = MemoryWriter::new();
/// let mark = writer.begin_section().unwrap();
/// writer.write_u16(7).unwrap();
/// writer.end_section(mark).unwrap();
///
/// assert_eq!(writer.as_slice(), &[2, 0, 0, 0, 7, 0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    buf: Vec<u8>,
}

impl MemoryWriter {
    #[inline]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl ByteWriter for MemoryWriter {
    #[inline]
    fn write_raw(&mut self, bytes: &[u8]) -> SerialResult<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    #[inline]
    fn position(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn supports_sections(&self) -> bool {
        true
    }

    fn begin_section(&mut self) -> SerialResult<SectionMark> {
        let mark = SectionMark::new(self.buf.len());
        self.buf.extend_from_slice(&[0; 4]);
        Ok(mark)
    }

    fn end_section(&mut self, mark: SectionMark) -> SerialResult<()> {
        let body_start = mark.start() + 4;
        if body_start > self.buf.len() {
            return Err(SerialError::misuse("section mark beyond written data"));
        }
        let len = u32::try_from(self.buf.len() - body_start)
            .map_err(|_| SerialError::misuse("section body exceeds u32::MAX bytes"))?;
        self.buf[mark.start()..body_start].copy_from_slice(&len.to_le_bytes());
        Ok(())
    }

    fn rollback(&mut self, position: usize) -> bool {
        if position > self.buf.len() {
            return false;
        }
        self.buf.truncate(position);
        true
    }
}

// -----------------------------------------------------------------------------
// MemoryReader

/// A [`ByteReader`] over a borrowed slice.
#[derive(Debug, Clone)]
pub struct MemoryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MemoryReader<'a> {
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The unread tail.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    #[inline]
    fn available(&self) -> usize {
        self.data.len() - self.pos
    }

    fn advance(&mut self, len: usize) -> SerialResult<usize> {
        let available = self.available();
        if len > available {
            return Err(SerialError::IncompleteInput {
                needed: len,
                available,
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(start)
    }
}

impl ByteReader for MemoryReader<'_> {
    fn read_raw(&mut self, buf: &mut [u8]) -> SerialResult<()> {
        let start = self.advance(buf.len())?;
        buf.copy_from_slice(&self.data[start..self.pos]);
        Ok(())
    }

    #[inline]
    fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn skip(&mut self, len: usize) -> SerialResult<()> {
        self.advance(len).map(|_| ())
    }

    #[inline]
    fn at_end(&mut self) -> SerialResult<bool> {
        Ok(self.pos >= self.data.len())
    }

    #[inline]
    fn remaining(&self) -> Option<usize> {
        Some(self.available())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryReader, MemoryWriter};
    use crate::SerialError;
    use crate::backend::{ByteReader, ByteWriter};

    #[test]
    fn rollback_truncates() {
        let mut writer = MemoryWriter::new();
        writer.write_u32(1).unwrap();
        let checkpoint = writer.position();
        writer.write_u64(2).unwrap();
        assert!(writer.rollback(checkpoint));
        assert_eq!(writer.len(), 4);
        assert!(!writer.rollback(100));
    }

    #[test]
    fn nested_sections_backpatch() {
        let mut writer = MemoryWriter::new();
        let outer = writer.begin_section().unwrap();
        writer.write_u8(1).unwrap();
        let inner = writer.begin_section().unwrap();
        writer.write_u8(2).unwrap();
        writer.end_section(inner).unwrap();
        writer.end_section(outer).unwrap();

        let mut reader = MemoryReader::new(writer.as_slice());
        assert_eq!(reader.read_u32().unwrap(), 6);
        assert_eq!(reader.read_u8().unwrap(), 1);
        assert_eq!(reader.read_u32().unwrap(), 1);
        assert_eq!(reader.read_u8().unwrap(), 2);
    }

    #[test]
    fn exhaustion_reports_sizes() {
        let mut reader = MemoryReader::new(&[1, 2]);
        assert_eq!(
            reader.read_u32(),
            Err(SerialError::IncompleteInput {
                needed: 4,
                available: 2
            })
        );
        // A failed read consumes nothing.
        assert_eq!(reader.position(), 0);
        reader.skip(2).unwrap();
        assert!(reader.at_end().unwrap());
    }
}
