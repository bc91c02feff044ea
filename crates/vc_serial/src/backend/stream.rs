use alloc::string::ToString;
use std::io::{self, Read, Write};

use super::{ByteReader, ByteWriter};
use crate::{SerialError, SerialResult};

fn io_failure(err: &io::Error) -> SerialError {
    SerialError::Io(err.to_string())
}

// -----------------------------------------------------------------------------
// StreamWriter

/// A [`ByteWriter`] forwarding to any [`Write`].
///
/// Bytes are committed as they are written, so this backend can neither
/// backpatch section lengths nor roll back. Engines writing through it fall
/// back to unsectioned framing.
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> StreamWriter<W> {
    #[inline]
    pub const fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    #[inline]
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    #[inline]
    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn flush(&mut self) -> SerialResult<()> {
        self.inner.flush().map_err(|e| io_failure(&e))
    }
}

impl<W: Write> ByteWriter for StreamWriter<W> {
    fn write_raw(&mut self, bytes: &[u8]) -> SerialResult<()> {
        self.inner.write_all(bytes).map_err(|e| io_failure(&e))?;
        self.written += bytes.len();
        Ok(())
    }

    #[inline]
    fn position(&self) -> usize {
        self.written
    }
}

// -----------------------------------------------------------------------------
// StreamReader

/// A [`ByteReader`] pulling from any [`Read`].
///
/// Sections are honored by counting consumed bytes and discarding the
/// undeclared tail.
#[derive(Debug)]
pub struct StreamReader<R: Read> {
    inner: R,
    consumed: usize,
    peeked: Option<u8>,
}

impl<R: Read> StreamReader<R> {
    #[inline]
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            consumed: 0,
            peeked: None,
        }
    }

    #[inline]
    pub fn into_inner(self) -> R {
        self.inner
    }

    // Returns how many bytes of `buf` were filled before the source ended.
    fn fill(&mut self, buf: &mut [u8]) -> SerialResult<usize> {
        let mut filled = 0;
        if !buf.is_empty() {
            if let Some(byte) = self.peeked.take() {
                buf[0] = byte;
                filled = 1;
            }
        }
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(io_failure(&e)),
            }
        }
        self.consumed += filled;
        Ok(filled)
    }
}

impl<R: Read> ByteReader for StreamReader<R> {
    fn read_raw(&mut self, buf: &mut [u8]) -> SerialResult<()> {
        let filled = self.fill(buf)?;
        if filled < buf.len() {
            return Err(SerialError::IncompleteInput {
                needed: buf.len(),
                available: filled,
            });
        }
        Ok(())
    }

    #[inline]
    fn position(&self) -> usize {
        self.consumed
    }

    fn skip(&mut self, len: usize) -> SerialResult<()> {
        let mut scratch = [0u8; 256];
        let mut left = len;
        while left > 0 {
            let chunk = left.min(scratch.len());
            let filled = self.fill(&mut scratch[..chunk])?;
            if filled < chunk {
                return Err(SerialError::IncompleteInput {
                    needed: left,
                    available: filled,
                });
            }
            left -= chunk;
        }
        Ok(())
    }

    fn at_end(&mut self) -> SerialResult<bool> {
        if self.peeked.is_some() {
            return Ok(false);
        }
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(true),
                Ok(_) => {
                    self.peeked = Some(byte[0]);
                    return Ok(false);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(io_failure(&e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{StreamReader, StreamWriter};
    use crate::SerialError;
    use crate::backend::{ByteReader, ByteWriter};

    #[test]
    fn writer_refuses_sections() {
        let mut writer = StreamWriter::new(Vec::new());
        assert!(!writer.supports_sections());
        assert!(matches!(writer.begin_section(), Err(SerialError::Misuse(_))));
        writer.write_u16(9).unwrap();
        assert!(!writer.rollback(0));
        assert_eq!(writer.into_inner(), vec![9, 0]);
    }

    #[test]
    fn peeking_does_not_lose_bytes() {
        let mut reader = StreamReader::new(Cursor::new(vec![5, 0, 0, 0, 1]));
        assert!(!reader.at_end().unwrap());
        assert_eq!(reader.read_u32().unwrap(), 5);
        assert_eq!(reader.position(), 4);
        reader.skip(1).unwrap();
        assert!(reader.at_end().unwrap());
        assert!(reader.read_u8().unwrap_err().is_incomplete());
    }

    #[test]
    fn oversized_length_prefix_fails_on_missing_data() {
        let mut bytes = i32::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"abc");
        let mut reader = StreamReader::new(Cursor::new(bytes));

        assert_eq!(
            reader.read_bytes(),
            Err(SerialError::IncompleteInput {
                needed: i32::MAX as usize,
                available: 3,
            })
        );
    }

    #[test]
    fn long_strings_span_several_chunks() {
        let text = "x".repeat(150 * 1024);
        let mut writer = StreamWriter::new(Vec::new());
        writer.write_str(Some(text.as_str())).unwrap();

        let mut reader = StreamReader::new(Cursor::new(writer.into_inner()));
        assert_eq!(reader.read_str().unwrap().as_deref(), Some(text.as_str()));
        assert!(reader.at_end().unwrap());
    }
}
