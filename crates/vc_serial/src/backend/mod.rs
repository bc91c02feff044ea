//! Byte sink and source contracts.
//!
//! The engine never touches bytes directly. It talks to a [`ByteWriter`] or
//! a [`ByteReader`], which own the concrete layout of primitives and decide
//! whether section framing is possible.
//!
//! Fixed-width values are little-endian. Strings and byte arrays carry an
//! `i32` length prefix where `-1` means null, so absence stays distinct from
//! empty.
//!
//! ## Menu
//!
//! - [`MemoryWriter`] / [`MemoryReader`]: growable buffer and borrowed slice,
//!   both section capable, writer supports rollback.
//! - [`StreamWriter`] / [`StreamReader`]: `std::io` adapters. The writer
//!   cannot backpatch and refuses sections.

// -----------------------------------------------------------------------------
// Modules

mod memory;
mod stream;

// -----------------------------------------------------------------------------
// Exports

pub use memory::{MemoryReader, MemoryWriter};
pub use stream::{StreamReader, StreamWriter};

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::{SerialError, SerialResult};

/// Length prefix value that encodes a null string or byte array.
pub const NULL_LENGTH: i32 = -1;

// Largest buffer step taken on faith from a length prefix.
const READ_CHUNK: usize = 64 * 1024;

// -----------------------------------------------------------------------------
// SectionMark

/// Placeholder handed out by [`ByteWriter::begin_section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionMark {
    start: usize,
}

impl SectionMark {
    /// Creates a mark for a length placeholder written at `start`.
    #[inline]
    pub const fn new(start: usize) -> Self {
        Self { start }
    }

    /// Position of the 4-byte length placeholder.
    #[inline]
    pub const fn start(self) -> usize {
        self.start
    }
}

fn sections_refused() -> SerialError {
    SerialError::misuse("backend cannot backpatch section lengths")
}

// -----------------------------------------------------------------------------
// ByteWriter

macro_rules! write_le {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[inline]
            fn $name(&mut self, value: $ty) -> SerialResult<()> {
                self.write_raw(&value.to_le_bytes())
            }
        )*
    };
}

/// A byte sink.
///
/// Implementors provide [`write_raw`](Self::write_raw) and
/// [`position`](Self::position); everything else has a default layout.
pub trait ByteWriter {
    /// Appends `bytes` verbatim.
    fn write_raw(&mut self, bytes: &[u8]) -> SerialResult<()>;

    /// Number of bytes written so far.
    fn position(&self) -> usize;

    /// Whether [`begin_section`](Self::begin_section) can be used.
    fn supports_sections(&self) -> bool {
        false
    }

    /// Reserves a 4-byte length placeholder.
    fn begin_section(&mut self) -> SerialResult<SectionMark> {
        Err(sections_refused())
    }

    /// Backpatches the placeholder with the number of bytes written since.
    fn end_section(&mut self, mark: SectionMark) -> SerialResult<()> {
        let _ = mark;
        Err(sections_refused())
    }

    /// Discards everything written after `position`.
    ///
    /// Returns `false` if the backend has already committed those bytes.
    fn rollback(&mut self, position: usize) -> bool {
        let _ = position;
        false
    }

    #[inline]
    fn write_bool(&mut self, value: bool) -> SerialResult<()> {
        self.write_u8(u8::from(value))
    }

    #[inline]
    fn write_char(&mut self, value: char) -> SerialResult<()> {
        self.write_u32(u32::from(value))
    }

    #[inline]
    fn write_f32(&mut self, value: f32) -> SerialResult<()> {
        self.write_u32(value.to_bits())
    }

    #[inline]
    fn write_f64(&mut self, value: f64) -> SerialResult<()> {
        self.write_u64(value.to_bits())
    }

    write_le! {
        write_u8: u8, write_i8: i8,
        write_u16: u16, write_i16: i16,
        write_u32: u32, write_i32: i32,
        write_u64: u64, write_i64: i64,
        write_u128: u128, write_i128: i128,
    }

    /// Writes a length-prefixed byte array, `None` as null.
    fn write_bytes(&mut self, value: Option<&[u8]>) -> SerialResult<()> {
        match value {
            None => self.write_i32(NULL_LENGTH),
            Some(bytes) => {
                let len = i32::try_from(bytes.len()).map_err(|_| {
                    SerialError::misuse("byte array longer than i32::MAX")
                })?;
                self.write_i32(len)?;
                self.write_raw(bytes)
            }
        }
    }

    /// Writes a length-prefixed UTF-8 string, `None` as null.
    #[inline]
    fn write_str(&mut self, value: Option<&str>) -> SerialResult<()> {
        self.write_bytes(value.map(str::as_bytes))
    }
}

// -----------------------------------------------------------------------------
// ByteReader

macro_rules! read_le {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[inline]
            fn $name(&mut self) -> SerialResult<$ty> {
                let mut bytes = [0u8; size_of::<$ty>()];
                self.read_raw(&mut bytes)?;
                Ok(<$ty>::from_le_bytes(bytes))
            }
        )*
    };
}

/// A byte source.
///
/// Exhaustion is reported as [`SerialError::IncompleteInput`], never by
/// blocking or panicking.
pub trait ByteReader {
    /// Fills `buf` completely or fails with `IncompleteInput`.
    fn read_raw(&mut self, buf: &mut [u8]) -> SerialResult<()>;

    /// Number of bytes consumed so far.
    fn position(&self) -> usize;

    /// Discards `len` bytes.
    fn skip(&mut self, len: usize) -> SerialResult<()>;

    /// Returns `true` once no further byte is available.
    fn at_end(&mut self) -> SerialResult<bool>;

    /// Bytes left, if the backend knows.
    fn remaining(&self) -> Option<usize> {
        None
    }

    /// Whether section lengths can be honored, i.e. the reader can report
    /// its position and skip.
    fn supports_sections(&self) -> bool {
        true
    }

    fn read_bool(&mut self) -> SerialResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerialError::malformed(format!(
                "invalid bool byte {other:#04x}"
            ))),
        }
    }

    fn read_char(&mut self) -> SerialResult<char> {
        let raw = self.read_u32()?;
        char::from_u32(raw).ok_or_else(|| {
            SerialError::malformed(format!("invalid char scalar {raw:#x}"))
        })
    }

    #[inline]
    fn read_f32(&mut self) -> SerialResult<f32> {
        self.read_u32().map(f32::from_bits)
    }

    #[inline]
    fn read_f64(&mut self) -> SerialResult<f64> {
        self.read_u64().map(f64::from_bits)
    }

    read_le! {
        read_u8: u8, read_i8: i8,
        read_u16: u16, read_i16: i16,
        read_u32: u32, read_i32: i32,
        read_u64: u64, read_i64: i64,
        read_u128: u128, read_i128: i128,
    }

    /// Reads a length-prefixed byte array, null as `None`.
    fn read_bytes(&mut self) -> SerialResult<Option<Vec<u8>>> {
        let len = self.read_i32()?;
        if len == NULL_LENGTH {
            return Ok(None);
        }
        let len = usize::try_from(len).map_err(|_| {
            SerialError::malformed(format!("negative length prefix {len}"))
        })?;
        if let Some(available) = self.remaining() {
            if len > available {
                return Err(SerialError::IncompleteInput {
                    needed: len,
                    available,
                });
            }
            let mut bytes = vec![0u8; len];
            self.read_raw(&mut bytes)?;
            return Ok(Some(bytes));
        }

        // Unknown length source: grow with the data, not with the prefix.
        let mut bytes = Vec::with_capacity(len.min(READ_CHUNK));
        while bytes.len() < len {
            let filled = bytes.len();
            let step = (len - filled).min(READ_CHUNK);
            bytes.resize(filled + step, 0);
            self.read_raw(&mut bytes[filled..]).map_err(|err| match err {
                SerialError::IncompleteInput { available, .. } => SerialError::IncompleteInput {
                    needed: len,
                    available: filled + available,
                },
                other => other,
            })?;
        }
        Ok(Some(bytes))
    }

    /// Reads a length-prefixed UTF-8 string, null as `None`.
    fn read_str(&mut self) -> SerialResult<Option<String>> {
        match self.read_bytes()? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| SerialError::malformed("string is not valid UTF-8")),
        }
    }
}
