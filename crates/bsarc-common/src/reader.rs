//! Binary reading helpers.
//!
//! [`BinaryReader`] is a cursor over an in-memory byte slice that reads
//! little-endian values without copying. [`ReadExt`] reads the same
//! fixed-layout structs straight from a stream.

use std::io::{self, Read};

use zerocopy::FromBytes;

use crate::{Error, Result};

/// A binary reader that provides zero-copy reading from a byte slice.
///
/// # Example
///
/// ```
/// use bsarc_common::BinaryReader;
///
/// let data = [0x03, 0x00, b'a', b'b', b'c', 0x0D, 0xF0, 0xAD, 0xBA];
/// let mut reader = BinaryReader::new(&data);
///
/// assert_eq!(reader.read_bstring().unwrap(), "abc");
/// assert_eq!(reader.read_u32().unwrap(), 0xBAAD_F00D);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    /// Create a new reader from a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                needed: count,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// Read a little-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian u64.
    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read a string prefixed with its u16 byte length.
    ///
    /// BA2 name tables are not guaranteed to be UTF-8, so invalid sequences
    /// are replaced rather than rejected.
    pub fn read_bstring(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a struct using zerocopy.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof {
            needed: size,
            available: bytes.len(),
        })
    }
}

/// Fixed-layout reads from a stream.
pub trait ReadExt: Read {
    /// Read a structure from the stream.
    fn read_struct<T: FromBytes>(&mut self) -> io::Result<T> {
        let size = std::mem::size_of::<T>();
        let mut bytes = vec![0u8; size];
        self.read_exact(&mut bytes)?;
        T::read_from_bytes(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", e)))
    }

    /// Read an array of structures from the stream.
    fn read_structs<T: FromBytes>(&mut self, count: usize) -> io::Result<Vec<T>> {
        let elem_size = std::mem::size_of::<T>();
        let mut bytes = vec![0u8; count * elem_size];
        self.read_exact(&mut bytes)?;

        let mut result = Vec::with_capacity(count);
        for chunk in bytes.chunks_exact(elem_size) {
            let item = T::read_from_bytes(chunk)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", e)))?;
            result.push(item);
        }
        Ok(result)
    }
}

impl<R: Read> ReadExt for R {}
