//! Memory source abstraction
//!
//! [`MemorySource`] is the seam between Cadence's logic and the address
//! space it operates on. The live implementation is
//! [`ForeignProcess`](crate::process::ForeignProcess); [`BufferSource`]
//! backs tests and offline images with the same interface.
//!
//! All addresses are absolute virtual addresses in the target space.

use std::mem::size_of;

use parking_lot::Mutex;
use thiserror::Error;

/// Longest null-terminated string a source will chase before giving up.
const MAX_CSTRING: usize = 4096;

/// Granularity of [`MemorySource::read_string`] reads.
const CSTRING_CHUNK: usize = 256;

/// Errors from reading or writing a memory source
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed to read {len} bytes at {addr:#x}: {source}")]
    Read {
        addr: u64,
        len: usize,
        source: std::io::Error,
    },

    #[error("failed to write {len} bytes at {addr:#x}: {source}")]
    Write {
        addr: u64,
        len: usize,
        source: std::io::Error,
    },

    #[error("short {op} at {addr:#x}: {actual} of {expected} bytes")]
    Short {
        op: &'static str,
        addr: u64,
        expected: usize,
        actual: usize,
    },

    #[error("address range {addr:#x}+{len:#x} is outside the image")]
    OutOfRange { addr: u64, len: usize },

    #[error("no process named \"{0}\" is running")]
    ProcessNotFound(String),

    #[error("no module mapping found for {0}")]
    ModuleNotFound(String),
}

/// Read/write access to one attached address space.
///
/// Individual `read_bytes`/`write_bytes` calls are atomic at the primitive
/// level; anything coarser (like a multi-field record update) has to be
/// staged in a local buffer and committed with a single write.
pub trait MemorySource {
    /// Read `len` bytes at `addr`.
    fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>, MemoryError>;

    /// Write `data` at `addr`.
    fn write_bytes(&self, addr: u64, data: &[u8]) -> Result<(), MemoryError>;

    /// Read a null-terminated string at `addr`.
    ///
    /// Reads in small chunks until the terminator; bounded at
    /// [`MAX_CSTRING`] bytes. Invalid UTF-8 is replaced, never an error.
    fn read_string(&self, addr: u64) -> Result<String, MemoryError> {
        let mut collected = Vec::new();
        let mut at = addr;

        while collected.len() < MAX_CSTRING {
            // A string can sit close to the end of a readable range, so a
            // failed chunk read falls back to byte-wise reads.
            let chunk = match self.read_bytes(at, CSTRING_CHUNK) {
                Ok(chunk) => chunk,
                Err(_) => self.read_bytes(at, 1)?,
            };
            if let Some(pos) = chunk.iter().position(|&b| b == 0) {
                collected.extend_from_slice(&chunk[..pos]);
                return Ok(String::from_utf8_lossy(&collected).into_owned());
            }
            at += chunk.len() as u64;
            collected.extend(chunk);
        }

        collected.truncate(MAX_CSTRING);
        Ok(String::from_utf8_lossy(&collected).into_owned())
    }

    /// Read one plain value at `addr`.
    ///
    /// `T` must be a `#[repr(C)]` value type with no padding-sensitive
    /// invariants (integers, floats, byte arrays, structs thereof); the
    /// bytes are reinterpreted as-is.
    fn read_value<T: Copy>(&self, addr: u64) -> Result<T, MemoryError> {
        let bytes = self.read_bytes(addr, size_of::<T>())?;
        // SAFETY: the buffer is exactly size_of::<T>() bytes and T is a
        // plain value type per the contract above.
        Ok(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) })
    }

    /// Read `count` consecutive plain values starting at `addr`.
    ///
    /// Same `T` contract as [`read_value`](MemorySource::read_value).
    fn read_array<T: Copy>(&self, addr: u64, count: usize) -> Result<Vec<T>, MemoryError> {
        let stride = size_of::<T>();
        let bytes = self.read_bytes(addr, stride * count)?;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            // SAFETY: each element window is stride bytes inside the buffer.
            out.push(unsafe { std::ptr::read_unaligned(bytes[i * stride..].as_ptr() as *const T) });
        }
        Ok(out)
    }

    fn read_u32(&self, addr: u64) -> Result<u32, MemoryError> {
        let b = self.read_bytes(addr, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i32(&self, addr: u64) -> Result<i32, MemoryError> {
        let b = self.read_bytes(addr, 4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&self, addr: u64) -> Result<u64, MemoryError> {
        let b = self.read_bytes(addr, 8)?;
        Ok(u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }
}

/// A flat byte image with a base address, usable wherever a live process is.
///
/// Writes go through a mutex so the image can be shared immutably, matching
/// the `&self` write signature of the live source.
#[derive(Debug)]
pub struct BufferSource {
    base: u64,
    data: Mutex<Vec<u8>>,
}

impl BufferSource {
    pub fn new(base: u64, data: Vec<u8>) -> Self {
        Self {
            base,
            data: Mutex::new(data),
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn end(&self) -> u64 {
        self.base + self.data.lock().len() as u64
    }

    /// Copy of the current image contents, for assertions.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    fn range(&self, addr: u64, len: usize) -> Result<(usize, usize), MemoryError> {
        let data_len = self.data.lock().len();
        let start = addr
            .checked_sub(self.base)
            .ok_or(MemoryError::OutOfRange { addr, len })? as usize;
        let end = start
            .checked_add(len)
            .ok_or(MemoryError::OutOfRange { addr, len })?;
        if end > data_len {
            return Err(MemoryError::OutOfRange { addr, len });
        }
        Ok((start, end))
    }
}

impl MemorySource for BufferSource {
    fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>, MemoryError> {
        let (start, end) = self.range(addr, len)?;
        Ok(self.data.lock()[start..end].to_vec())
    }

    fn write_bytes(&self, addr: u64, data: &[u8]) -> Result<(), MemoryError> {
        let (start, end) = self.range(addr, data.len())?;
        self.data.lock()[start..end].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_read_write_round_trip() {
        let src = BufferSource::new(0x1000, vec![0u8; 64]);
        src.write_bytes(0x1010, &[1, 2, 3, 4]).unwrap();
        assert_eq!(src.read_bytes(0x1010, 4).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(src.read_u32(0x1010).unwrap(), 0x04030201);
    }

    #[test]
    fn buffer_rejects_out_of_range() {
        let src = BufferSource::new(0x1000, vec![0u8; 16]);
        assert!(src.read_bytes(0x0fff, 4).is_err());
        assert!(src.read_bytes(0x100e, 4).is_err());
        assert!(src.write_bytes(0x1010, &[0]).is_err());
    }

    #[test]
    fn read_string_stops_at_terminator() {
        let mut image = vec![0u8; 512];
        image[16..21].copy_from_slice(b"hello");
        let src = BufferSource::new(0, image);
        assert_eq!(src.read_string(16).unwrap(), "hello");
    }

    #[test]
    fn read_string_spans_chunks() {
        let mut image = vec![b'a'; 1024];
        image[700] = 0;
        let src = BufferSource::new(0, image);
        assert_eq!(src.read_string(0).unwrap().len(), 700);
    }

    #[test]
    fn read_string_near_image_end() {
        let mut image = vec![0u8; 300];
        image[290..295].copy_from_slice(b"tail!");
        let src = BufferSource::new(0, image);
        assert_eq!(src.read_string(290).unwrap(), "tail!");
    }

    #[test]
    fn read_value_is_little_endian() {
        let src = BufferSource::new(0, vec![0x78, 0x56, 0x34, 0x12, 0, 0, 0, 0]);
        let v: u32 = src.read_value(0).unwrap();
        assert_eq!(v, 0x12345678);
    }

    #[test]
    fn read_array_steps_by_stride() {
        let mut image = Vec::new();
        for i in 0..4u16 {
            image.extend_from_slice(&i.to_le_bytes());
        }
        let src = BufferSource::new(0, image);
        let values: Vec<u16> = src.read_array(0, 4).unwrap();
        assert_eq!(values, vec![0, 1, 2, 3]);
    }
}
