//! Masked byte signature parsing and scanning
//!
//! Signatures are written the usual way: hex bytes separated by spaces, with
//! `?` or `??` for wildcard positions, e.g. `"63 C1 48 8D 05 ? ? ? ?"`.
//! Matches report the start offset of the signature, never interpret the
//! surrounding instructions; the one decoding idiom layered on top is
//! [`resolve_rel32`], which turns a 32-bit displacement found inside a match
//! into an absolute address.

use thiserror::Error;

use crate::source::{MemoryError, MemorySource};

/// Chunk size for scanning a memory source range.
const SCAN_CHUNK: usize = 1 << 20;

/// A parsed signature: one slot per byte, `None` = wildcard.
pub type Pattern = Vec<Option<u8>>;

/// Errors from parsing a signature string
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid hex byte in signature: {0}")]
    InvalidByte(String),

    #[error("empty signature pattern")]
    Empty,
}

/// Parse a signature pattern string into byte-or-wildcard slots.
pub fn parse_signature(pattern: &str) -> Result<Pattern, PatternError> {
    let mut result = Vec::new();

    for part in pattern.split_whitespace() {
        if part == "?" || part == "??" {
            result.push(None);
        } else {
            let byte = u8::from_str_radix(part, 16)
                .map_err(|_| PatternError::InvalidByte(part.to_string()))?;
            result.push(Some(byte));
        }
    }

    if result.is_empty() {
        return Err(PatternError::Empty);
    }

    Ok(result)
}

/// Scan a byte buffer for every match of `pattern`.
///
/// Returns the start offset of each match, in order. With `first_only` the
/// scan stops at the first hit.
pub fn scan(data: &[u8], pattern: &[Option<u8>], first_only: bool) -> Vec<usize> {
    let mut results = Vec::new();

    if pattern.is_empty() || data.len() < pattern.len() {
        return results;
    }

    'outer: for offset in 0..=(data.len() - pattern.len()) {
        for (i, expected) in pattern.iter().enumerate() {
            if let Some(byte) = expected {
                if data[offset + i] != *byte {
                    continue 'outer;
                }
            }
        }
        results.push(offset);
        if first_only {
            break;
        }
    }

    results
}

/// Scan an address range of a memory source.
///
/// Reads the range in overlapping chunks; unreadable chunks are skipped
/// rather than failing the whole scan, since module images routinely contain
/// gaps. Returns absolute addresses.
pub fn scan_source<S: MemorySource>(
    src: &S,
    start: u64,
    end: u64,
    pattern: &[Option<u8>],
    first_only: bool,
) -> Vec<u64> {
    scan_source_chunked(src, start, end, pattern, first_only, SCAN_CHUNK)
}

fn scan_source_chunked<S: MemorySource>(
    src: &S,
    start: u64,
    end: u64,
    pattern: &[Option<u8>],
    first_only: bool,
    chunk_size: usize,
) -> Vec<u64> {
    let mut results = Vec::new();
    if pattern.is_empty() || start >= end {
        return results;
    }

    let overlap = pattern.len() - 1;
    let mut at = start;

    while at < end {
        let len = ((end - at) as usize).min(chunk_size);
        if len < pattern.len() {
            break;
        }
        // Matches that begin inside the overlap tail belong to the next
        // chunk, except in the final one.
        let advance = (len - overlap).max(1);
        let is_last = at + len as u64 >= end;

        if let Ok(buf) = src.read_bytes(at, len) {
            for offset in scan(&buf, pattern, first_only) {
                if is_last || offset < advance {
                    results.push(at + offset as u64);
                    if first_only {
                        return results;
                    }
                }
            }
        }

        at += advance as u64;
    }

    results
}

/// Resolve a rip-relative 32-bit displacement.
///
/// Reads the i32 at `disp_addr` and adds it to `next_instr`, the address of
/// the instruction following the displacement's owner.
pub fn resolve_rel32<S: MemorySource>(
    src: &S,
    disp_addr: u64,
    next_instr: u64,
) -> Result<u64, MemoryError> {
    let disp = src.read_i32(disp_addr)? as i64;
    Ok((next_instr as i64 + disp) as u64)
}
