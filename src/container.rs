//! On-image container format (C2): magic, header, one payload region.
//!
//! Bit layout, offsets from 0: `magic` (32, MSB-first) · `payload_size` (32,
//! MSB-first) · `ext_length` (8, `0..=10`) · `extension` (`8*ext_length`
//! ASCII bytes, MSB-first per byte, no trailing NUL) · `payload`
//! (`8*payload_size` raw bytes, MSB-first per byte).
//!
//! The in-memory filesystem's directory is derived from this header, not
//! stored separately: a populated container always exposes exactly one file,
//! `hidden_file`, whose data begins right after the extension field.

use crate::codec::{read_bits, write_bits};
use crate::error::{StegoError, StegoResult};

pub const MAGIC: u32 = 0x0535_4454;
pub const MAX_EXT_LENGTH: u8 = 10;

/// Bits consumed by `magic` + `payload_size` + `ext_length`, before any
/// variable-length extension or payload bytes.
const HEADER_FIXED_BITS: u32 = 32 + 32 + 8;

pub const DEFAULT_FILE_NAME: &str = "hidden_file";

/// Result of parsing the header of an image buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedContainer {
    /// No magic at bit 0: the image carries no payload.
    Empty,
    Populated {
        ext_length: u8,
        extension: Vec<u8>,
        payload_size: u32,
        /// Bit address where payload data begins.
        payload_offset: usize,
    },
}

/// Bits of capacity consumed by a header with extension length `ext_length`
/// and payload of `payload_size` bytes.
fn required_bits(ext_length: u8, payload_size: u32) -> u64 {
    HEADER_FIXED_BITS as u64 + 8 * ext_length as u64 + 8 * payload_size as u64
}

/// Total addressable bits in a buffer of this length (one bit per byte).
pub fn capacity_bits(buf_len: usize) -> u64 {
    buf_len as u64
}

/// Bytes of payload capacity after subtracting header overhead for a given
/// extension length.
pub fn capacity_bytes(buf_len: usize, ext_length: u8) -> u64 {
    let bits = capacity_bits(buf_len);
    let overhead = HEADER_FIXED_BITS as u64 + 8 * ext_length as u64;
    bits.saturating_sub(overhead) / 8
}

/// Serialize `magic`, `payload_size`, `ext_length`, `extension`, `payload`
/// into `buf` starting at bit address 0.
pub fn serialize(buf: &mut [u8], extension: &[u8], payload: &[u8]) -> StegoResult<()> {
    if extension.len() > MAX_EXT_LENGTH as usize {
        return Err(StegoError::CorruptContainer(format!(
            "extension length {} exceeds {MAX_EXT_LENGTH}",
            extension.len()
        )));
    }
    let needed = required_bits(extension.len() as u8, payload.len() as u32);
    if needed > capacity_bits(buf.len()) {
        return Err(StegoError::TooLarge {
            requested: needed / 8,
            capacity: buf.len() as u64 / 8,
        });
    }

    let mut p = 0usize;
    write_bits(buf, MAGIC as u64, 32, &mut p);
    write_bits(buf, payload.len() as u64, 32, &mut p);
    write_bits(buf, extension.len() as u64, 8, &mut p);
    for &b in extension {
        write_bits(buf, b as u64, 8, &mut p);
    }
    for &b in payload {
        write_bits(buf, b as u64, 8, &mut p);
    }
    Ok(())
}

/// Parse the header at bit address 0. Absence of the magic is reported as
/// [`ParsedContainer::Empty`], not an error; a magic that is present but
/// whose `ext_length`/`payload_size` violate capacity is a corrupt container.
pub fn parse(buf: &[u8]) -> StegoResult<ParsedContainer> {
    let mut p = 0usize;
    let magic = read_bits(buf, 32, &mut p) as u32;
    if magic != MAGIC {
        return Ok(ParsedContainer::Empty);
    }

    let payload_size = read_bits(buf, 32, &mut p) as u32;
    let ext_length = read_bits(buf, 8, &mut p) as u8;

    if ext_length > MAX_EXT_LENGTH {
        return Err(StegoError::CorruptContainer(format!(
            "ext_length {ext_length} exceeds {MAX_EXT_LENGTH}"
        )));
    }

    let max_payload = capacity_bytes(buf.len(), ext_length);
    if payload_size as u64 > max_payload {
        return Err(StegoError::CorruptContainer(format!(
            "payload_size {payload_size} exceeds capacity {max_payload}"
        )));
    }

    let mut extension = vec![0u8; ext_length as usize];
    for slot in extension.iter_mut() {
        *slot = read_bits(buf, 8, &mut p) as u8;
    }

    Ok(ParsedContainer::Populated {
        ext_length,
        extension,
        payload_size,
        payload_offset: p,
    })
}

/// Read `payload_size` bytes of payload starting at `payload_offset`.
pub fn read_payload(buf: &[u8], payload_offset: usize, payload_size: u32) -> Vec<u8> {
    let mut p = payload_offset;
    let mut out = Vec::with_capacity(payload_size as usize);
    for _ in 0..payload_size {
        out.push(read_bits(buf, 8, &mut p) as u8);
    }
    out
}
