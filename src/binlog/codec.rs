//! Integer and byte-string readers for event bodies.
//!
//! Every reader checks `remaining()` before touching the buffer, so a short
//! body surfaces as [`Error::TruncatedRead`] instead of a panic or a
//! zero-padded value. Binlog integers are little-endian except inside the
//! temporal cell formats, which use [`read_uint_be`].

use bytes::{Buf, Bytes};

use crate::{Error, Result};

/// Fails with `TruncatedRead` unless `needed` bytes remain.
pub fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(Error::TruncatedRead {
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

pub fn read_u8<B: Buf>(buf: &mut B) -> Result<u8> {
    ensure_remaining(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn read_u16_le<B: Buf>(buf: &mut B) -> Result<u16> {
    ensure_remaining(buf, 2)?;
    Ok(buf.get_u16_le())
}

pub fn read_u24_le<B: Buf>(buf: &mut B) -> Result<u32> {
    Ok(read_uint_le(buf, 3)? as u32)
}

pub fn read_u32_le<B: Buf>(buf: &mut B) -> Result<u32> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_u32_le())
}

/// Reads a 6-byte table id, zero-extended to 64 bits.
pub fn read_u48_le<B: Buf>(buf: &mut B) -> Result<u64> {
    read_uint_le(buf, 6)
}

pub fn read_u64_le<B: Buf>(buf: &mut B) -> Result<u64> {
    ensure_remaining(buf, 8)?;
    Ok(buf.get_u64_le())
}

/// Reads an unsigned little-endian integer of `width` bytes (1..=8).
pub fn read_uint_le<B: Buf>(buf: &mut B, width: usize) -> Result<u64> {
    check_width(width)?;
    ensure_remaining(buf, width)?;
    Ok(buf.get_uint_le(width))
}

/// Reads an unsigned big-endian integer of `width` bytes (1..=8).
pub fn read_uint_be<B: Buf>(buf: &mut B, width: usize) -> Result<u64> {
    check_width(width)?;
    ensure_remaining(buf, width)?;
    Ok(buf.get_uint(width))
}

fn check_width(width: usize) -> Result<()> {
    if width == 0 || width > 8 {
        return Err(Error::InvalidMessage {
            message: format!("Invalid integer width: {}", width),
        });
    }
    Ok(())
}

/// Reads a length-encoded ("packed") integer.
///
/// | first byte | value |
/// |---|---|
/// | 0..=250 | the byte itself |
/// | 251 | error marker, rejected |
/// | 252 | next 2 bytes, little-endian |
/// | 253 | next 3 bytes, little-endian |
/// | 254 | next 8 bytes, little-endian |
/// | 255 | rejected |
pub fn read_packed_integer<B: Buf>(buf: &mut B) -> Result<u64> {
    let marker = read_u8(buf)?;

    match marker {
        0..=250 => Ok(marker as u64),
        252 => Ok(read_u16_le(buf)? as u64),
        253 => Ok(read_u24_le(buf)? as u64),
        254 => read_u64_le(buf),
        251 | 255 => Err(Error::InvalidPackedIntegerMarker { marker }),
    }
}

/// Reads a packed integer and checks that it fits in memory on this platform.
pub fn read_packed_len<B: Buf>(buf: &mut B) -> Result<usize> {
    let value = read_packed_integer(buf)?;
    usize::try_from(value).map_err(|_| Error::InvalidMessage {
        message: format!("Length {} does not fit in memory", value),
    })
}

/// Reads `len` raw bytes.
pub fn read_bytes<B: Buf>(buf: &mut B, len: usize) -> Result<Bytes> {
    ensure_remaining(buf, len)?;
    Ok(buf.copy_to_bytes(len))
}

/// Advances past `len` bytes.
pub fn skip<B: Buf>(buf: &mut B, len: usize) -> Result<()> {
    ensure_remaining(buf, len)?;
    buf.advance(len);
    Ok(())
}
