//! Binary codec primitives for message payloads.
//!
//! All multi-byte integers are little-endian. Strings and byte arrays carry
//! an `i32` length prefix where `-1` marks a null value. UUIDs are written as
//! two `i64` halves (most-significant first).
//!
//! Readers fail with [`ProtocolError::Truncated`] instead of panicking when
//! the payload runs short; writers are infallible.

use bytes::{Buf, BufMut};
use uuid::Uuid;

use crate::error::ProtocolError;

/// Length-prefix value marking a null string or byte array.
const NULL_LEN: i32 = -1;

fn ensure(src: &impl Buf, needed: usize) -> Result<(), ProtocolError> {
    if src.remaining() < needed {
        return Err(ProtocolError::Truncated {
            expected: needed,
            available: src.remaining(),
        });
    }
    Ok(())
}

/// Read a single boolean byte; any nonzero value is `true`.
pub fn read_bool(src: &mut impl Buf) -> Result<bool, ProtocolError> {
    ensure(src, 1)?;
    Ok(src.get_u8() != 0)
}

/// Read an unsigned byte.
pub fn read_u8(src: &mut impl Buf) -> Result<u8, ProtocolError> {
    ensure(src, 1)?;
    Ok(src.get_u8())
}

/// Read a little-endian `i16`.
pub fn read_i16(src: &mut impl Buf) -> Result<i16, ProtocolError> {
    ensure(src, 2)?;
    Ok(src.get_i16_le())
}

/// Read a little-endian `u16`.
pub fn read_u16(src: &mut impl Buf) -> Result<u16, ProtocolError> {
    ensure(src, 2)?;
    Ok(src.get_u16_le())
}

/// Read a little-endian `i32`.
pub fn read_i32(src: &mut impl Buf) -> Result<i32, ProtocolError> {
    ensure(src, 4)?;
    Ok(src.get_i32_le())
}

/// Read a little-endian `i64`.
pub fn read_i64(src: &mut impl Buf) -> Result<i64, ProtocolError> {
    ensure(src, 8)?;
    Ok(src.get_i64_le())
}

/// Read a nullable length-prefixed UTF-8 string.
pub fn read_string(src: &mut impl Buf) -> Result<Option<String>, ProtocolError> {
    match read_byte_array(src)? {
        Some(bytes) => Ok(Some(String::from_utf8(bytes)?)),
        None => Ok(None),
    }
}

/// Read a nullable length-prefixed byte array.
pub fn read_byte_array(src: &mut impl Buf) -> Result<Option<Vec<u8>>, ProtocolError> {
    let len = read_i32(src)?;
    if len == NULL_LEN {
        return Ok(None);
    }
    if len < 0 {
        return Err(ProtocolError::InvalidLength(len));
    }
    let len = len as usize;
    ensure(src, len)?;
    let mut bytes = vec![0u8; len];
    src.copy_to_slice(&mut bytes);
    Ok(Some(bytes))
}

/// Read a UUID written as two `i64` halves, most-significant first.
pub fn read_uuid(src: &mut impl Buf) -> Result<Uuid, ProtocolError> {
    let msb = read_i64(src)?;
    let lsb = read_i64(src)?;
    Ok(Uuid::from_u64_pair(msb as u64, lsb as u64))
}

/// Write a boolean as a single byte.
pub fn write_bool(dst: &mut impl BufMut, value: bool) {
    dst.put_u8(u8::from(value));
}

/// Write an unsigned byte.
pub fn write_u8(dst: &mut impl BufMut, value: u8) {
    dst.put_u8(value);
}

/// Write a little-endian `i16`.
pub fn write_i16(dst: &mut impl BufMut, value: i16) {
    dst.put_i16_le(value);
}

/// Write a little-endian `u16`.
pub fn write_u16(dst: &mut impl BufMut, value: u16) {
    dst.put_u16_le(value);
}

/// Write a little-endian `i32`.
pub fn write_i32(dst: &mut impl BufMut, value: i32) {
    dst.put_i32_le(value);
}

/// Write a little-endian `i64`.
pub fn write_i64(dst: &mut impl BufMut, value: i64) {
    dst.put_i64_le(value);
}

/// Write a nullable length-prefixed UTF-8 string.
pub fn write_string(dst: &mut impl BufMut, value: Option<&str>) {
    write_byte_array(dst, value.map(str::as_bytes));
}

/// Write a nullable length-prefixed byte array.
pub fn write_byte_array(dst: &mut impl BufMut, value: Option<&[u8]>) {
    match value {
        Some(bytes) => {
            dst.put_i32_le(bytes.len() as i32);
            dst.put_slice(bytes);
        }
        None => dst.put_i32_le(NULL_LEN),
    }
}

/// Write a UUID as two `i64` halves, most-significant first.
pub fn write_uuid(dst: &mut impl BufMut, value: Uuid) {
    let (msb, lsb) = value.as_u64_pair();
    dst.put_i64_le(msb as i64);
    dst.put_i64_le(lsb as i64);
}

/// Encode a nullable boolean as the handshake tri-state byte.
///
/// `None` → 0, `Some(false)` → 1, `Some(true)` → 2.
#[must_use]
pub fn nullable_bool_to_byte(value: Option<bool>) -> u8 {
    match value {
        None => 0,
        Some(false) => 1,
        Some(true) => 2,
    }
}

/// Decode the handshake tri-state byte back into a nullable boolean.
pub fn byte_to_nullable_bool(value: u8) -> Result<Option<bool>, ProtocolError> {
    match value {
        0 => Ok(None),
        1 => Ok(Some(false)),
        2 => Ok(Some(true)),
        other => Err(ProtocolError::InvalidTriState(other)),
    }
}
