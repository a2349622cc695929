//! Low-level binary reading utilities for archive parsing.
//!
//! All multi-byte fields in the CArchive cookie, the CArchive TOC and the
//! PYZ header are big-endian ("network byte order"). The marshal stream of
//! the PYZ directory is little-endian.

use std::io::{self, Read};

/// Reads a single byte.
pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads an unsigned 32-bit big-endian integer.
pub fn read_u32_be<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Reads a signed 32-bit big-endian integer.
pub fn read_i32_be<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

/// Reads an unsigned 32-bit little-endian integer.
pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Reads a signed 32-bit little-endian integer.
pub fn read_i32_le<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Reads an unsigned 16-bit little-endian integer.
pub fn read_u16_le<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Reads exactly `len` bytes into a new vector.
///
/// The read goes through `Read::take`, so a bogus length taken from a
/// corrupt header fails with `UnexpectedEof` instead of allocating `len`
/// bytes up front.
pub fn read_bytes<R: Read>(r: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(crate::READ_BUFFER_SIZE));
    r.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, got {}", len, buf.len()),
        ));
    }
    Ok(buf)
}

/// Decodes a fixed-size, NUL-padded text field.
///
/// Everything from the first NUL byte on is dropped; the rest is decoded
/// as UTF-8, replacing invalid sequences.
pub fn nul_padded_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
