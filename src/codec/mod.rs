//! Decompression support for archive entries.
//!
//! Both archive kinds use zlib: CArchive entries when their compression flag
//! is set, PYZ entries always.

pub mod zlib;

use std::io::{self, Read};

pub use zlib::ZlibDecoder;

/// Decompresses a complete zlib stream held in memory.
///
/// If `expected_len` is given, the output must be exactly that long;
/// decoding stops one byte past the declared size, so a lying header cannot
/// make the decoder inflate an unbounded amount of data.
///
/// # Errors
///
/// Returns `InvalidData` if the stream is corrupt or the output length does
/// not match `expected_len`, and `UnexpectedEof` if the stream is truncated.
pub fn decompress_zlib(data: &[u8], expected_len: Option<usize>) -> io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut output = Vec::with_capacity(expected_len.unwrap_or(data.len() * 2).min(1 << 26));

    match expected_len {
        Some(len) => {
            (&mut decoder).take(len as u64 + 1).read_to_end(&mut output)?;
            if output.len() != len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "decompressed size mismatch: declared {} bytes, got {}{}",
                        len,
                        if output.len() > len { "more than " } else { "" },
                        output.len().min(len)
                    ),
                ));
            }
        }
        None => {
            decoder.read_to_end(&mut output)?;
        }
    }

    Ok(output)
}
