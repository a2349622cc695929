//! Backward signature scanning.
//!
//! The CArchive has no fixed position inside its file: it is appended to
//! the bootloader and may itself be followed by unrelated data (code
//! signatures, concatenated builds). The cookie is found by scanning the
//! file from the end towards the start for its magic pattern and taking the
//! last occurrence.

use std::io::{Read, Seek, SeekFrom};

use crate::{Error, Result};

/// Default chunk size for backward scanning (8 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = crate::READ_BUFFER_SIZE;

/// Scanner that finds the rightmost occurrence of a byte pattern.
///
/// The file is read backwards in chunks of at most `chunk_size` bytes.
/// Consecutive chunks overlap by `pattern.len() - 1` bytes, so a match that
/// straddles a chunk boundary is still seen in full by one of the chunks.
#[derive(Debug, Clone)]
pub struct MagicScanner<'p> {
    pattern: &'p [u8],
    chunk_size: usize,
}

impl<'p> MagicScanner<'p> {
    /// Creates a scanner for `pattern` with the default chunk size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the pattern is empty or longer
    /// than the default chunk size.
    pub fn new(pattern: &'p [u8]) -> Result<Self> {
        Self::with_chunk_size(pattern, DEFAULT_CHUNK_SIZE)
    }

    /// Creates a scanner with a custom chunk size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the pattern is empty or the
    /// chunk size is smaller than the pattern.
    pub fn with_chunk_size(pattern: &'p [u8], chunk_size: usize) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::InvalidArgument("empty scan pattern".into()));
        }
        if chunk_size < pattern.len() {
            return Err(Error::InvalidArgument(format!(
                "chunk size {} is smaller than pattern length {}",
                chunk_size,
                pattern.len()
            )));
        }
        Ok(Self {
            pattern,
            chunk_size,
        })
    }

    /// Finds the absolute offset of the last occurrence of the pattern.
    ///
    /// Returns `Ok(None)` if the pattern does not occur. Inputs shorter than
    /// the pattern are rejected without reading.
    pub fn find_last<R: Read + Seek>(&self, reader: &mut R) -> Result<Option<u64>> {
        let pattern_len = self.pattern.len() as u64;
        let file_size = reader.seek(SeekFrom::End(0)).map_err(Error::Io)?;
        if file_size < pattern_len {
            return Ok(None);
        }

        let mut buffer = vec![0u8; self.chunk_size];
        let mut end_pos = file_size;
        loop {
            let start_pos = end_pos.saturating_sub(self.chunk_size as u64);
            let chunk_len = (end_pos - start_pos) as usize;
            if (chunk_len as u64) < pattern_len {
                break;
            }

            reader.seek(SeekFrom::Start(start_pos)).map_err(Error::Io)?;
            let chunk = &mut buffer[..chunk_len];
            reader.read_exact(chunk).map_err(Error::Io)?;

            if let Some(pos) = rfind(chunk, self.pattern) {
                return Ok(Some(start_pos + pos as u64));
            }

            if start_pos == 0 {
                break;
            }
            // Overlap by pattern_len - 1 so boundary-straddling matches are
            // fully contained in the next chunk.
            end_pos = start_pos + pattern_len - 1;
        }

        Ok(None)
    }
}

/// Returns the position of the last occurrence of `needle` in `haystack`.
pub(crate) fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MAGIC: &[u8] = b"MEI\x0c\x0b\x0a\x0b\x0e";

    fn find(data: Vec<u8>) -> Option<u64> {
        MagicScanner::new(MAGIC)
            .unwrap()
            .find_last(&mut Cursor::new(data))
            .unwrap()
    }

    /// Reader that counts read calls, used to check that short inputs are
    /// rejected without reading.
    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        reads: usize,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads += 1;
            self.inner.read(buf)
        }
    }

    impl Seek for CountingReader {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_find_at_end() {
        let mut data = vec![0xAAu8; 10_000];
        data.extend_from_slice(MAGIC);
        let offset = find(data);
        assert_eq!(offset, Some(10_000));
    }

    #[test]
    fn test_find_at_start() {
        let mut data = MAGIC.to_vec();
        data.extend(vec![0u8; 20_000]);
        let offset = find(data);
        assert_eq!(offset, Some(0));
    }

    #[test]
    fn test_not_found() {
        let data = vec![0u8; 100];
        assert_eq!(find(data), None);
    }

    #[test]
    fn test_prefers_last_occurrence() {
        let mut data = vec![0u8; 50];
        data.extend_from_slice(MAGIC);
        data.extend(vec![0u8; 30]);
        data.extend_from_slice(MAGIC);
        data.extend(vec![0u8; 5]);
        let offset = find(data);
        assert_eq!(offset, Some(50 + 8 + 30));
    }

    #[test]
    fn test_prefers_last_occurrence_across_chunks() {
        let mut data = vec![0u8; 40];
        data.extend_from_slice(MAGIC);
        data.extend(vec![0u8; 200]);
        data.extend_from_slice(MAGIC);
        let expected = (40 + 8 + 200) as u64;
        let scanner = MagicScanner::with_chunk_size(MAGIC, 16).unwrap();
        assert_eq!(scanner.find_last(&mut Cursor::new(data)).unwrap(), Some(expected));
    }

    #[test]
    fn test_pattern_straddling_chunk_boundary() {
        // With chunk size 32 on a 64-byte file, the first chunk covers
        // [32, 64). Put the pattern at [28, 36) so it straddles offset 32.
        let mut data = vec![0u8; 64];
        data[28..36].copy_from_slice(MAGIC);
        let scanner = MagicScanner::with_chunk_size(MAGIC, 32).unwrap();
        assert_eq!(scanner.find_last(&mut Cursor::new(data)).unwrap(), Some(28));
    }

    #[test]
    fn test_every_boundary_position() {
        let chunk = 16usize;
        let scanner = MagicScanner::with_chunk_size(MAGIC, chunk).unwrap();
        for pos in 0..=(100 - MAGIC.len()) {
            let mut data = vec![0u8; 100];
            data[pos..pos + MAGIC.len()].copy_from_slice(MAGIC);
            let found = scanner.find_last(&mut Cursor::new(data)).unwrap();
            assert_eq!(found, Some(pos as u64), "pattern at {}", pos);
        }
    }

    #[test]
    fn test_short_input_not_read() {
        let mut reader = CountingReader {
            inner: Cursor::new(vec![0u8; 3]),
            reads: 0,
        };
        assert_eq!(
            MagicScanner::new(MAGIC).unwrap().find_last(&mut reader).unwrap(),
            None
        );
        assert_eq!(reader.reads, 0);
    }

    #[test]
    fn test_exact_length_input() {
        let data = MAGIC.to_vec();
        assert_eq!(find(data), Some(0));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(
            MagicScanner::new(b""),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            MagicScanner::with_chunk_size(MAGIC, 4),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rfind() {
        assert_eq!(rfind(b"abcabc", b"abc"), Some(3));
        assert_eq!(rfind(b"ab", b"abc"), None);
        assert_eq!(rfind(b"xyz", b"q"), None);
    }
}
