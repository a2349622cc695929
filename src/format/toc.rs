//! CArchive table-of-contents parsing.
//!
//! The TOC is a packed sequence of variable-length records:
//!
//! ```text
//! +-------------------+-------------+------------+--------------+-------+------+----------+
//! | record_length i32 | offset u32  | length u32 | ulength u32  | cflag | type | name ... |
//! +-------------------+-------------+------------+--------------+-------+------+----------+
//! ```
//!
//! `record_length` covers the whole record, including the name field. The
//! name is NUL-padded (producers pad it to a multiple of 16 bytes).

use std::io::Cursor;

use super::TOC_ENTRY_HEADER_SIZE;
use super::reader::{read_i32_be, read_u8, read_u32_be};
use crate::{Error, Result};

/// A raw TOC record, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocRecord {
    /// Entry name with NUL padding removed.
    pub name: String,
    /// Position of the entry data relative to the archive start.
    pub data_offset: u32,
    /// Length of the stored (possibly compressed) data.
    pub compressed_length: u32,
    /// Length of the data after decompression.
    pub uncompressed_length: u32,
    /// Whether the data is zlib-compressed.
    pub compressed: bool,
    /// The one-byte type code.
    pub type_code: u8,
}

/// Parses all records of a CArchive TOC.
///
/// Records are returned in on-disk order; duplicates are preserved and
/// resolved by the caller.
///
/// # Errors
///
/// Returns [`Error::CorruptHeader`] with the offset of the offending record
/// if a record is shorter than its fixed header, extends past the end of
/// the TOC, or has a name that is not valid UTF-8.
pub fn parse_toc(data: &[u8]) -> Result<Vec<TocRecord>> {
    let mut records = Vec::new();
    let mut pos = 0usize;

    while pos < data.len() {
        let remaining = data.len() - pos;
        if remaining < TOC_ENTRY_HEADER_SIZE {
            return Err(Error::corrupt(
                pos as u64,
                format!(
                    "truncated TOC record: {} bytes left, header needs {}",
                    remaining, TOC_ENTRY_HEADER_SIZE
                ),
            ));
        }

        let mut r = Cursor::new(&data[pos..pos + TOC_ENTRY_HEADER_SIZE]);
        let record_length = read_i32_be(&mut r)?;
        let data_offset = read_u32_be(&mut r)?;
        let compressed_length = read_u32_be(&mut r)?;
        let uncompressed_length = read_u32_be(&mut r)?;
        let compression_flag = read_u8(&mut r)?;
        let type_code = read_u8(&mut r)?;

        let record_length = usize::try_from(record_length)
            .ok()
            .filter(|&len| len >= TOC_ENTRY_HEADER_SIZE)
            .ok_or_else(|| {
                Error::corrupt(
                    pos as u64,
                    format!("invalid TOC record length {}", record_length),
                )
            })?;
        if record_length > remaining {
            return Err(Error::corrupt(
                pos as u64,
                format!(
                    "TOC record length {} exceeds remaining TOC data ({} bytes)",
                    record_length, remaining
                ),
            ));
        }

        let name_field = &data[pos + TOC_ENTRY_HEADER_SIZE..pos + record_length];
        let name_end = name_field
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);
        let name = std::str::from_utf8(&name_field[..name_end])
            .map_err(|e| Error::corrupt(pos as u64, format!("entry name is not UTF-8: {}", e)))?
            .to_owned();

        records.push(TocRecord {
            name,
            data_offset,
            compressed_length,
            uncompressed_length,
            compressed: compression_flag != 0,
            type_code,
        });
        pos += record_length;
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::type_code;

    fn record(name: &str, offset: u32, len: u32, ulen: u32, cflag: u8, typ: u8) -> Vec<u8> {
        let padded = (name.len() + 1).div_ceil(16) * 16;
        let total = TOC_ENTRY_HEADER_SIZE + padded;
        let mut data = Vec::with_capacity(total);
        data.extend_from_slice(&(total as i32).to_be_bytes());
        data.extend_from_slice(&offset.to_be_bytes());
        data.extend_from_slice(&len.to_be_bytes());
        data.extend_from_slice(&ulen.to_be_bytes());
        data.push(cflag);
        data.push(typ);
        data.extend_from_slice(name.as_bytes());
        data.resize(total, 0);
        data
    }

    #[test]
    fn test_parse_two_records() {
        let mut toc = record("pyiboot01_bootstrap", 0, 100, 250, 1, type_code::PYSOURCE);
        toc.extend(record("PYZ-00.pyz", 100, 4000, 4000, 0, type_code::PYZ));

        let records = parse_toc(&toc).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "pyiboot01_bootstrap");
        assert!(records[0].compressed);
        assert_eq!(records[0].uncompressed_length, 250);
        assert_eq!(records[1].name, "PYZ-00.pyz");
        assert_eq!(records[1].data_offset, 100);
        assert_eq!(records[1].type_code, type_code::PYZ);
        assert!(!records[1].compressed);
    }

    #[test]
    fn test_parse_empty_toc() {
        assert!(parse_toc(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_parse_keeps_duplicates() {
        let mut toc = record("dup", 0, 1, 1, 0, type_code::DATA);
        toc.extend(record("dup", 1, 1, 1, 0, type_code::DATA));
        let records = parse_toc(&toc).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].data_offset, 1);
    }

    #[test]
    fn test_parse_unicode_name() {
        let toc = record("données/é.txt", 0, 1, 1, 0, type_code::DATA);
        assert_eq!(parse_toc(&toc).unwrap()[0].name, "données/é.txt");
    }

    #[test]
    fn test_record_length_too_small() {
        let mut toc = record("a", 0, 1, 1, 0, type_code::DATA);
        toc[..4].copy_from_slice(&4i32.to_be_bytes());
        let err = parse_toc(&toc).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { offset: 0, .. }));
    }

    #[test]
    fn test_record_length_past_end() {
        let mut toc = record("a", 0, 1, 1, 0, type_code::DATA);
        let first_len = toc.len();
        toc.extend(record("b", 0, 1, 1, 0, type_code::DATA));
        toc[first_len..first_len + 4].copy_from_slice(&1000i32.to_be_bytes());
        let err = parse_toc(&toc).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { offset, .. } if offset == first_len as u64));
    }

    #[test]
    fn test_truncated_trailing_header() {
        let mut toc = record("a", 0, 1, 1, 0, type_code::DATA);
        toc.extend_from_slice(&[0u8; 7]);
        assert!(matches!(parse_toc(&toc), Err(Error::CorruptHeader { .. })));
    }

    #[test]
    fn test_invalid_utf8_name() {
        let mut toc = record("ab", 0, 1, 1, 0, type_code::DATA);
        toc[TOC_ENTRY_HEADER_SIZE] = 0xFF;
        assert!(matches!(parse_toc(&toc), Err(Error::CorruptHeader { .. })));
    }
}
