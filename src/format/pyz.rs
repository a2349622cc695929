//! PYZ header and directory parsing.

use std::io::Read;

use super::marshal::{self, MarshalReader, Value};
use super::{PYMAGIC_SIZE, PYZ_HEADER_SIZE, PYZ_MAGIC};
use crate::{Error, Result};

/// The fixed header at the start of a PYZ archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyzHeader {
    /// Bytecode compatibility magic of the Python that built the archive.
    pub pymagic: [u8; PYMAGIC_SIZE],
    /// Position of the marshalled directory, relative to the PYZ start.
    pub toc_offset: i32,
}

impl PyzHeader {
    /// Reads and validates the header.
    ///
    /// The bytecode magic is only compared when `expected_pymagic` is given.
    pub fn read<R: Read>(reader: &mut R, expected_pymagic: Option<&[u8; PYMAGIC_SIZE]>) -> Result<Self> {
        let mut data = [0u8; PYZ_HEADER_SIZE];
        reader.read_exact(&mut data).map_err(|e| {
            Error::InvalidFormat(format!("cannot read PYZ header: {}", e))
        })?;

        if &data[..PYZ_MAGIC.len()] != PYZ_MAGIC {
            return Err(Error::InvalidFormat("PYZ magic pattern mismatch".into()));
        }

        let mut pymagic = [0u8; PYMAGIC_SIZE];
        pymagic.copy_from_slice(&data[PYZ_MAGIC.len()..PYZ_MAGIC.len() + PYMAGIC_SIZE]);
        if let Some(expected) = expected_pymagic {
            if &pymagic != expected {
                return Err(Error::InvalidFormat(format!(
                    "Python magic pattern mismatch: archive has {:02x?}, expected {:02x?}",
                    pymagic, expected
                )));
            }
        }

        let mut offset = [0u8; 4];
        offset.copy_from_slice(&data[PYZ_MAGIC.len() + PYMAGIC_SIZE..]);
        let toc_offset = i32::from_be_bytes(offset);
        if toc_offset < PYZ_HEADER_SIZE as i32 {
            return Err(Error::InvalidFormat(format!(
                "PYZ directory offset {} points into the header",
                toc_offset
            )));
        }

        Ok(Self { pymagic, toc_offset })
    }
}

/// A raw PYZ directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyzTocRecord {
    /// Dotted module or resource name.
    pub name: String,
    /// Raw type code (see [`pyz_type_code`](super::pyz_type_code)).
    pub type_code: i64,
    /// Data position relative to the PYZ start.
    pub data_offset: i32,
    /// Stored data length.
    pub data_length: i32,
}

/// Reads the marshalled directory from `reader`.
///
/// Accepts both the list-of-pairs and the dict layout. Records are returned
/// in stream order; duplicates are resolved by the caller.
pub fn read_pyz_toc<R: Read>(reader: R) -> Result<Vec<PyzTocRecord>> {
    let value = MarshalReader::new(reader).read_value()?;
    match value {
        Value::List(items) | Value::Tuple(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let pair = item
                    .as_sequence()
                    .filter(|p| p.len() == 2)
                    .ok_or_else(|| invalid_record(index, "not a (name, entry) pair"))?;
                convert_record(index, &pair[0], &pair[1])
            })
            .collect(),
        Value::Dict(pairs) => pairs
            .iter()
            .enumerate()
            .map(|(index, (key, value))| convert_record(index, key, value))
            .collect(),
        other => Err(Error::corrupt(
            0,
            format!(
                "PYZ directory must be a list or dict, found {}",
                marshal::describe(&other)
            ),
        )),
    }
}

fn invalid_record(index: usize, reason: &str) -> Error {
    Error::corrupt(0, format!("PYZ directory record {}: {}", index, reason))
}

fn convert_record(index: usize, name: &Value, entry: &Value) -> Result<PyzTocRecord> {
    let name = name
        .as_str()
        .ok_or_else(|| invalid_record(index, "name is not a string"))?;
    let fields = entry
        .as_sequence()
        .filter(|f| f.len() == 3)
        .ok_or_else(|| invalid_record(index, "entry is not a (type, offset, length) tuple"))?;

    let type_code = fields[0]
        .as_int()
        .ok_or_else(|| invalid_record(index, "type code is not an integer"))?;
    let as_i32 = |value: &Value, what: &str| {
        value
            .as_int()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| invalid_record(index, &format!("{} is not a 32-bit integer", what)))
    };

    Ok(PyzTocRecord {
        name: name.to_owned(),
        type_code,
        data_offset: as_i32(&fields[1], "offset")?,
        data_length: as_i32(&fields[2], "length")?,
    })
}
