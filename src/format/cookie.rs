//! CArchive cookie (trailer) parsing.

use std::io::{Cursor, Read};

use super::reader::{nul_padded_str, read_i32_be, read_u32_be};
use super::{COOKIE_MAGIC, COOKIE_SIZE, LIBNAME_SIZE};
use crate::{Error, Result};

/// The fixed-size record that locates a CArchive inside its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Length of the whole archive, including the cookie itself.
    pub archive_length: u32,
    /// Position of the TOC relative to the archive start.
    pub toc_offset: u32,
    /// Length of the TOC in bytes.
    pub toc_length: u32,
    /// Python version the archive was built for (`major * 100 + minor`).
    pub python_version: i32,
    /// Name of the Python shared library (e.g. `libpython3.11.so.1.0`).
    pub python_library_name: String,
}

impl Cookie {
    /// Parses a cookie from its on-disk representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if the data is truncated, the magic
    /// does not match, the TOC length is negative, or the library name is
    /// empty.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < COOKIE_SIZE {
            return Err(Error::InvalidFormat(format!(
                "truncated cookie: expected {} bytes, got {}",
                COOKIE_SIZE,
                data.len()
            )));
        }
        if &data[..COOKIE_MAGIC.len()] != COOKIE_MAGIC {
            return Err(Error::InvalidFormat("cookie magic mismatch".into()));
        }

        let mut r = Cursor::new(&data[COOKIE_MAGIC.len()..COOKIE_SIZE]);
        let archive_length = read_u32_be(&mut r)?;
        let toc_offset = read_u32_be(&mut r)?;
        let toc_length = read_i32_be(&mut r)?;
        let python_version = read_i32_be(&mut r)?;
        let mut libname = [0u8; LIBNAME_SIZE];
        r.read_exact(&mut libname)?;

        let toc_length = u32::try_from(toc_length).map_err(|_| {
            Error::InvalidFormat(format!("negative TOC length in cookie: {}", toc_length))
        })?;

        let python_library_name = nul_padded_str(&libname);
        if python_library_name.is_empty() {
            return Err(Error::InvalidFormat(
                "Python shared library name not set in the archive".into(),
            ));
        }

        Ok(Self {
            archive_length,
            toc_offset,
            toc_length,
            python_version,
            python_library_name,
        })
    }

    /// Returns the Python version as `(major, minor)`.
    pub fn python_version_tuple(&self) -> (u32, u32) {
        let v = self.python_version.max(0) as u32;
        (v / 100, v % 100)
    }
}
