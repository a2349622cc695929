//! PyInstaller archive format constants, definitions, and low-level parsing
//! utilities.
//!
//! Two formats live here:
//!
//! - **CArchive** (PKG): appended to the bootloader executable and located
//!   through a trailing [`cookie`]. Its table of contents is a sequence of
//!   variable-length [`toc`] records.
//! - **PYZ** (zlib archive): stored as an entry of the CArchive. Its
//!   [`pyz`] header points to a [`marshal`]-encoded directory.
//!
//! ```text
//! +---------------------+  <- start of file
//! | bootloader (exe)    |
//! +---------------------+  <- start_offset
//! | entry data ...      |
//! |   +-------------+   |
//! |   | PYZ archive |   |  <- start_offset + entry.data_offset
//! |   +-------------+   |
//! | TOC records         |  <- start_offset + toc_offset
//! | cookie (88 bytes)   |  <- start_offset + archive_length - 88
//! +---------------------+
//! | (optional trailer,  |
//! |  e.g. code signing) |
//! +---------------------+
//! ```

pub mod cookie;
pub mod marshal;
pub mod pyz;
pub mod reader;
pub mod toc;

/// The CArchive cookie magic pattern: `'MEI' 0x0C 0x0B 0x0A 0x0B 0x0E`.
pub const COOKIE_MAGIC: &[u8; 8] = b"MEI\x0c\x0b\x0a\x0b\x0e";

/// Size of the cookie in bytes.
///
/// The cookie contains:
/// - 8 bytes: magic
/// - 4 bytes: archive length
/// - 4 bytes: TOC offset (relative to archive start)
/// - 4 bytes: TOC length
/// - 4 bytes: Python version (`major * 100 + minor`)
/// - 64 bytes: Python shared library name
pub const COOKIE_SIZE: usize = 88;

/// Size of the Python library name field in the cookie.
pub const LIBNAME_SIZE: usize = 64;

/// Size of the fixed part of a CArchive TOC record.
///
/// Layout: record length (4), data offset (4), compressed length (4),
/// uncompressed length (4), compression flag (1), type code (1).
pub const TOC_ENTRY_HEADER_SIZE: usize = 18;

/// The PYZ magic pattern: `'PYZ' 0x00`.
pub const PYZ_MAGIC: &[u8; 4] = b"PYZ\0";

/// Length of the bytecode compatibility ("pymagic") field of a PYZ header.
pub const PYMAGIC_SIZE: usize = 4;

/// Size of the PYZ header: magic, pymagic, TOC offset.
pub const PYZ_HEADER_SIZE: usize = PYZ_MAGIC.len() + PYMAGIC_SIZE + 4;

/// Type codes of CArchive TOC entries.
///
/// Each code is a single ASCII character in the on-disk record.
pub mod type_code {
    /// Shared library or other binary.
    pub const BINARY: u8 = b'b';
    /// Reference to a file stored in another archive (`path:filename`).
    pub const DEPENDENCY: u8 = b'd';
    /// Embedded PYZ archive with frozen Python code.
    pub const PYZ: u8 = b'z';
    /// Embedded zip archive.
    pub const ZIPFILE: u8 = b'Z';
    /// Python package (`__init__`).
    pub const PYPACKAGE: u8 = b'M';
    /// Python module.
    pub const PYMODULE: u8 = b'm';
    /// Python script.
    pub const PYSOURCE: u8 = b's';
    /// Data file.
    pub const DATA: u8 = b'x';
    /// Runtime option; the name carries the option, there is no data.
    pub const RUNTIME_OPTION: u8 = b'o';
    /// Splash screen resources.
    pub const SPLASH: u8 = b'l';
    /// Symbolic link; the data is the link target.
    pub const SYMLINK: u8 = b'n';
}

/// Type codes of PYZ directory entries.
pub mod pyz_type_code {
    /// Python module.
    pub const MODULE: i64 = 0;
    /// Python package.
    pub const PKG: i64 = 1;
    /// Data blob.
    pub const DATA: i64 = 2;
    /// PEP 420 namespace package.
    pub const NSPKG: i64 = 3;
}
