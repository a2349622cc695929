//! Directory entry types for both archive kinds.

use crate::format::toc::TocRecord;
use crate::format::{pyz::PyzTocRecord, pyz_type_code, type_code};

/// Kind of a CArchive entry, from its one-byte type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CEntryKind {
    /// Shared library or executable (`b`).
    Binary,
    /// Reference to an entry in another archive of a multipackage build (`d`).
    Dependency,
    /// Embedded PYZ archive (`z`).
    EmbeddedArchive,
    /// Embedded zip archive (`Z`).
    EmbeddedZipArchive,
    /// Python package `__init__` bytecode (`M`).
    Package,
    /// Python module bytecode (`m`).
    Module,
    /// Python script source run at startup (`s`).
    Source,
    /// Data file (`x`).
    Data,
    /// Interpreter runtime option (`o`); the name holds the option.
    RuntimeOption,
    /// Splash screen resources (`l`).
    SplashResource,
    /// Symbolic link (`n`); the data holds the link target.
    Symlink,
    /// Any other type code. Kept so that newer archives still parse.
    Unknown(u8),
}

impl CEntryKind {
    /// Maps a raw type code to its kind.
    pub fn from_code(code: u8) -> Self {
        match code {
            type_code::BINARY => Self::Binary,
            type_code::DEPENDENCY => Self::Dependency,
            type_code::PYZ => Self::EmbeddedArchive,
            type_code::ZIPFILE => Self::EmbeddedZipArchive,
            type_code::PYPACKAGE => Self::Package,
            type_code::PYMODULE => Self::Module,
            type_code::PYSOURCE => Self::Source,
            type_code::DATA => Self::Data,
            type_code::RUNTIME_OPTION => Self::RuntimeOption,
            type_code::SPLASH => Self::SplashResource,
            type_code::SYMLINK => Self::Symlink,
            other => Self::Unknown(other),
        }
    }

    /// Returns the raw type code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Binary => type_code::BINARY,
            Self::Dependency => type_code::DEPENDENCY,
            Self::EmbeddedArchive => type_code::PYZ,
            Self::EmbeddedZipArchive => type_code::ZIPFILE,
            Self::Package => type_code::PYPACKAGE,
            Self::Module => type_code::PYMODULE,
            Self::Source => type_code::PYSOURCE,
            Self::Data => type_code::DATA,
            Self::RuntimeOption => type_code::RUNTIME_OPTION,
            Self::SplashResource => type_code::SPLASH,
            Self::Symlink => type_code::SYMLINK,
            Self::Unknown(code) => *code,
        }
    }

    /// Returns true for entries that a onefile bootloader unpacks to disk.
    pub fn is_extractable(&self) -> bool {
        matches!(
            self,
            Self::Binary | Self::Data | Self::EmbeddedZipArchive | Self::Symlink | Self::Dependency
        )
    }

    /// Returns a short human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Dependency => "dependency",
            Self::EmbeddedArchive => "pyz",
            Self::EmbeddedZipArchive => "zipfile",
            Self::Package => "package",
            Self::Module => "module",
            Self::Source => "source",
            Self::Data => "data",
            Self::RuntimeOption => "option",
            Self::SplashResource => "splash",
            Self::Symlink => "symlink",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl std::fmt::Display for CEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An entry in a CArchive directory.
///
/// Offsets are relative to the start of the archive, not the file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct CEntry {
    /// Entry name.
    pub name: String,
    /// Position of the entry data.
    pub data_offset: u32,
    /// Stored length.
    pub compressed_length: u32,
    /// Length after decompression.
    pub uncompressed_length: u32,
    /// Whether the stored data is zlib-compressed.
    pub compressed: bool,
    /// Entry kind.
    pub kind: CEntryKind,
}

impl CEntry {
    pub(crate) fn from_record(record: TocRecord) -> Self {
        Self {
            name: record.name,
            data_offset: record.data_offset,
            compressed_length: record.compressed_length,
            uncompressed_length: record.uncompressed_length,
            compressed: record.compressed,
            kind: CEntryKind::from_code(record.type_code),
        }
    }

    /// Splits a dependency entry name into `(archive path, file name)`.
    ///
    /// Dependency entries are named `path:filename` and point at a file
    /// stored in another archive of a multipackage build. Returns `None`
    /// for other kinds and for malformed names.
    pub fn dependency_reference(&self) -> Option<(&str, &str)> {
        if self.kind != CEntryKind::Dependency {
            return None;
        }
        let (path, file) = self.name.split_once(':')?;
        if path.is_empty() || file.is_empty() {
            return None;
        }
        Some((path, file))
    }
}

/// Kind of a PYZ entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PyzEntryKind {
    /// Plain module.
    Module,
    /// Regular package (`__init__`).
    Package,
    /// Data resource.
    Data,
    /// Namespace package without an `__init__`.
    NamespacePackage,
}

impl PyzEntryKind {
    /// Maps a raw type code to its kind.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            pyz_type_code::MODULE => Some(Self::Module),
            pyz_type_code::PKG => Some(Self::Package),
            pyz_type_code::DATA => Some(Self::Data),
            pyz_type_code::NSPKG => Some(Self::NamespacePackage),
            _ => None,
        }
    }

    /// Returns the raw type code.
    pub fn code(&self) -> i64 {
        match self {
            Self::Module => pyz_type_code::MODULE,
            Self::Package => pyz_type_code::PKG,
            Self::Data => pyz_type_code::DATA,
            Self::NamespacePackage => pyz_type_code::NSPKG,
        }
    }

    /// Returns true if the entry holds compiled code.
    pub fn is_code(&self) -> bool {
        !matches!(self, Self::Data)
    }

    /// Returns true for regular and namespace packages.
    pub fn is_package(&self) -> bool {
        matches!(self, Self::Package | Self::NamespacePackage)
    }
}

impl std::fmt::Display for PyzEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Module => "module",
            Self::Package => "package",
            Self::Data => "data",
            Self::NamespacePackage => "nspkg",
        })
    }
}

/// An entry in a PYZ directory.
///
/// Offsets are relative to the start of the PYZ archive.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct PyzEntry {
    /// Dotted module or resource name.
    pub name: String,
    /// Entry kind.
    pub kind: PyzEntryKind,
    /// Position of the entry data.
    pub data_offset: i32,
    /// Stored length, including the IV for encrypted entries.
    pub data_length: i32,
}

impl PyzEntry {
    /// Converts a raw directory record. Returns `None` for unknown kinds.
    pub(crate) fn from_record(record: PyzTocRecord) -> Option<Self> {
        let kind = PyzEntryKind::from_code(record.type_code)?;
        Some(Self {
            name: record.name,
            kind,
            data_offset: record.data_offset,
            data_length: record.data_length,
        })
    }
}
