//! Error types for PyInstaller archive operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when reading CArchive (PKG) and PYZ archives, along with a
//! convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. You can
//! handle errors using pattern matching or the `?` operator:
//!
//! ```rust,no_run
//! use pyiarchive::{CArchive, Result};
//!
//! fn dump_entry(path: &str, name: &str) -> Result<Vec<u8>> {
//!     let archive = CArchive::open(path)?;
//!     archive.extract(name)
//! }
//! ```
//!
//! ## Fatal Conditions
//!
//! Readers reopen their backing file for every read. If the file was moved
//! or deleted after the reader was constructed, extraction fails with
//! [`Error::ArchiveUnavailable`]. Callers must treat this as unrecoverable:
//!
//! ```rust,no_run
//! use pyiarchive::{CArchive, Error};
//!
//! fn load(archive: &CArchive, name: &str) -> Vec<u8> {
//!     match archive.extract(name) {
//!         Ok(data) => data,
//!         Err(e) if e.is_fatal() => {
//!             eprintln!("{}", e);
//!             std::process::exit(1);
//!         }
//!         Err(e) => panic!("unexpected error: {}", e),
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;

/// Boxed error returned by external collaborators such as a
/// [`CodeDecoder`](crate::read::CodeDecoder).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for archive operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io] | File system operations during construction |
/// | Format | [`InvalidFormat`][Self::InvalidFormat], [`CorruptHeader`][Self::CorruptHeader] | Invalid archive data |
/// | Lookup | [`EntryNotFound`][Self::EntryNotFound] | Absent entry name |
/// | Compatibility | [`UnsupportedArchiveType`][Self::UnsupportedArchiveType] | Entry kind without a reader |
/// | Fatal | [`ArchiveUnavailable`][Self::ArchiveUnavailable] | Backing file moved or deleted |
/// | Decoding | [`Decode`][Self::Decode], [`CryptoError`][Self::CryptoError] | Bad entry payload or key |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive format is invalid or not recognized.
    ///
    /// This error occurs when:
    /// - The cookie magic pattern cannot be found
    /// - The cookie is truncated or describes bounds outside the file
    /// - The PYZ magic pattern or bytecode magic does not match
    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    /// A directory (table of contents) is corrupt or truncated.
    ///
    /// The offset is relative to the start of the directory data.
    #[error("Corrupt directory at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// The byte offset where corruption was detected.
        offset: u64,
        /// A description of the corruption.
        reason: String,
    },

    /// No entry with the given name exists in the archive.
    ///
    /// Returned by the CArchive reader. The PYZ reader reports a missing
    /// entry as `Ok(None)` instead.
    #[error("No entry named '{name}' found in the archive")]
    EntryNotFound {
        /// The requested entry name.
        name: String,
    },

    /// The entry exists but cannot be opened as an embedded archive.
    #[error("Entry '{name}' {kind}")]
    UnsupportedArchiveType {
        /// The requested entry name.
        name: String,
        /// Why the entry cannot be opened.
        kind: UnsupportedKind,
    },

    /// The backing file could not be reopened after the reader was created.
    ///
    /// This happens when the executable was moved, renamed, or deleted
    /// while running (e.g. by a self-updater). Continuation is impossible.
    #[error(
        "{} appears to have been moved or deleted since this application was launched; continuation from this state is impossible",
        path.display()
    )]
    ArchiveUnavailable {
        /// Path of the backing file.
        path: PathBuf,
        /// The underlying open failure.
        #[source]
        source: io::Error,
    },

    /// Decompression or code deserialization of an entry failed.
    #[error("Failed to decode entry '{name}'")]
    Decode {
        /// The entry name.
        name: String,
        /// The underlying cause.
        #[source]
        source: BoxError,
    },

    /// A cryptographic operation failed or the key is unusable.
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// An argument passed to the library is invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Reason an entry cannot be opened as an embedded archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum UnsupportedKind {
    /// The entry is an embedded zip archive, which is recognized but not
    /// implemented.
    ZipArchive,
    /// The entry is not an archive at all.
    NotAnArchive,
}

impl std::fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZipArchive => write!(f, "is a zipfile archive; zipfile archives are not supported yet"),
            Self::NotAnArchive => write!(f, "is not a supported embedded archive"),
        }
    }
}

impl Error {
    /// Creates a [`Decode`](Self::Decode) error for the given entry.
    pub(crate) fn decode(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Decode {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Creates a [`CorruptHeader`](Self::CorruptHeader) error.
    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Self::CorruptHeader {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns true if the error describes malformed archive data.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidFormat(_) | Self::CorruptHeader { .. })
    }

    /// Returns true if the error reports a missing entry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound { .. })
    }

    /// Returns true if the error is unrecoverable for the running program.
    ///
    /// Only [`ArchiveUnavailable`](Self::ArchiveUnavailable) is fatal: the
    /// archive can no longer be read, so no later call can succeed either.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ArchiveUnavailable { .. })
    }
}

/// A specialized Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;
