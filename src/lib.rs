//! # pyiarchive
//!
//! A pure-Rust reader for the archives embedded in PyInstaller executables.
//!
//! A PyInstaller build appends a *CArchive* (also called PKG) to its
//! bootloader. The CArchive holds binaries, data files, startup scripts and
//! one or more *PYZ* archives of individually compressed, optionally
//! encrypted, Python modules.
//!
//! ## Quick Start
//!
//! ### Listing an Executable
//!
//! ```rust,no_run
//! use pyiarchive::{CArchive, Result};
//!
//! fn main() -> Result<()> {
//!     let archive = CArchive::open("dist/app")?;
//!     let (major, minor) = archive.python_version();
//!     println!("Python {}.{} ({})", major, minor, archive.python_library_name());
//!
//!     for entry in archive.entries() {
//!         println!("{:>10} {:<10} {}", entry.uncompressed_length, entry.kind, entry.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Reading Modules from a PYZ Archive
//!
//! ```rust,no_run
//! use pyiarchive::{CArchive, Result};
//!
//! fn main() -> Result<()> {
//!     let archive = CArchive::open("dist/app")?;
//!     let pyz = archive.open_embedded_archive("PYZ-00.pyz")?;
//!
//!     if let Some(bytecode) = pyz.extract_raw("json.decoder")? {
//!         println!("json.decoder: {} bytes of marshalled code", bytecode.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Encrypted Archives
//!
//! ```rust,no_run
//! use pyiarchive::crypto::StaticKey;
//! use pyiarchive::{CArchive, CArchiveOptions, PyzOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let options = CArchiveOptions::new()
//!         .pyz(PyzOptions::new().key_provider(StaticKey::new("my-build-key")));
//!     let archive = CArchive::open_with_options("dist/app", options)?;
//!     let pyz = archive.open_embedded_archive("PYZ-00.pyz")?;
//!     let code = pyz.extract_raw("secret_module")?;
//!     println!("{:?}", code.map(|c| c.len()));
//!     Ok(())
//! }
//! ```
//!
//! Decryption needs the `aes` feature; without it, supplying a key makes
//! opening the PYZ archive fail with [`Error::CryptoError`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `aes` | Yes | AES-128-CTR decryption of encrypted PYZ entries |
//! | `cli` | No | Command-line interface tool |
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`], which is an alias for
//! `std::result::Result<T, Error>`. The [`Error`] enum covers all possible
//! failure modes:
//!
//! ```rust,no_run
//! use pyiarchive::{CArchive, Error};
//!
//! fn open_archive(path: &str) -> pyiarchive::Result<()> {
//!     match CArchive::open(path) {
//!         Ok(archive) => {
//!             println!("Opened archive with {} entries", archive.len());
//!             Ok(())
//!         }
//!         Err(Error::Io(e)) => {
//!             eprintln!("I/O error: {}", e);
//!             Err(Error::Io(e))
//!         }
//!         Err(Error::InvalidFormat(msg)) => {
//!             eprintln!("Not a PyInstaller archive: {}", msg);
//!             Err(Error::InvalidFormat(msg))
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! # fn main() {}
//! ```
//!
//! ## File Handles
//!
//! Readers do not keep their backing file open. Every extraction reopens
//! the file, so the executable may be renamed or deleted while a reader
//! exists; reads after that point fail with
//! [`Error::ArchiveUnavailable`].
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

/// Default buffer size for read operations (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod codec;
pub mod crypto;
pub mod error;
pub mod format;
pub mod read;
pub mod scan;

pub use error::{BoxError, Error, Result, UnsupportedKind};
pub use read::{
    CArchive, CArchiveOptions, CEntry, CEntryKind, CodeDecoder, PyzArchive, PyzEntry,
    PyzEntryKind, PyzObject, PyzOptions, archive_contents,
};
pub use scan::MagicScanner;

#[cfg(feature = "aes")]
pub use crypto::Cipher;
