//! Archive reading API.
//!
//! [`CArchive`] reads the package appended to a PyInstaller executable.
//! Embedded PYZ archives are opened from it with
//! [`CArchive::open_embedded_archive`], or directly with [`PyzArchive`].
//!
//! # Example
//!
//! ```rust,no_run
//! use pyiarchive::read::{CArchive, CEntryKind, RawCode};
//!
//! let archive = CArchive::open("dist/app")?;
//! for entry in archive.entries() {
//!     if entry.kind == CEntryKind::EmbeddedArchive {
//!         let pyz = archive.open_embedded_archive(&entry.name)?;
//!         for name in pyz.names() {
//!             let data = pyz.extract(name, false, &RawCode)?;
//!             println!("{}: {:?}", name, data.map(|_| "ok"));
//!         }
//!     }
//! }
//! # Ok::<(), pyiarchive::Error>(())
//! ```

mod carchive;
mod contents;
mod decoder;
mod directory;
mod entry;
mod filesystem;
mod options;
mod pyz;
pub mod source;

pub use carchive::CArchive;
pub use contents::{archive_contents, archive_contents_with_options};
pub use decoder::{CodeDecoder, PyzObject, RawCode};
pub use entry::{CEntry, CEntryKind, PyzEntry, PyzEntryKind};
pub use options::{CArchiveOptions, DEFAULT_MAX_TOC_LENGTH, PyzOptions};
pub use pyz::{PyzArchive, split_offset_suffix};
