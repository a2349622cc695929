//! Flat listing of an archive and its embedded PYZ archives.

use std::path::Path;

use super::{CArchive, CArchiveOptions, CEntryKind};
use crate::Result;

/// Lists the entry names of the CArchive in `path`.
///
/// With `recursive`, the names inside each embedded PYZ archive follow the
/// name of that archive.
pub fn archive_contents(path: impl AsRef<Path>, recursive: bool) -> Result<Vec<String>> {
    archive_contents_with_options(path, recursive, CArchiveOptions::default())
}

/// Like [`archive_contents`], with custom reader options.
pub fn archive_contents_with_options(
    path: impl AsRef<Path>,
    recursive: bool,
    options: CArchiveOptions,
) -> Result<Vec<String>> {
    let archive = CArchive::open_with_options(path, options)?;
    let mut contents = Vec::with_capacity(archive.len());
    for entry in archive.entries() {
        contents.push(entry.name.clone());
        if recursive && entry.kind == CEntryKind::EmbeddedArchive {
            let pyz = archive.open_embedded_archive(&entry.name)?;
            contents.extend(pyz.names().map(str::to_owned));
        }
    }
    Ok(contents)
}
