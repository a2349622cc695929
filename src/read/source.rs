//! Backing-file access for archive readers.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::format::reader::read_bytes;
use crate::{Error, Result};

/// Location of an archive inside a file.
///
/// Readers never keep a handle open. Every read goes through
/// [`open_at`](Self::open_at), which opens the file, positions it and hands
/// the handle to the caller; the handle is closed when it is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
    path: PathBuf,
    start_offset: u64,
}

impl ArchiveSource {
    /// Creates a source for an archive starting at `start_offset`.
    pub fn new(path: impl Into<PathBuf>, start_offset: u64) -> Self {
        Self {
            path: path.into(),
            start_offset,
        }
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the absolute position of the archive in the file.
    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    /// Returns a source for an archive nested at `offset` within this one.
    pub fn nested(&self, offset: u64) -> Self {
        Self::new(self.path.clone(), self.start_offset + offset)
    }

    /// Reopens the file and seeks to `offset` within the archive.
    ///
    /// # Errors
    ///
    /// A failure to open the file is reported as
    /// [`Error::ArchiveUnavailable`]: the file existed when the reader was
    /// created, so it must have been moved or deleted since.
    pub fn open_at(&self, offset: u64) -> Result<BufReader<File>> {
        let file = File::open(&self.path).map_err(|source| {
            log::debug!("cannot reopen {}: {}", self.path.display(), source);
            Error::ArchiveUnavailable {
                path: self.path.clone(),
                source,
            }
        })?;
        let mut reader = BufReader::with_capacity(crate::READ_BUFFER_SIZE, file);
        reader.seek(SeekFrom::Start(self.start_offset + offset))?;
        Ok(reader)
    }

    /// Reads exactly `len` bytes at `offset` within the archive.
    pub fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut reader = self.open_at(offset)?;
        Ok(read_bytes(&mut reader, len)?)
    }
}

/// Opens a file during reader construction.
///
/// Unlike [`ArchiveSource::open_at`], failures here are plain I/O errors.
pub(crate) fn open_for_parsing(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)?;
    Ok(BufReader::with_capacity(crate::READ_BUFFER_SIZE, file))
}
