//! CArchive (PKG) reader.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::directory::Directory;
use super::entry::{CEntry, CEntryKind};
use super::filesystem::{apply_entry_mode, create_symlink, crosses_symlink};
use super::options::CArchiveOptions;
use super::pyz::PyzArchive;
use super::source::{ArchiveSource, open_for_parsing};
use crate::codec::{ZlibDecoder, decompress_zlib};
use crate::error::UnsupportedKind;
use crate::format::cookie::Cookie;
use crate::format::reader::read_bytes;
use crate::format::toc::parse_toc;
use crate::format::{COOKIE_MAGIC, COOKIE_SIZE};
use crate::scan::MagicScanner;
use crate::{Error, Result};

/// Reader for the CArchive appended to a PyInstaller executable.
///
/// The archive is located by its trailing cookie, so `open` accepts the
/// executable itself as well as a standalone package file. The directory is
/// read once; every extraction reopens the file, so no handle is held
/// between calls.
///
/// # Example
///
/// ```rust,no_run
/// use pyiarchive::CArchive;
///
/// let archive = CArchive::open("dist/app")?;
/// for entry in archive.entries() {
///     println!("{:>10} {} {}", entry.uncompressed_length, entry.kind, entry.name);
/// }
/// let script = archive.extract("app")?;
/// # Ok::<(), pyiarchive::Error>(())
/// ```
#[derive(Debug)]
pub struct CArchive {
    source: ArchiveSource,
    cookie: Cookie,
    cookie_offset: u64,
    directory: Directory<CEntry>,
    options: CArchiveOptions,
}

impl CArchive {
    /// Opens the archive in the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, CArchiveOptions::default())
    }

    /// Opens the archive with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if no cookie is found or the cookie
    /// describes an archive that does not fit in the file, and
    /// [`Error::CorruptHeader`] if the directory is malformed.
    pub fn open_with_options(path: impl AsRef<Path>, options: CArchiveOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = open_for_parsing(&path)?;

        let scanner = MagicScanner::with_chunk_size(COOKIE_MAGIC, options.scan_chunk_size)?;
        let cookie_offset = scanner.find_last(&mut reader)?.ok_or_else(|| {
            Error::InvalidFormat(format!(
                "magic not found: {} does not contain a CArchive cookie",
                path.display()
            ))
        })?;
        log::debug!("found cookie in {} at offset {}", path.display(), cookie_offset);

        reader.seek(SeekFrom::Start(cookie_offset))?;
        let mut cookie_data = Vec::with_capacity(COOKIE_SIZE);
        (&mut reader)
            .take(COOKIE_SIZE as u64)
            .read_to_end(&mut cookie_data)?;
        let cookie = Cookie::parse(&cookie_data)?;

        let archive_end = cookie_offset + COOKIE_SIZE as u64;
        let archive_length = u64::from(cookie.archive_length);
        if archive_length > archive_end {
            return Err(Error::InvalidFormat(format!(
                "archive length {} exceeds the {} bytes preceding the end of the cookie",
                archive_length, archive_end
            )));
        }
        let start_offset = archive_end - archive_length;

        let toc_start = start_offset + u64::from(cookie.toc_offset);
        let toc_end = toc_start + u64::from(cookie.toc_length);
        if toc_end > cookie_offset {
            return Err(Error::InvalidFormat(format!(
                "directory [{}, {}) extends past the cookie at {}",
                toc_start, toc_end, cookie_offset
            )));
        }
        if cookie.toc_length > options.max_toc_length {
            return Err(Error::InvalidFormat(format!(
                "directory of {} bytes exceeds the limit of {} bytes",
                cookie.toc_length, options.max_toc_length
            )));
        }

        reader.seek(SeekFrom::Start(toc_start))?;
        let toc = read_bytes(&mut reader, cookie.toc_length as usize)?;
        let records = parse_toc(&toc)?;

        let mut directory = Directory::with_capacity(records.len());
        for record in records {
            let entry = CEntry::from_record(record);
            if let CEntryKind::Unknown(code) = entry.kind {
                log::warn!(
                    "entry '{}' has unknown type code {:#04x}",
                    entry.name,
                    code
                );
            }
            let name = entry.name.clone();
            if directory.insert(entry) {
                log::warn!("duplicate entry '{}', keeping the later one", name);
            }
        }

        log::debug!(
            "parsed directory of {}: archive at offset {}, {} entries",
            path.display(),
            start_offset,
            directory.entries().len()
        );

        Ok(Self {
            source: ArchiveSource::new(path, start_offset),
            cookie,
            cookie_offset,
            directory,
            options,
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        self.source.path()
    }

    /// Returns the absolute position of the archive in the file.
    pub fn start_offset(&self) -> u64 {
        self.source.start_offset()
    }

    /// Returns the absolute position of the cookie in the file.
    pub fn cookie_offset(&self) -> u64 {
        self.cookie_offset
    }

    /// Returns the archive length recorded in the cookie.
    pub fn archive_length(&self) -> u32 {
        self.cookie.archive_length
    }

    /// Returns the directory position relative to the archive start.
    pub fn toc_offset(&self) -> u32 {
        self.cookie.toc_offset
    }

    /// Returns the directory length in bytes.
    pub fn toc_length(&self) -> u32 {
        self.cookie.toc_length
    }

    /// Returns the Python version the archive was built for.
    pub fn python_version(&self) -> (u32, u32) {
        self.cookie.python_version_tuple()
    }

    /// Returns the name of the Python shared library to load.
    pub fn python_library_name(&self) -> &str {
        &self.cookie.python_library_name
    }

    /// Returns the entries in directory order.
    pub fn entries(&self) -> &[CEntry] {
        self.directory.entries()
    }

    /// Returns the entry names in directory order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries().iter().map(|e| e.name.as_str())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns true if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Looks up an entry by name.
    pub fn lookup(&self, name: &str) -> Option<&CEntry> {
        self.directory.get(name)
    }

    /// Returns true if any entry must be unpacked to disk before running.
    ///
    /// This is what distinguishes a onefile build from a onedir build.
    pub fn contains_extractable_entries(&self) -> bool {
        self.entries().iter().any(|e| e.kind.is_extractable())
    }

    /// Returns the runtime options (e.g. `pyi-python-flag Verbose`).
    pub fn runtime_options(&self) -> Vec<&str> {
        self.entries()
            .iter()
            .filter(|e| e.kind == CEntryKind::RuntimeOption)
            .map(|e| e.name.as_str())
            .collect()
    }

    fn require(&self, name: &str) -> Result<&CEntry> {
        self.lookup(name).ok_or_else(|| Error::EntryNotFound {
            name: name.to_owned(),
        })
    }

    /// Extracts the data of an entry, decompressing it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] if there is no such entry,
    /// [`Error::ArchiveUnavailable`] if the file is gone, and
    /// [`Error::Decode`] if compressed data does not inflate to the declared
    /// length.
    pub fn extract(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self.require(name)?;
        let stored = self.source.read_range(
            u64::from(entry.data_offset),
            entry.compressed_length as usize,
        )?;

        if !entry.compressed {
            return Ok(stored);
        }
        decompress_zlib(&stored, Some(entry.uncompressed_length as usize))
            .map_err(|e| Error::decode(name, e))
    }

    /// Extracts an entry to a file at `dest`.
    ///
    /// Data is streamed to disk. On Unix the file is made accessible to the
    /// owner only, and executable for binaries. Symlink entries create a
    /// link to the target stored in the entry.
    ///
    /// If extraction fails, the partially written file is removed.
    pub fn extract_to_path(&self, name: &str, dest: impl AsRef<Path>) -> Result<()> {
        let dest = dest.as_ref();
        let entry = self.require(name)?;

        if entry.kind == CEntryKind::Symlink {
            let target = self.extract(name)?;
            let target = String::from_utf8(target).map_err(|e| Error::decode(name, e))?;
            log::debug!("linking {} -> {}", dest.display(), target);
            return create_symlink(dest, &target);
        }

        let mut file = File::create(dest)?;
        let written = match self.write_entry(entry, &mut file) {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                if let Err(remove) = std::fs::remove_file(dest) {
                    log::warn!("failed to remove partial file {}: {}", dest.display(), remove);
                }
                return Err(e);
            }
        };
        log::debug!("extracted {} ({} bytes) to {}", name, written, dest.display());
        Ok(())
    }

    /// Streams an entry's data into `file` and sets its mode.
    fn write_entry(&self, entry: &CEntry, file: &mut File) -> Result<u64> {
        let name = entry.name.as_str();
        let stored = self
            .source
            .open_at(u64::from(entry.data_offset))?
            .take(u64::from(entry.compressed_length));

        let written = if entry.compressed {
            let expected = u64::from(entry.uncompressed_length);
            let mut decoder = ZlibDecoder::new(stored).take(expected + 1);
            let written = copy_decoded(&mut decoder, file, name)?;
            if written != expected {
                return Err(Error::decode(
                    name,
                    format!(
                        "decompressed size mismatch: declared {} bytes, got {}",
                        expected, written
                    ),
                ));
            }
            written
        } else {
            let mut stored = stored;
            let written = io::copy(&mut stored, file)?;
            if written != u64::from(entry.compressed_length) {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("entry '{}' is truncated", name),
                )));
            }
            written
        };

        file.flush()?;
        apply_entry_mode(file, entry.kind)?;
        Ok(written)
    }

    /// Opens an embedded PYZ archive without copying its data.
    ///
    /// The archive is read in place, from the same backing file, using the
    /// PYZ options this reader was opened with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] if there is no such entry and
    /// [`Error::UnsupportedArchiveType`] if the entry is not a PYZ archive.
    pub fn open_embedded_archive(&self, name: &str) -> Result<PyzArchive> {
        let entry = self.require(name)?;
        match entry.kind {
            CEntryKind::EmbeddedArchive => {}
            CEntryKind::EmbeddedZipArchive => {
                return Err(Error::UnsupportedArchiveType {
                    name: name.to_owned(),
                    kind: UnsupportedKind::ZipArchive,
                });
            }
            _ => {
                return Err(Error::UnsupportedArchiveType {
                    name: name.to_owned(),
                    kind: UnsupportedKind::NotAnArchive,
                });
            }
        }

        let offset = u64::from(entry.data_offset);
        let reader = self.source.open_at(offset)?;
        PyzArchive::from_reader(self.source.nested(offset), reader, &self.options.pyz)
    }

    /// Extracts every file-like entry below `dir`.
    ///
    /// Entry names use `/` or `\` as separators; names that would escape
    /// `dir`, including through a symbolic link extracted earlier, are
    /// skipped with a warning. Runtime options and dependency
    /// references have no data and are skipped. Returns the written paths.
    pub fn extract_all(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut written = Vec::new();
        for entry in self.entries() {
            if matches!(entry.kind, CEntryKind::RuntimeOption | CEntryKind::Dependency) {
                continue;
            }
            let Some(relative) = safe_relative_path(&entry.name) else {
                log::warn!("skipping entry with unsafe name '{}'", entry.name);
                continue;
            };
            if crosses_symlink(dir, &relative) {
                log::warn!(
                    "skipping entry '{}' that would be written through a symbolic link",
                    entry.name
                );
                continue;
            }
            let dest = dir.join(relative);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.extract_to_path(&entry.name, &dest)?;
            written.push(dest);
        }
        Ok(written)
    }
}

fn copy_decoded<R: Read, W: Write>(reader: &mut R, writer: &mut W, name: &str) -> Result<u64> {
    let mut buffer = vec![0u8; crate::READ_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::decode(name, e)),
        };
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }
}

/// Converts an entry name to a relative path that stays inside its root.
fn safe_relative_path(name: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for component in name.split(['/', '\\']) {
        match component {
            "" | "." => continue,
            ".." => return None,
            c if c.contains(':') => return None,
            c => path.push(c),
        }
    }
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(
            safe_relative_path("lib/python3.11/os.pyc"),
            Some(PathBuf::from("lib").join("python3.11").join("os.pyc"))
        );
        assert_eq!(
            safe_relative_path(r"PIL\_imaging.pyd"),
            Some(PathBuf::from("PIL").join("_imaging.pyd"))
        );
        assert_eq!(safe_relative_path("./a"), Some(PathBuf::from("a")));
        assert_eq!(safe_relative_path("../etc/passwd"), None);
        assert_eq!(safe_relative_path("a/../../b"), None);
        assert_eq!(safe_relative_path("C:/Windows"), None);
        assert_eq!(safe_relative_path("/"), None);
    }

    #[test]
    fn test_absolute_name_becomes_relative() {
        assert_eq!(safe_relative_path("/tmp/x"), Some(PathBuf::from("tmp").join("x")));
    }
}
