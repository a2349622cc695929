//! PYZ archive reader.

use std::io::{BufRead, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::decoder::{CodeDecoder, PyzObject};
use super::directory::Directory;
use super::entry::PyzEntry;
use super::options::PyzOptions;
use super::source::{ArchiveSource, open_for_parsing};
use crate::codec::decompress_zlib;
#[cfg(feature = "aes")]
use crate::crypto::Cipher;
use crate::format::PYMAGIC_SIZE;
use crate::format::pyz::{PyzHeader, read_pyz_toc};
use crate::{Error, Result};

/// Reader for a PYZ archive of compressed (and possibly encrypted) modules.
///
/// The archive may stand alone or be embedded in a CArchive; see
/// [`CArchive::open_embedded_archive`](super::CArchive::open_embedded_archive).
/// The directory is loaded once. Every extraction reopens the backing file.
#[derive(Debug)]
pub struct PyzArchive {
    source: ArchiveSource,
    pymagic: [u8; PYMAGIC_SIZE],
    directory: Directory<PyzEntry>,
    #[cfg(feature = "aes")]
    cipher: Option<Cipher>,
}

impl PyzArchive {
    /// Opens a PYZ archive.
    ///
    /// The start offset is taken from a `?offset` suffix of the path if
    /// present, and is zero otherwise.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, None, PyzOptions::default())
    }

    /// Opens a PYZ archive that starts at `start_offset` within the file.
    pub fn open_at(path: impl AsRef<Path>, start_offset: u64) -> Result<Self> {
        Self::open_with_options(path, Some(start_offset), PyzOptions::default())
    }

    /// Opens a PYZ archive with custom options.
    ///
    /// If `start_offset` is `None`, it is parsed from the path (see
    /// [`split_offset_suffix`]).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] for a bad header, and
    /// [`Error::CorruptHeader`] if the directory cannot be decoded.
    pub fn open_with_options(
        path: impl AsRef<Path>,
        start_offset: Option<u64>,
        options: PyzOptions,
    ) -> Result<Self> {
        let (path, start_offset) = match start_offset {
            Some(offset) => (path.as_ref().to_path_buf(), offset),
            None => split_offset_suffix(path.as_ref()),
        };

        let mut reader = open_for_parsing(&path)?;
        reader.seek(SeekFrom::Start(start_offset))?;
        Self::from_reader(ArchiveSource::new(path, start_offset), reader, &options)
    }

    /// Parses the archive from a reader positioned at its first byte.
    pub(crate) fn from_reader<R: BufRead + Seek>(
        source: ArchiveSource,
        mut reader: R,
        options: &PyzOptions,
    ) -> Result<Self> {
        let header = PyzHeader::read(&mut reader, options.expected_pymagic.as_ref())?;

        reader.seek(SeekFrom::Start(
            source.start_offset() + header.toc_offset as u64,
        ))?;
        let records = read_pyz_toc(&mut reader)?;

        let mut directory = Directory::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            if record.data_offset < 0 || record.data_length < 0 {
                return Err(Error::corrupt(
                    0,
                    format!(
                        "PYZ directory record {} ('{}') has a negative offset or length",
                        index, record.name
                    ),
                ));
            }
            let type_code = record.type_code;
            let name = record.name.clone();
            match PyzEntry::from_record(record) {
                Some(entry) => {
                    if directory.insert(entry) {
                        log::warn!("duplicate PYZ entry '{}', keeping the later one", name);
                    }
                }
                None => log::warn!("skipping PYZ entry '{}' with unknown type {}", name, type_code),
            }
        }

        log::debug!(
            "parsed PYZ directory of {} at offset {}: {} entries",
            source.path().display(),
            source.start_offset(),
            directory.entries().len()
        );

        let key = options.key_provider.key();
        #[cfg(feature = "aes")]
        let cipher = match key {
            Some(key) => {
                log::debug!("decryption enabled for {}", source.path().display());
                Some(Cipher::new(&key)?)
            }
            None => None,
        };
        #[cfg(not(feature = "aes"))]
        if key.is_some() {
            return Err(Error::CryptoError(
                "a decryption key was provided but AES support is not enabled (enable the 'aes' feature)"
                    .into(),
            ));
        }

        Ok(Self {
            source,
            pymagic: header.pymagic,
            directory,
            #[cfg(feature = "aes")]
            cipher,
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

    /// Returns the bytecode magic stored in the header.
    pub fn pymagic(&self) -> [u8; PYMAGIC_SIZE] {
        self.pymagic
    }

    /// Returns true if entries are decrypted before decompression.
    pub fn is_encrypted(&self) -> bool {
        #[cfg(feature = "aes")]
        {
            self.cipher.is_some()
        }
        #[cfg(not(feature = "aes"))]
        {
            false
        }
    }

    /// Returns the entries in directory order.
    pub fn entries(&self) -> &[PyzEntry] {
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
    pub fn lookup(&self, name: &str) -> Option<&PyzEntry> {
        self.directory.get(name)
    }

    /// Returns true if `name` is a regular or namespace package.
    pub fn is_package(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|e| e.kind.is_package())
    }

    /// Returns true if `name` is a namespace package.
    pub fn is_namespace_package(&self, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|e| e.kind == super::PyzEntryKind::NamespacePackage)
    }

    /// Reads, decrypts and decompresses an entry.
    ///
    /// Returns `Ok(None)` if the archive has no such entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveUnavailable`] if the backing file is gone,
    /// and [`Error::Decode`] if the data does not decompress.
    pub fn extract_raw(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.lookup(name) else {
            return Ok(None);
        };

        let stored = self
            .source
            .read_range(entry.data_offset as u64, entry.data_length as usize)?;
        let stored = self.decrypt(stored)?;
        let data = decompress_zlib(&stored, None).map_err(|e| Error::decode(name, e))?;
        Ok(Some(data))
    }

    /// Extracts an entry, decoding module data with `decoder`.
    ///
    /// Entries of code kinds are passed to the decoder unless `raw` is set;
    /// everything else is returned as [`PyzObject::Bytes`]. Returns
    /// `Ok(None)` if the archive has no such entry.
    ///
    /// # Errors
    ///
    /// As [`extract_raw`](Self::extract_raw), plus [`Error::Decode`] if the
    /// decoder fails.
    pub fn extract<D: CodeDecoder>(
        &self,
        name: &str,
        raw: bool,
        decoder: &D,
    ) -> Result<Option<PyzObject<D::Code>>> {
        let Some(kind) = self.lookup(name).map(|e| e.kind) else {
            return Ok(None);
        };
        let Some(data) = self.extract_raw(name)? else {
            return Ok(None);
        };

        if raw || !kind.is_code() {
            return Ok(Some(PyzObject::Bytes(data)));
        }
        let code = decoder
            .decode(name, data)
            .map_err(|e| Error::decode(name, e))?;
        Ok(Some(PyzObject::Code(code)))
    }

    #[cfg(feature = "aes")]
    fn decrypt(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        match &self.cipher {
            Some(cipher) => cipher.decrypt(&data),
            None => Ok(data),
        }
    }

    #[cfg(not(feature = "aes"))]
    fn decrypt(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        Ok(data)
    }
}

/// Splits a `path?offset` name into the path and the offset.
///
/// Only the last `?` is considered, and only if it is followed by a decimal
/// integer. Any other `?` is part of the path (as in `\\?\C:\...`) and the
/// offset is zero.
pub fn split_offset_suffix(path: &Path) -> (PathBuf, u64) {
    let Some(text) = path.to_str() else {
        return (path.to_path_buf(), 0);
    };
    if let Some(index) = text.rfind('?') {
        if let Ok(offset) = text[index + 1..].trim().parse::<u64>() {
            return (PathBuf::from(&text[..index]), offset);
        }
    }
    (path.to_path_buf(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_offset_suffix() {
        assert_eq!(
            split_offset_suffix(Path::new("/opt/app/app?1234")),
            (PathBuf::from("/opt/app/app"), 1234)
        );
        assert_eq!(
            split_offset_suffix(Path::new("/opt/app/app")),
            (PathBuf::from("/opt/app/app"), 0)
        );
    }

    #[test]
    fn test_split_ignores_unc_prefix() {
        let path = Path::new(r"\\?\C:\app\app.exe");
        assert_eq!(split_offset_suffix(path), (path.to_path_buf(), 0));
    }

    #[test]
    fn test_split_uses_last_question_mark() {
        assert_eq!(
            split_offset_suffix(Path::new(r"\\?\C:\app\app.exe?88")),
            (PathBuf::from(r"\\?\C:\app\app.exe"), 88)
        );
    }

    #[test]
    fn test_split_rejects_non_numeric_suffix() {
        for name in ["a?b", "a?", "a?-5", "a?1.5"] {
            assert_eq!(split_offset_suffix(Path::new(name)), (PathBuf::from(name), 0));
        }
    }
}
