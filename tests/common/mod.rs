//! Shared test utilities for integration tests.
//!
//! The library has no writer, so the builders here assemble CArchive and
//! PYZ images byte by byte, the way the PyInstaller build step lays them
//! out.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use tempfile::NamedTempFile;

/// CArchive cookie magic.
pub const COOKIE_MAGIC: &[u8; 8] = b"MEI\x0c\x0b\x0a\x0b\x0e";

/// Bytecode magic of CPython 3.11, used as the default PYZ magic.
pub const PYMAGIC_311: [u8; 4] = [0xa7, 0x0d, 0x0d, 0x0a];

/// zlib-compresses `data`.
pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Writes `data` to a temporary file.
pub fn write_temp(data: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}

/// Encrypts `plain` the way encrypted PYZ entries are stored: IV followed by
/// AES-128-CTR ciphertext.
#[cfg(feature = "aes")]
pub fn encrypt(key: &str, iv: [u8; 16], plain: &[u8]) -> Vec<u8> {
    // CTR is symmetric: decrypting IV || plaintext yields the ciphertext.
    let cipher = pyiarchive::Cipher::new(key).unwrap();
    let mut blob = iv.to_vec();
    blob.extend(cipher.decrypt(&[&iv[..], plain].concat()).unwrap());
    blob
}

/// Minimal marshal encoder for directory fixtures.
pub mod marshal {
    /// Encodes a 32-bit int.
    pub fn int(value: i32) -> Vec<u8> {
        let mut out = vec![b'i'];
        out.extend_from_slice(&value.to_le_bytes());
        out
    }

    /// Encodes a str using the short ASCII form when possible.
    pub fn str(value: &str) -> Vec<u8> {
        if value.is_ascii() && value.len() < 256 {
            let mut out = vec![b'z', value.len() as u8];
            out.extend_from_slice(value.as_bytes());
            out
        } else {
            let mut out = vec![b'u'];
            out.extend_from_slice(&(value.len() as u32).to_le_bytes());
            out.extend_from_slice(value.as_bytes());
            out
        }
    }

    /// Encodes a tuple of already-encoded items.
    pub fn tuple(items: &[Vec<u8>]) -> Vec<u8> {
        let mut out = if items.len() < 256 {
            vec![b')', items.len() as u8]
        } else {
            let mut out = vec![b'('];
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            out
        };
        for item in items {
            out.extend_from_slice(item);
        }
        out
    }

    /// Encodes a list of already-encoded items.
    pub fn list(items: &[Vec<u8>]) -> Vec<u8> {
        let mut out = vec![b'['];
        out.extend_from_slice(&(items.len() as u32).to_le_bytes());
        for item in items {
            out.extend_from_slice(item);
        }
        out
    }

    /// Encodes a dict of already-encoded pairs.
    pub fn dict(pairs: &[(Vec<u8>, Vec<u8>)]) -> Vec<u8> {
        let mut out = vec![b'{'];
        for (key, value) in pairs {
            out.extend_from_slice(key);
            out.extend_from_slice(value);
        }
        out.push(b'0');
        out
    }
}

/// PYZ entry kinds as stored in the directory.
pub const PYZ_MODULE: i32 = 0;
pub const PYZ_PKG: i32 = 1;
pub const PYZ_DATA: i32 = 2;
pub const PYZ_NSPKG: i32 = 3;

struct PyzItem {
    name: String,
    kind: i32,
    stored: Vec<u8>,
}

/// Builds PYZ archive images.
pub struct PyzBuilder {
    pymagic: [u8; 4],
    items: Vec<PyzItem>,
    key: Option<String>,
    dict_toc: bool,
}

impl Default for PyzBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PyzBuilder {
    pub fn new() -> Self {
        Self {
            pymagic: PYMAGIC_311,
            items: Vec::new(),
            key: None,
            dict_toc: false,
        }
    }

    pub fn pymagic(mut self, pymagic: [u8; 4]) -> Self {
        self.pymagic = pymagic;
        self
    }

    /// Encrypts entries added after this call with `key`.
    #[cfg(feature = "aes")]
    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    /// Writes the directory as a dict, as older builds did.
    pub fn dict_toc(mut self) -> Self {
        self.dict_toc = true;
        self
    }

    /// Adds an entry whose data is compressed (and encrypted, if a key is set).
    pub fn entry(mut self, name: &str, kind: i32, data: &[u8]) -> Self {
        let compressed = zlib(data);
        let stored = match &self.key {
            #[cfg(feature = "aes")]
            Some(key) => {
                let mut iv = [0u8; 16];
                for (i, b) in iv.iter_mut().enumerate() {
                    *b = (self.items.len() * 31 + i) as u8;
                }
                encrypt(key, iv, &compressed)
            }
            _ => compressed,
        };
        self.items.push(PyzItem {
            name: name.to_string(),
            kind,
            stored,
        });
        self
    }

    /// Adds an entry with exactly `stored` as its on-disk bytes.
    pub fn raw_entry(mut self, name: &str, kind: i32, stored: &[u8]) -> Self {
        self.items.push(PyzItem {
            name: name.to_string(),
            kind,
            stored: stored.to_vec(),
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = b"PYZ\0".to_vec();
        data.extend_from_slice(&self.pymagic);
        data.extend_from_slice(&[0u8; 4]);

        let mut records = Vec::new();
        for item in &self.items {
            let offset = data.len() as i32;
            data.extend_from_slice(&item.stored);
            let value = marshal::tuple(&[
                marshal::int(item.kind),
                marshal::int(offset),
                marshal::int(item.stored.len() as i32),
            ]);
            records.push((marshal::str(&item.name), value));
        }

        let toc_offset = data.len() as i32;
        data[8..12].copy_from_slice(&toc_offset.to_be_bytes());
        if self.dict_toc {
            data.extend(marshal::dict(&records));
        } else {
            let pairs: Vec<_> = records
                .into_iter()
                .map(|(name, value)| marshal::tuple(&[name, value]))
                .collect();
            data.extend(marshal::list(&pairs));
        }
        data
    }
}

/// CArchive type codes.
pub mod kind {
    pub const BINARY: u8 = b'b';
    pub const DEPENDENCY: u8 = b'd';
    pub const PYZ: u8 = b'z';
    pub const ZIPFILE: u8 = b'Z';
    pub const PYPACKAGE: u8 = b'M';
    pub const PYMODULE: u8 = b'm';
    pub const PYSOURCE: u8 = b's';
    pub const DATA: u8 = b'x';
    pub const RUNTIME_OPTION: u8 = b'o';
    pub const SPLASH: u8 = b'l';
    pub const SYMLINK: u8 = b'n';
}

/// A CArchive directory record and its data.
pub struct CItem {
    pub name: String,
    pub kind: u8,
    pub stored: Vec<u8>,
    pub compressed: bool,
    pub uncompressed_length: u32,
}

/// Builds CArchive images, optionally wrapped in a fake executable.
pub struct CArchiveBuilder {
    items: Vec<CItem>,
    python_version: i32,
    library_name: String,
    prefix: Vec<u8>,
    suffix: Vec<u8>,
}

impl Default for CArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CArchiveBuilder {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            python_version: 311,
            library_name: "libpython3.11.so.1.0".to_string(),
            prefix: Vec::new(),
            suffix: Vec::new(),
        }
    }

    /// Bytes placed before the archive, standing in for the bootloader.
    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        self.prefix = prefix.to_vec();
        self
    }

    /// Bytes placed after the cookie, such as a code signature.
    pub fn suffix(mut self, suffix: &[u8]) -> Self {
        self.suffix = suffix.to_vec();
        self
    }

    pub fn python_version(mut self, version: i32) -> Self {
        self.python_version = version;
        self
    }

    pub fn library_name(mut self, name: &str) -> Self {
        self.library_name = name.to_string();
        self
    }

    /// Adds an uncompressed entry.
    pub fn stored(mut self, name: &str, kind: u8, data: &[u8]) -> Self {
        self.items.push(CItem {
            name: name.to_string(),
            kind,
            stored: data.to_vec(),
            compressed: false,
            uncompressed_length: data.len() as u32,
        });
        self
    }

    /// Adds a zlib-compressed entry.
    pub fn compressed(mut self, name: &str, kind: u8, data: &[u8]) -> Self {
        self.items.push(CItem {
            name: name.to_string(),
            kind,
            stored: zlib(data),
            compressed: true,
            uncompressed_length: data.len() as u32,
        });
        self
    }

    /// Adds a record with arbitrary fields.
    pub fn item(mut self, item: CItem) -> Self {
        self.items.push(item);
        self
    }

    /// Adds a runtime option entry (no data).
    pub fn option(self, option: &str) -> Self {
        self.stored(option, kind::RUNTIME_OPTION, b"")
    }

    /// Builds the full file and returns it with the archive's start offset.
    pub fn build_with_offset(self) -> (Vec<u8>, u64) {
        let start = self.prefix.len();
        let mut out = self.prefix.clone();

        let mut toc = Vec::new();
        for item in &self.items {
            let data_offset = (out.len() - start) as u32;
            out.extend_from_slice(&item.stored);
            toc.extend(toc_record(
                &item.name,
                data_offset,
                item.stored.len() as u32,
                item.uncompressed_length,
                item.compressed,
                item.kind,
            ));
        }

        let toc_offset = (out.len() - start) as u32;
        out.extend_from_slice(&toc);

        let archive_length = (out.len() - start + 88) as u32;
        out.extend(cookie(
            archive_length,
            toc_offset,
            toc.len() as i32,
            self.python_version,
            &self.library_name,
        ));
        out.extend_from_slice(&self.suffix);
        (out, start as u64)
    }

    pub fn build(self) -> Vec<u8> {
        self.build_with_offset().0
    }
}

/// Encodes one directory record, padding the name to a multiple of 16.
pub fn toc_record(
    name: &str,
    data_offset: u32,
    compressed_length: u32,
    uncompressed_length: u32,
    compressed: bool,
    kind: u8,
) -> Vec<u8> {
    let name_len = (name.len() + 1).div_ceil(16) * 16;
    let entry_len = 18 + name_len;

    let mut out = Vec::with_capacity(entry_len);
    out.extend_from_slice(&(entry_len as i32).to_be_bytes());
    out.extend_from_slice(&data_offset.to_be_bytes());
    out.extend_from_slice(&compressed_length.to_be_bytes());
    out.extend_from_slice(&uncompressed_length.to_be_bytes());
    out.push(compressed as u8);
    out.push(kind);
    out.extend_from_slice(name.as_bytes());
    out.resize(entry_len, 0);
    out
}

/// Encodes a cookie.
pub fn cookie(
    archive_length: u32,
    toc_offset: u32,
    toc_length: i32,
    python_version: i32,
    library_name: &str,
) -> Vec<u8> {
    let mut out = COOKIE_MAGIC.to_vec();
    out.extend_from_slice(&archive_length.to_be_bytes());
    out.extend_from_slice(&toc_offset.to_be_bytes());
    out.extend_from_slice(&toc_length.to_be_bytes());
    out.extend_from_slice(&python_version.to_be_bytes());
    let mut name = [0u8; 64];
    name[..library_name.len()].copy_from_slice(library_name.as_bytes());
    out.extend_from_slice(&name);
    out
}

/// A typical onefile build: bootloader stub, modules, data, a PYZ archive
/// and a runtime option.
pub fn sample_executable() -> Vec<u8> {
    let pyz = PyzBuilder::new()
        .entry("app", PYZ_MODULE, b"app bytecode")
        .entry("pkg", PYZ_PKG, b"pkg bytecode")
        .entry("pkg.sub", PYZ_MODULE, b"pkg.sub bytecode")
        .entry("nsp", PYZ_NSPKG, b"")
        .entry("pkg/data.txt", PYZ_DATA, b"resource data")
        .build();

    CArchiveBuilder::new()
        .prefix(&vec![0x7fu8; 4096])
        .option("pyi-python-flag Verbose")
        .compressed("pyiboot01_bootstrap", kind::PYMODULE, b"bootstrap code")
        .stored("main", kind::PYSOURCE, b"main script code")
        .compressed("libz.so.1", kind::BINARY, &vec![0x42u8; 20_000])
        .stored("data/config.json", kind::DATA, b"{\"debug\": false}")
        .stored("PYZ-00.pyz", kind::PYZ, &pyz)
        .build()
}
