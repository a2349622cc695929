//! Reader options.

use std::sync::Arc;

use crate::crypto::{KeyProvider, NoKey};
use crate::format::PYMAGIC_SIZE;
use crate::scan::DEFAULT_CHUNK_SIZE;

/// Default upper bound for a CArchive directory (64 MiB).
pub const DEFAULT_MAX_TOC_LENGTH: u32 = 64 * 1024 * 1024;

/// Options for opening a PYZ archive.
#[derive(Clone)]
pub struct PyzOptions {
    /// Provider asked for the decryption key at construction.
    pub key_provider: Arc<dyn KeyProvider>,
    /// Bytecode magic the archive must carry, if checked.
    pub expected_pymagic: Option<[u8; PYMAGIC_SIZE]>,
}

impl std::fmt::Debug for PyzOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PyzOptions")
            .field("expected_pymagic", &self.expected_pymagic)
            .finish_non_exhaustive()
    }
}

impl Default for PyzOptions {
    fn default() -> Self {
        Self {
            key_provider: Arc::new(NoKey),
            expected_pymagic: None,
        }
    }
}

impl PyzOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key provider.
    pub fn key_provider(mut self, provider: impl KeyProvider + 'static) -> Self {
        self.key_provider = Arc::new(provider);
        self
    }

    /// Requires the archive to carry the given bytecode magic.
    pub fn expected_pymagic(mut self, pymagic: [u8; PYMAGIC_SIZE]) -> Self {
        self.expected_pymagic = Some(pymagic);
        self
    }
}

/// Options for opening a CArchive.
#[derive(Debug, Clone)]
pub struct CArchiveOptions {
    /// Options passed on to embedded PYZ archives.
    pub pyz: PyzOptions,
    /// Largest directory the reader will load.
    pub max_toc_length: u32,
    /// Chunk size used when scanning for the cookie.
    pub scan_chunk_size: usize,
}

impl Default for CArchiveOptions {
    fn default() -> Self {
        Self {
            pyz: PyzOptions::default(),
            max_toc_length: DEFAULT_MAX_TOC_LENGTH,
            scan_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl CArchiveOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the options used for embedded PYZ archives.
    pub fn pyz(mut self, options: PyzOptions) -> Self {
        self.pyz = options;
        self
    }

    /// Sets the directory size limit.
    pub fn max_toc_length(mut self, limit: u32) -> Self {
        self.max_toc_length = limit;
        self
    }

    /// Sets the cookie scan chunk size.
    pub fn scan_chunk_size(mut self, size: usize) -> Self {
        self.scan_chunk_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::StaticKey;

    #[test]
    fn test_defaults() {
        let options = CArchiveOptions::default();
        assert_eq!(options.max_toc_length, DEFAULT_MAX_TOC_LENGTH);
        assert_eq!(options.scan_chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(options.pyz.expected_pymagic.is_none());
        assert!(options.pyz.key_provider.key().is_none());
    }

    #[test]
    fn test_builder() {
        let options = CArchiveOptions::new()
            .max_toc_length(1024)
            .scan_chunk_size(64)
            .pyz(
                PyzOptions::new()
                    .key_provider(StaticKey::new("k"))
                    .expected_pymagic([1, 2, 3, 4]),
            );
        assert_eq!(options.max_toc_length, 1024);
        assert_eq!(options.scan_chunk_size, 64);
        assert_eq!(options.pyz.expected_pymagic, Some([1, 2, 3, 4]));
        assert_eq!(options.pyz.key_provider.key().as_deref(), Some("k"));
    }

    #[test]
    fn test_debug_hides_provider() {
        let options = PyzOptions::new().key_provider(StaticKey::new("hidden"));
        assert!(!format!("{:?}", options).contains("hidden"));
    }
}
