//! AES-128-CTR entry decryption.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use zeroize::Zeroizing;

use super::{BLOCK_SIZE, normalize_key};
use crate::{Error, Result};

/// AES-128 with a 128-bit big-endian counter.
type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Fixed-key decryptor for PYZ entries.
///
/// The key is set once and reused for every entry; each entry carries its
/// own IV, so a fresh keystream is created per call.
#[derive(Clone)]
pub struct Cipher {
    key: Zeroizing<[u8; BLOCK_SIZE]>,
}

impl Cipher {
    /// Creates a cipher from a key string.
    ///
    /// The key is normalized to 16 characters first (see
    /// [`normalize_key`](super::normalize_key)).
    ///
    /// # Errors
    ///
    /// Returns [`Error::CryptoError`] if the normalized key is not exactly
    /// 16 bytes long, which happens when it contains non-ASCII characters.
    pub fn new(key: &str) -> Result<Self> {
        let normalized = Zeroizing::new(normalize_key(key));
        let bytes = normalized.as_bytes();
        if bytes.len() != BLOCK_SIZE {
            return Err(Error::CryptoError(format!(
                "key must encode to {} bytes, got {}",
                BLOCK_SIZE,
                bytes.len()
            )));
        }

        let mut key = Zeroizing::new([0u8; BLOCK_SIZE]);
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Creates a cipher from raw key bytes.
    pub fn from_key_bytes(key: [u8; BLOCK_SIZE]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Decrypts an entry blob.
    ///
    /// The first 16 bytes of `blob` are the initial counter block; the
    /// returned plaintext has the length of the remainder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CryptoError`] if `blob` is shorter than one block.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>> {
        if blob.len() < BLOCK_SIZE {
            return Err(Error::CryptoError(format!(
                "encrypted data too short: {} bytes, need at least {} for the IV",
                blob.len(),
                BLOCK_SIZE
            )));
        }

        let (iv, ciphertext) = blob.split_at(BLOCK_SIZE);
        let mut cipher = Aes128Ctr::new_from_slices(&self.key[..], iv)
            .map_err(|e| Error::CryptoError(format!("failed to initialize AES-CTR: {}", e)))?;

        let mut buffer = ciphertext.to_vec();
        cipher.apply_keystream(&mut buffer);
        Ok(buffer)
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose the key in debug output
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}
