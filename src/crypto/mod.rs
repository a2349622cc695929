//! Decryption support for encrypted PYZ entries.
//!
//! Encrypted archives use AES-128 in counter mode with a fixed key chosen at
//! build time. Each encrypted entry starts with its own 16-byte initial
//! counter block, followed by the ciphertext:
//!
//! ```text
//! +----------------+--------------------------------+
//! | IV (16 bytes)  | ciphertext (any length)        |
//! +----------------+--------------------------------+
//! ```
//!
//! The key is not stored in the archive. It is supplied by a
//! [`KeyProvider`], and the [`Cipher`] is only available with the `aes`
//! feature.

#[cfg(feature = "aes")]
mod cipher;
mod key;

#[cfg(feature = "aes")]
pub use cipher::Cipher;
pub use key::{EnvKey, KeyProvider, NoKey, StaticKey};

/// AES block size in bytes, which is also the key and IV size.
pub const BLOCK_SIZE: usize = 16;

/// Normalizes a key string to exactly [`BLOCK_SIZE`] characters.
///
/// Longer keys are truncated. Shorter keys are padded on the left with
/// ASCII `'0'`, keeping a leading `+` or `-` in front of the padding.
pub fn normalize_key(key: &str) -> String {
    let len = key.chars().count();
    if len > BLOCK_SIZE {
        return key.chars().take(BLOCK_SIZE).collect();
    }

    let padding = "0".repeat(BLOCK_SIZE - len);
    match key.chars().next() {
        Some(sign @ ('+' | '-')) => {
            let rest = &key[sign.len_utf8()..];
            format!("{}{}{}", sign, padding, rest)
        }
        _ => format!("{}{}", padding, key),
    }
}
