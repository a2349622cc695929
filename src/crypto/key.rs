//! Key provisioning for encrypted archives.

use std::ffi::OsString;

use zeroize::Zeroizing;

/// Source of the decryption key for PYZ archives.
///
/// A provider is asked once, when a [`PyzArchive`](crate::read::PyzArchive)
/// is constructed. Returning `None` disables decryption.
pub trait KeyProvider: Send + Sync {
    /// Returns the key, or `None` if the archive is not encrypted.
    fn key(&self) -> Option<String>;
}

/// Provider for unencrypted archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKey;

impl KeyProvider for NoKey {
    fn key(&self) -> Option<String> {
        None
    }
}

/// Provider holding a fixed key.
#[derive(Clone)]
pub struct StaticKey {
    key: Zeroizing<String>,
}

impl StaticKey {
    /// Creates a provider that always returns `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Zeroizing::new(key.into()),
        }
    }
}

impl std::fmt::Debug for StaticKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose the key in debug output
        f.debug_struct("StaticKey")
            .field("len", &self.key.len())
            .finish()
    }
}

impl KeyProvider for StaticKey {
    fn key(&self) -> Option<String> {
        Some(self.key.as_str().to_owned())
    }
}

/// Provider reading the key from an environment variable.
///
/// An unset or empty variable yields no key.
#[derive(Debug, Clone)]
pub struct EnvKey {
    var: OsString,
}

impl EnvKey {
    /// Default variable consulted by the command-line tool.
    pub const DEFAULT_VAR: &'static str = "PYIARCHIVE_KEY";

    /// Creates a provider reading `var`.
    pub fn new(var: impl Into<OsString>) -> Self {
        Self { var: var.into() }
    }

    /// Returns the variable name.
    pub fn var(&self) -> &OsString {
        &self.var
    }
}

impl Default for EnvKey {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VAR)
    }
}

impl KeyProvider for EnvKey {
    fn key(&self) -> Option<String> {
        match std::env::var(&self.var) {
            Ok(value) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(std::env::VarError::NotPresent) => None,
            Err(std::env::VarError::NotUnicode(_)) => {
                log::warn!("ignoring non-UTF-8 key in {:?}", self.var);
                None
            }
        }
    }
}

impl<P: KeyProvider + ?Sized> KeyProvider for std::sync::Arc<P> {
    fn key(&self) -> Option<String> {
        (**self).key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_key() {
        assert_eq!(NoKey.key(), None);
    }

    #[test]
    fn test_static_key() {
        let provider = StaticKey::new("secret");
        assert_eq!(provider.key().as_deref(), Some("secret"));
        assert!(!format!("{:?}", provider).contains("secret"));
    }

    #[test]
    fn test_env_key_unset() {
        let provider = EnvKey::new("PYIARCHIVE_TEST_KEY_THAT_IS_NEVER_SET");
        assert_eq!(provider.key(), None);
    }

    #[test]
    fn test_env_key_default_var() {
        assert_eq!(EnvKey::default().var(), EnvKey::DEFAULT_VAR);
    }

    #[test]
    fn test_arc_provider() {
        let provider: std::sync::Arc<dyn KeyProvider> = std::sync::Arc::new(StaticKey::new("k"));
        assert_eq!(provider.key().as_deref(), Some("k"));
    }
}
