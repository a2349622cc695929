//! Hand-off of decompressed module data to a code loader.

use crate::BoxError;

/// Turns the decompressed bytes of a module entry into a loaded code unit.
///
/// The PYZ reader only decrypts and decompresses; what a "code object" is
/// belongs to the caller. Any closure `Fn(&str, Vec<u8>) -> Result<C, BoxError>`
/// is a decoder.
pub trait CodeDecoder {
    /// The loaded code unit.
    type Code;

    /// Decodes the data of entry `name`.
    fn decode(&self, name: &str, bytes: Vec<u8>) -> Result<Self::Code, BoxError>;
}

impl<F, C> CodeDecoder for F
where
    F: Fn(&str, Vec<u8>) -> Result<C, BoxError>,
{
    type Code = C;

    fn decode(&self, name: &str, bytes: Vec<u8>) -> Result<C, BoxError> {
        self(name, bytes)
    }
}

/// Decoder that keeps module data as bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCode;

impl CodeDecoder for RawCode {
    type Code = Vec<u8>;

    fn decode(&self, _name: &str, bytes: Vec<u8>) -> Result<Vec<u8>, BoxError> {
        Ok(bytes)
    }
}

/// Result of extracting a PYZ entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PyzObject<C> {
    /// Code produced by a [`CodeDecoder`].
    Code(C),
    /// Decompressed entry data.
    Bytes(Vec<u8>),
}

impl<C> PyzObject<C> {
    /// Returns the code, if the entry was decoded.
    pub fn into_code(self) -> Option<C> {
        match self {
            Self::Code(code) => Some(code),
            Self::Bytes(_) => None,
        }
    }

    /// Returns the bytes, if the entry was not decoded.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Code(_) => None,
            Self::Bytes(bytes) => Some(bytes),
        }
    }
}
