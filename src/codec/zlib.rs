//! zlib codec implementation.

use std::io::{self, Read};

use flate2::bufread::ZlibDecoder as FlateDecoder;

/// zlib decoder.
pub struct ZlibDecoder<R> {
    inner: FlateDecoder<R>,
}

impl<R> std::fmt::Debug for ZlibDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZlibDecoder").finish_non_exhaustive()
    }
}

impl<R: io::BufRead> ZlibDecoder<R> {
    /// Creates a new zlib decoder.
    ///
    /// # Arguments
    ///
    /// * `input` - The compressed data source (must implement BufRead)
    pub fn new(input: R) -> Self {
        Self {
            inner: FlateDecoder::new(input),
        }
    }
}

impl<R: io::BufRead> Read for ZlibDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
