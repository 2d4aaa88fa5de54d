//! Transform Pipeline
//!
//! Reversible value transforms applied before storage: compression above a
//! size threshold, then optional encryption through a pluggable [`Cipher`].
//! `reverse(transform(v)) == v` holds for every value.

mod compressor;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

pub use compressor::{CompressionAlgorithm, Compressor};

use crate::error::{CacheError, Result};

// == Cipher ==
/// Symmetric encryption hook. The engine ships no cipher of its own;
/// callers plug one in when `encryption_enabled` is set.
pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> anyhow::Result<Vec<u8>>;
    fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<Vec<u8>>;
}

// == Transformed ==
/// Stored form of a value plus the flags needed to reverse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub bytes: Vec<u8>,
    pub compressed: bool,
    pub encrypted: bool,
}

// == Transform Pipeline ==
#[derive(Clone)]
pub struct TransformPipeline {
    compressor: Option<Compressor>,
    threshold: usize,
    cipher: Option<Arc<dyn Cipher>>,
}

impl fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("compressor", &self.compressor)
            .field("threshold", &self.threshold)
            .field("cipher", &self.cipher.is_some())
            .finish()
    }
}

impl TransformPipeline {
    /// Pass-through pipeline.
    pub fn passthrough() -> Self {
        Self {
            compressor: None,
            threshold: usize::MAX,
            cipher: None,
        }
    }

    pub fn new(
        compressor: Option<Compressor>,
        threshold: usize,
        cipher: Option<Arc<dyn Cipher>>,
    ) -> Self {
        Self {
            compressor,
            threshold,
            cipher,
        }
    }

    pub fn can_encrypt(&self) -> bool {
        self.cipher.is_some()
    }

    // == Transform ==
    /// Prepares a value for storage.
    ///
    /// Compression runs only when requested, configured, the value is above
    /// the threshold, and the result is actually smaller. Encryption runs
    /// after compression whenever requested and a cipher is configured.
    pub fn transform(&self, value: Vec<u8>, compress: bool, encrypt: bool) -> Result<Transformed> {
        let mut bytes = value;
        let mut compressed = false;

        if compress && bytes.len() > self.threshold {
            if let Some(compressor) = &self.compressor {
                let framed = compressor.compress(&bytes)?;
                if framed.len() < bytes.len() {
                    bytes = framed;
                    compressed = true;
                } else {
                    debug!("Compression did not shrink {} bytes, storing raw", bytes.len());
                }
            }
        }

        let mut encrypted = false;
        if encrypt {
            if let Some(cipher) = &self.cipher {
                bytes = cipher
                    .encrypt(&bytes)
                    .map_err(|e| CacheError::Transform(format!("encryption failed: {}", e)))?;
                encrypted = true;
            }
        }

        Ok(Transformed {
            bytes,
            compressed,
            encrypted,
        })
    }

    // == Reverse ==
    /// Restores the original value from its stored form.
    pub fn reverse(&self, stored: &[u8], compressed: bool, encrypted: bool) -> Result<Vec<u8>> {
        let mut bytes = if encrypted {
            let cipher = self.cipher.as_ref().ok_or_else(|| {
                CacheError::Transform("value is encrypted but no cipher is configured".to_string())
            })?;
            cipher
                .decrypt(stored)
                .map_err(|e| CacheError::Transform(format!("decryption failed: {}", e)))?
        } else {
            stored.to_vec()
        };

        if compressed {
            // Frames are self-describing, so any compressor can read them.
            let compressor = self
                .compressor
                .clone()
                .unwrap_or_else(|| Compressor::new(CompressionAlgorithm::default()));
            bytes = compressor.decompress(&bytes)?;
        }

        Ok(bytes)
    }
}
