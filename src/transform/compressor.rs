//! Compression codecs
//!
//! Compressed payloads are framed with a one-byte algorithm tag so a value
//! stays readable after the configured algorithm changes.

use std::io::{Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CacheError, Result};

const TAG_LZ4: u8 = 1;
const TAG_ZSTD: u8 = 2;

/// Compression algorithm selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// LZ4 - Fast compression/decompression (default)
    #[default]
    Lz4,
    /// Zstandard - Better compression ratio
    Zstd,
}

impl CompressionAlgorithm {
    fn tag(self) -> u8 {
        match self {
            Self::Lz4 => TAG_LZ4,
            Self::Zstd => TAG_ZSTD,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_LZ4 => Some(Self::Lz4),
            TAG_ZSTD => Some(Self::Zstd),
            _ => None,
        }
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lz4" => Ok(Self::Lz4),
            "zstd" => Ok(Self::Zstd),
            other => Err(format!("unknown compression algorithm '{}'", other)),
        }
    }
}

/// Framed compressor
#[derive(Debug, Clone)]
pub struct Compressor {
    algorithm: CompressionAlgorithm,
    zstd_level: i32,
}

impl Compressor {
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        Self {
            algorithm,
            zstd_level: 3,
        }
    }

    /// Compresses `data` into a tagged frame.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let body = match self.algorithm {
            CompressionAlgorithm::Lz4 => compress_lz4(data),
            CompressionAlgorithm::Zstd => zstd::encode_all(data, self.zstd_level),
        }
        .map_err(|e| CacheError::Transform(format!("compression failed: {}", e)))?;

        let mut framed = Vec::with_capacity(body.len() + 1);
        framed.push(self.algorithm.tag());
        framed.extend_from_slice(&body);

        debug!(
            "{:?} compressed: {} → {} bytes",
            self.algorithm,
            data.len(),
            framed.len()
        );
        Ok(framed)
    }

    /// Decompresses a tagged frame produced by any algorithm.
    pub fn decompress(&self, framed: &[u8]) -> Result<Vec<u8>> {
        let (&tag, body) = framed
            .split_first()
            .ok_or_else(|| CacheError::Transform("empty compressed frame".to_string()))?;
        let algorithm = CompressionAlgorithm::from_tag(tag)
            .ok_or_else(|| CacheError::Transform(format!("unknown compression tag {}", tag)))?;

        match algorithm {
            CompressionAlgorithm::Lz4 => decompress_lz4(body),
            CompressionAlgorithm::Zstd => zstd::decode_all(body),
        }
        .map_err(|e| CacheError::Transform(format!("decompression failed: {}", e)))
    }
}

fn compress_lz4(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = lz4::EncoderBuilder::new().level(4).build(Vec::new())?;
    encoder.write_all(data)?;
    let (compressed, result) = encoder.finish();
    result?;
    Ok(compressed)
}

fn decompress_lz4(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = lz4::Decoder::new(data)?;
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}
