use mebo_core::errors::{MeboError, Result};

/// Zstandard block codec.
///
/// Each payload column is compressed independently at the configured level
/// (default: 3), against the whole-buffer `compress`/`decompress` contract
/// `mebo_core` hands codec bindings.
pub struct ZstdCodec {
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }

    pub fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(raw, self.level).map_err(|e| MeboError::CompressionFailed(e.to_string()))
    }

    pub fn decompress(&self, compressed: &[u8], expected_size: usize) -> Result<Vec<u8>> {
        let raw = zstd::decode_all(compressed).map_err(|e| MeboError::DecompressionFailed(e.to_string()))?;
        if raw.len() != expected_size {
            return Err(MeboError::SizeMismatch {
                expected: expected_size,
                actual: raw.len(),
            });
        }
        Ok(raw)
    }
}
