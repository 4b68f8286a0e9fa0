use mebo_core::errors::{MeboError, Result};

/// Binding for the `S2` compression codec variant.
///
/// No Rust crate implements Klauspost's S2 format itself; `snap` (a
/// Snappy-compatible codec already used for the same role by a sibling
/// time-series codec in this corpus) is substituted here rather than
/// hand-rolling a wire-compatible S2 implementation. See `DESIGN.md`.
#[derive(Default)]
pub struct S2Codec;

impl S2Codec {
    pub fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Encoder::new()
            .compress_vec(raw)
            .map_err(|e| MeboError::CompressionFailed(e.to_string()))
    }

    pub fn decompress(&self, compressed: &[u8], expected_size: usize) -> Result<Vec<u8>> {
        let raw = snap::raw::Decoder::new()
            .decompress_vec(compressed)
            .map_err(|e| MeboError::DecompressionFailed(e.to_string()))?;
        if raw.len() != expected_size {
            return Err(MeboError::SizeMismatch {
                expected: expected_size,
                actual: raw.len(),
            });
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let codec = S2Codec;
        let raw = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = codec.compress(&raw).unwrap();
        let decompressed = codec.decompress(&compressed, raw.len()).unwrap();
        assert_eq!(decompressed, raw);
    }
}
