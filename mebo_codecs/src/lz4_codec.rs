use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use mebo_core::errors::{MeboError, Result};

/// LZ4 block codec. Fastest decompression of the bundled codecs; best for
/// hot payloads where decode latency matters more than ratio.
#[derive(Default)]
pub struct Lz4Codec;

impl Lz4Codec {
    pub fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(compress_prepend_size(raw))
    }

    pub fn decompress(&self, compressed: &[u8], expected_size: usize) -> Result<Vec<u8>> {
        let raw = decompress_size_prepended(compressed)
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
        let codec = Lz4Codec;
        let raw = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = codec.compress(&raw).unwrap();
        let decompressed = codec.decompress(&compressed, raw.len()).unwrap();
        assert_eq!(decompressed, raw);
    }

    #[test]
    fn empty_input_roundtrips() {
        let codec = Lz4Codec;
        let compressed = codec.compress(&[]).unwrap();
        assert_eq!(codec.decompress(&compressed, 0).unwrap(), Vec::<u8>::new());
    }
}
