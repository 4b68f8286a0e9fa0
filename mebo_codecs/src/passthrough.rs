use mebo_core::errors::{MeboError, Result};

/// No-op codec: stores a payload verbatim. Used when `CompressionCodec::None`
/// is selected, and useful for verifying the blob format independently of
/// any compression library.
#[derive(Default)]
pub struct PassthroughCodec;

impl PassthroughCodec {
    pub fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    pub fn decompress(&self, compressed: &[u8], expected_size: usize) -> Result<Vec<u8>> {
        if compressed.len() != expected_size {
            return Err(MeboError::SizeMismatch {
                expected: expected_size,
                actual: compressed.len(),
            });
        }
        Ok(compressed.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_is_identity() {
        let codec = PassthroughCodec;
        let raw = b"hello world".to_vec();
        let compressed = codec.compress(&raw).unwrap();
        assert_eq!(compressed, raw);
        assert_eq!(codec.decompress(&compressed, raw.len()).unwrap(), raw);
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let codec = PassthroughCodec;
        let err = codec.decompress(b"abc", 4).unwrap_err();
        assert!(matches!(err, MeboError::SizeMismatch { .. }));
    }
}
