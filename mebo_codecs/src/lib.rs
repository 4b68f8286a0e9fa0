//! Concrete `Compression` bindings for the codec identities `mebo_core`
//! carries on the wire (`CompressionCodec`).
//!
//! `mebo_core` only knows about the 2-bit codec identity stored in a blob's
//! flag word; it never links a compression library itself. This crate
//! provides the other half: [`CodecRegistry`] implements
//! `mebo_core::Compression` by dispatching each payload column to the right
//! concrete codec.

mod lz4_codec;
mod passthrough;
mod s2_codec;
mod zstd_codec;

pub use lz4_codec::Lz4Codec;
pub use passthrough::PassthroughCodec;
pub use s2_codec::S2Codec;
pub use zstd_codec::ZstdCodec;

use mebo_core::compression::Compression;
use mebo_core::errors::Result;
use mebo_core::flags::CompressionCodec;

/// Dispatches each payload column to its codec binding by wire identity.
///
/// Constructed once by callers (the CLI, tests) and handed to encoders and
/// decoders as `&dyn Compression`.
#[derive(Default)]
pub struct CodecRegistry {
    zstd: ZstdCodec,
    lz4: Lz4Codec,
    s2: S2Codec,
    passthrough: PassthroughCodec,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry whose zstd binding uses a non-default compression
    /// level; the other codecs have no tunable levels.
    pub fn with_zstd_level(level: i32) -> Self {
        Self {
            zstd: ZstdCodec::new(level),
            ..Self::default()
        }
    }
}

impl Compression for CodecRegistry {
    fn compress(&self, codec: CompressionCodec, raw: &[u8]) -> Result<Vec<u8>> {
        match codec {
            CompressionCodec::None => self.passthrough.compress(raw),
            CompressionCodec::Zstd => self.zstd.compress(raw),
            CompressionCodec::S2 => self.s2.compress(raw),
            CompressionCodec::Lz4 => self.lz4.compress(raw),
        }
    }

    fn decompress(&self, codec: CompressionCodec, compressed: &[u8], expected_size: usize) -> Result<Vec<u8>> {
        match codec {
            CompressionCodec::None => self.passthrough.decompress(compressed, expected_size),
            CompressionCodec::Zstd => self.zstd.decompress(compressed, expected_size),
            CompressionCodec::S2 => self.s2.decompress(compressed, expected_size),
            CompressionCodec::Lz4 => self.lz4.decompress(compressed, expected_size),
        }
    }
}
