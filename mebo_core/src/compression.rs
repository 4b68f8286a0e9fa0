//! The compression binding contract: an external collaborator, interface
//! only. `mebo_core` never links a concrete compression library —
//! encoders and decoders are handed a `&dyn Compression` trait object.
//! `mebo_codecs` is the crate that actually implements this trait against
//! zstd/lz4/snap.

use crate::errors::Result;
use crate::flags::CompressionCodec;

/// Compress/decompress one payload column under a given [`CompressionCodec`].
///
/// Implementations must be lossless and must either be self-delimiting
/// (know their own decompressed length) or accept the `expected_size` hint
/// passed to `decompress` and fail if the result doesn't match.
pub trait Compression: Send + Sync {
    fn compress(&self, codec: CompressionCodec, raw: &[u8]) -> Result<Vec<u8>>;

    fn decompress(
        &self,
        codec: CompressionCodec,
        compressed: &[u8],
        expected_size: usize,
    ) -> Result<Vec<u8>>;
}
