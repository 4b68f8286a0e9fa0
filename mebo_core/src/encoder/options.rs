//! Encoder configuration surface.

use crate::byteorder::Endian;
use crate::errors::{MeboError, Result};
use crate::flags::{CompressionCodec, TimestampEncoding, ValueEncoding};

/// Every named value a caller may request for timestamp encoding. Unlike
/// the internal [`TimestampEncoding`], this includes `Gorilla` so that
/// selecting it can be rejected with a named error instead of being
/// unrepresentable at the type level — the option surface enumerates the
/// same three choices as value encoding for symmetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampEncodingOption {
    Raw,
    #[default]
    Delta,
    Gorilla,
}

impl TimestampEncodingOption {
    fn resolve(self) -> Result<TimestampEncoding> {
        match self {
            TimestampEncodingOption::Raw => Ok(TimestampEncoding::Raw),
            TimestampEncodingOption::Delta => Ok(TimestampEncoding::Delta),
            TimestampEncodingOption::Gorilla => Err(MeboError::GorillaNotSupportedForTimestamps),
        }
    }
}

/// Encoder-wide configuration, mirroring the enumerated option surface
/// described in the module docs. Construct via `EncoderOptions::default()`
/// then `.with_*` overrides.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    pub timestamp_encoding: TimestampEncodingOption,
    pub value_encoding: ValueEncoding,
    pub timestamp_compression: CompressionCodec,
    pub value_compression: CompressionCodec,
    /// Used in place of `value_compression` for text blobs (single data
    /// payload); kept as a separate field so a caller configuring a text
    /// encoder never has to reason about the numeric-only value slot.
    pub data_compression: CompressionCodec,
    pub endian: Endian,
    pub tags_enabled: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            timestamp_encoding: TimestampEncodingOption::Delta,
            value_encoding: ValueEncoding::DEFAULT,
            timestamp_compression: CompressionCodec::DEFAULT_TS,
            value_compression: CompressionCodec::DEFAULT_VALUE,
            data_compression: CompressionCodec::DEFAULT_DATA,
            endian: Endian::Little,
            tags_enabled: false,
        }
    }
}

impl EncoderOptions {
    pub fn with_timestamp_encoding(mut self, encoding: TimestampEncodingOption) -> Self {
        self.timestamp_encoding = encoding;
        self
    }

    pub fn with_value_encoding(mut self, encoding: ValueEncoding) -> Self {
        self.value_encoding = encoding;
        self
    }

    pub fn with_timestamp_compression(mut self, codec: CompressionCodec) -> Self {
        self.timestamp_compression = codec;
        self
    }

    pub fn with_value_compression(mut self, codec: CompressionCodec) -> Self {
        self.value_compression = codec;
        self
    }

    pub fn with_data_compression(mut self, codec: CompressionCodec) -> Self {
        self.data_compression = codec;
        self
    }

    /// Any string other than "little"/"big" (case-insensitive) silently
    /// coerces to little-endian.
    pub fn with_endian_str(mut self, endian: &str) -> Self {
        self.endian = match endian.to_ascii_lowercase().as_str() {
            "big" => Endian::Big,
            _ => Endian::Little,
        };
        self
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn with_tags_enabled(mut self, enabled: bool) -> Self {
        self.tags_enabled = enabled;
        self
    }

    pub(crate) fn resolved_timestamp_encoding(&self) -> Result<TimestampEncoding> {
        self.timestamp_encoding.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_spec_defaults() {
        let opts = EncoderOptions::default();
        assert_eq!(opts.timestamp_encoding, TimestampEncodingOption::Delta);
        assert_eq!(opts.value_encoding, ValueEncoding::Raw);
        assert_eq!(opts.timestamp_compression, CompressionCodec::Zstd);
        assert_eq!(opts.value_compression, CompressionCodec::Zstd);
        assert_eq!(opts.endian, Endian::Little);
        assert!(!opts.tags_enabled);
    }

    #[test]
    fn gorilla_timestamp_encoding_is_rejected_on_resolve() {
        let opts = EncoderOptions::default().with_timestamp_encoding(TimestampEncodingOption::Gorilla);
        assert_eq!(
            opts.resolved_timestamp_encoding().unwrap_err(),
            MeboError::GorillaNotSupportedForTimestamps
        );
    }

    #[test]
    fn unrecognized_endian_string_coerces_to_little() {
        let opts = EncoderOptions::default().with_endian_str("middle-out");
        assert_eq!(opts.endian, Endian::Little);
    }

    #[test]
    fn recognized_endian_strings_are_case_insensitive() {
        let opts = EncoderOptions::default().with_endian_str("BIG");
        assert_eq!(opts.endian, Endian::Big);
    }
}
