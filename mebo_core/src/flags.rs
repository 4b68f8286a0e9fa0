//! The 16-bit flag word packed into every header.
//!
//! Bit layout (LSB first):
//! ```text
//! bit 0      endianness        0 = little, 1 = big
//! bit 1      timestamp encoding 0 = raw, 1 = delta
//! bit 2      value encoding     0 = raw, 1 = gorilla
//! bits 3-4   timestamp compression (CompressionCodec::bits)
//! bits 5-6   value/data compression (CompressionCodec::bits)
//! bit 7      has_tag
//! bit 8      has_metric_names
//! bits 9-15  reserved, always zero
//! ```
//! Value/data compression shares one 2-bit field: a numeric blob uses it for
//! the value payload, a text blob uses it for the single data payload — the
//! two families never coexist in one blob so there's no ambiguity.

use crate::byteorder::Endian;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampEncoding {
    Raw,
    Delta,
}

impl TimestampEncoding {
    pub const DEFAULT: TimestampEncoding = TimestampEncoding::Delta;

    fn bit(self) -> bool {
        matches!(self, TimestampEncoding::Delta)
    }

    fn from_bit(bit: bool) -> Self {
        if bit {
            TimestampEncoding::Delta
        } else {
            TimestampEncoding::Raw
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    Raw,
    Gorilla,
}

impl ValueEncoding {
    pub const DEFAULT: ValueEncoding = ValueEncoding::Raw;

    fn bit(self) -> bool {
        matches!(self, ValueEncoding::Gorilla)
    }

    fn from_bit(bit: bool) -> Self {
        if bit {
            ValueEncoding::Gorilla
        } else {
            ValueEncoding::Raw
        }
    }
}

/// Compression applied independently to one payload column.
///
/// The concrete `compress`/`decompress` bindings for these codecs live in
/// `mebo_codecs`, an external collaborator; this enum only carries
/// the 2-bit wire identity and is what the flag word actually stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionCodec {
    #[default]
    None,
    Zstd,
    S2,
    Lz4,
}

impl CompressionCodec {
    pub const DEFAULT_TS: CompressionCodec = CompressionCodec::Zstd;
    pub const DEFAULT_VALUE: CompressionCodec = CompressionCodec::Zstd;
    pub const DEFAULT_DATA: CompressionCodec = CompressionCodec::Zstd;

    fn bits(self) -> u16 {
        match self {
            CompressionCodec::None => 0b00,
            CompressionCodec::Zstd => 0b01,
            CompressionCodec::S2 => 0b10,
            CompressionCodec::Lz4 => 0b11,
        }
    }

    fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0b00 => CompressionCodec::None,
            0b01 => CompressionCodec::Zstd,
            0b10 => CompressionCodec::S2,
            _ => CompressionCodec::Lz4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionCodec::None => "none",
            CompressionCodec::Zstd => "zstd",
            CompressionCodec::S2 => "s2",
            CompressionCodec::Lz4 => "lz4",
        }
    }
}

const BIT_ENDIAN: u16 = 0;
const BIT_TS_ENCODING: u16 = 1;
const BIT_VALUE_ENCODING: u16 = 2;
const SHIFT_TS_COMPRESSION: u16 = 3;
const SHIFT_VALUE_COMPRESSION: u16 = 5;
const BIT_HAS_TAG: u16 = 7;
const BIT_HAS_METRIC_NAMES: u16 = 8;

#[inline]
fn get_bit(word: u16, bit: u16) -> bool {
    (word >> bit) & 1 == 1
}

#[inline]
fn set_bit(word: &mut u16, bit: u16, value: bool) {
    if value {
        *word |= 1 << bit;
    } else {
        *word &= !(1 << bit);
    }
}

/// Decoded view of the flag word. Constructed either from encoder options
/// (`FlagWord::new`) or parsed from the wire (`FlagWord::from_u16`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagWord {
    pub endian: Endian,
    pub ts_encoding: TimestampEncoding,
    pub value_encoding: ValueEncoding,
    pub ts_compression: CompressionCodec,
    /// Value compression for numeric blobs, data compression for text blobs.
    pub value_compression: CompressionCodec,
    pub has_tag: bool,
    pub has_metric_names: bool,
}

impl FlagWord {
    pub fn to_u16(self) -> u16 {
        let mut word = 0u16;
        set_bit(&mut word, BIT_ENDIAN, self.endian.flag_bit());
        set_bit(&mut word, BIT_TS_ENCODING, self.ts_encoding.bit());
        set_bit(&mut word, BIT_VALUE_ENCODING, self.value_encoding.bit());
        word |= self.ts_compression.bits() << SHIFT_TS_COMPRESSION;
        word |= self.value_compression.bits() << SHIFT_VALUE_COMPRESSION;
        set_bit(&mut word, BIT_HAS_TAG, self.has_tag);
        set_bit(&mut word, BIT_HAS_METRIC_NAMES, self.has_metric_names);
        word
    }

    pub fn from_u16(word: u16) -> Self {
        FlagWord {
            endian: Endian::from_flag_bit(get_bit(word, BIT_ENDIAN)),
            ts_encoding: TimestampEncoding::from_bit(get_bit(word, BIT_TS_ENCODING)),
            value_encoding: ValueEncoding::from_bit(get_bit(word, BIT_VALUE_ENCODING)),
            ts_compression: CompressionCodec::from_bits(word >> SHIFT_TS_COMPRESSION),
            value_compression: CompressionCodec::from_bits(word >> SHIFT_VALUE_COMPRESSION),
            has_tag: get_bit(word, BIT_HAS_TAG),
            has_metric_names: get_bit(word, BIT_HAS_METRIC_NAMES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_fields() {
        let flag = FlagWord {
            endian: Endian::Big,
            ts_encoding: TimestampEncoding::Raw,
            value_encoding: ValueEncoding::Gorilla,
            ts_compression: CompressionCodec::Lz4,
            value_compression: CompressionCodec::S2,
            has_tag: true,
            has_metric_names: true,
        };
        let word = flag.to_u16();
        assert_eq!(FlagWord::from_u16(word), flag);
    }

    #[test]
    fn default_flags_roundtrip() {
        let flag = FlagWord {
            endian: Endian::Little,
            ts_encoding: TimestampEncoding::DEFAULT,
            value_encoding: ValueEncoding::DEFAULT,
            ts_compression: CompressionCodec::DEFAULT_TS,
            value_compression: CompressionCodec::DEFAULT_VALUE,
            has_tag: false,
            has_metric_names: false,
        };
        assert_eq!(FlagWord::from_u16(flag.to_u16()), flag);
    }

    #[test]
    fn reserved_bits_stay_zero() {
        let flag = FlagWord {
            endian: Endian::Big,
            ts_encoding: TimestampEncoding::Delta,
            value_encoding: ValueEncoding::Gorilla,
            ts_compression: CompressionCodec::Lz4,
            value_compression: CompressionCodec::Lz4,
            has_tag: true,
            has_metric_names: true,
        };
        assert_eq!(flag.to_u16() >> 9, 0);
    }
}
