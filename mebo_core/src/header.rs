//! Fixed-size header prelude for numeric and text blobs.
//!
//! Both headers are constant-size per family and carry absolute offsets
//! into the blob plus declared (uncompressed) payload sizes so a decoder
//! can validate decompression output without guessing.

use crate::byteorder::Endian;
use crate::errors::{MeboError, Result};
use crate::flags::FlagWord;

/// Wire format version. Frozen at 1; bumped only by a future incompatible
/// layout change.
pub const FORMAT_VERSION: u16 = 1;

pub const NUMERIC_HEADER_SIZE: usize = 64;
pub const TEXT_HEADER_SIZE: usize = 40;

/// Header for a numeric (float64) blob. See module docs for layout.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericHeader {
    pub version: u16,
    pub start_time_us: i64,
    pub flag: FlagWord,
    pub metric_count: u32,
    pub names_payload_offset: u32,
    pub names_payload_size: u32,
    pub index_offset: u32,
    pub ts_payload_offset: u32,
    pub ts_payload_compressed_size: u32,
    pub ts_payload_uncompressed_size: u32,
    pub val_payload_offset: u32,
    pub val_payload_compressed_size: u32,
    pub val_payload_uncompressed_size: u32,
    pub tag_payload_offset: u32,
    pub tag_payload_compressed_size: u32,
    pub tag_payload_uncompressed_size: u32,
}

impl NumericHeader {
    pub fn to_bytes(&self) -> Vec<u8> {
        let e = self.flag.endian;
        let mut buf = Vec::with_capacity(NUMERIC_HEADER_SIZE);
        e.write_u16(&mut buf, self.version);
        e.write_i64(&mut buf, self.start_time_us);
        e.write_u16(&mut buf, self.flag.to_u16());
        e.write_u32(&mut buf, self.metric_count);
        e.write_u32(&mut buf, self.names_payload_offset);
        e.write_u32(&mut buf, self.names_payload_size);
        e.write_u32(&mut buf, self.index_offset);
        e.write_u32(&mut buf, self.ts_payload_offset);
        e.write_u32(&mut buf, self.ts_payload_compressed_size);
        e.write_u32(&mut buf, self.ts_payload_uncompressed_size);
        e.write_u32(&mut buf, self.val_payload_offset);
        e.write_u32(&mut buf, self.val_payload_compressed_size);
        e.write_u32(&mut buf, self.val_payload_uncompressed_size);
        e.write_u32(&mut buf, self.tag_payload_offset);
        e.write_u32(&mut buf, self.tag_payload_compressed_size);
        e.write_u32(&mut buf, self.tag_payload_uncompressed_size);
        debug_assert_eq!(buf.len(), NUMERIC_HEADER_SIZE);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < NUMERIC_HEADER_SIZE {
            return Err(MeboError::InvalidHeaderSize {
                needed: NUMERIC_HEADER_SIZE,
                got: buf.len(),
            });
        }
        // The flag word's endianness governs every other field, but the
        // flag word itself is two fixed bytes at offset 10 regardless of
        // endianness (it is read as a plain u16, not endian-swapped twice).
        let flag_raw = u16::from_le_bytes([buf[10], buf[11]]);
        let flag = FlagWord::from_u16(flag_raw);
        let e = flag.endian;

        Ok(NumericHeader {
            version: e.read_u16(&buf[0..2]),
            start_time_us: e.read_i64(&buf[2..10]),
            flag,
            metric_count: e.read_u32(&buf[12..16]),
            names_payload_offset: e.read_u32(&buf[16..20]),
            names_payload_size: e.read_u32(&buf[20..24]),
            index_offset: e.read_u32(&buf[24..28]),
            ts_payload_offset: e.read_u32(&buf[28..32]),
            ts_payload_compressed_size: e.read_u32(&buf[32..36]),
            ts_payload_uncompressed_size: e.read_u32(&buf[36..40]),
            val_payload_offset: e.read_u32(&buf[40..44]),
            val_payload_compressed_size: e.read_u32(&buf[44..48]),
            val_payload_uncompressed_size: e.read_u32(&buf[48..52]),
            tag_payload_offset: e.read_u32(&buf[52..56]),
            tag_payload_compressed_size: e.read_u32(&buf[56..60]),
            tag_payload_uncompressed_size: e.read_u32(&buf[60..64]),
        })
    }
}

/// Header for a text (UTF-8 string) blob. See module docs for layout.
#[derive(Debug, Clone, PartialEq)]
pub struct TextHeader {
    pub version: u16,
    pub start_time_us: i64,
    pub flag: FlagWord,
    pub metric_count: u32,
    pub names_payload_offset: u32,
    pub names_payload_size: u32,
    pub index_offset: u32,
    pub data_payload_offset: u32,
    pub data_payload_compressed_size: u32,
    /// Uncompressed size of the data payload.
    pub data_payload_uncompressed_size: u32,
}

impl TextHeader {
    pub fn to_bytes(&self) -> Vec<u8> {
        let e = self.flag.endian;
        let mut buf = Vec::with_capacity(TEXT_HEADER_SIZE);
        e.write_u16(&mut buf, self.version);
        e.write_i64(&mut buf, self.start_time_us);
        e.write_u16(&mut buf, self.flag.to_u16());
        e.write_u32(&mut buf, self.metric_count);
        e.write_u32(&mut buf, self.names_payload_offset);
        e.write_u32(&mut buf, self.names_payload_size);
        e.write_u32(&mut buf, self.index_offset);
        e.write_u32(&mut buf, self.data_payload_offset);
        e.write_u32(&mut buf, self.data_payload_compressed_size);
        e.write_u32(&mut buf, self.data_payload_uncompressed_size);
        debug_assert_eq!(buf.len(), TEXT_HEADER_SIZE);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < TEXT_HEADER_SIZE {
            return Err(MeboError::InvalidHeaderSize {
                needed: TEXT_HEADER_SIZE,
                got: buf.len(),
            });
        }
        let flag_raw = u16::from_le_bytes([buf[10], buf[11]]);
        let flag = FlagWord::from_u16(flag_raw);
        let e = flag.endian;

        Ok(TextHeader {
            version: e.read_u16(&buf[0..2]),
            start_time_us: e.read_i64(&buf[2..10]),
            flag,
            metric_count: e.read_u32(&buf[12..16]),
            names_payload_offset: e.read_u32(&buf[16..20]),
            names_payload_size: e.read_u32(&buf[20..24]),
            index_offset: e.read_u32(&buf[24..28]),
            data_payload_offset: e.read_u32(&buf[28..32]),
            data_payload_compressed_size: e.read_u32(&buf[32..36]),
            data_payload_uncompressed_size: e.read_u32(&buf[36..40]),
        })
    }
}
