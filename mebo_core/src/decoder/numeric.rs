//! Numeric blob decoder.

use crate::byteorder::Endian;
use crate::compression::Compression;
use crate::errors::{MeboError, Result};
use crate::flags::{TimestampEncoding, ValueEncoding};
use crate::hash::hash_metric_name;
use crate::header::NumericHeader;
use crate::index::{prefix_sum_offsets, NumericIndexEntry};
use crate::payload;

use super::{parse_names_payload, validate_metric_names};

/// A fully-opened numeric blob: header, index, and decompressed payload
/// columns. Opening does the decompression work up front; everything after
/// that (`metric`, random access) operates on the decompressed buffers.
pub struct NumericDecoder {
    header: NumericHeader,
    index: Vec<NumericIndexEntry>,
    names: Option<Vec<String>>,
    ts_buf: Vec<u8>,
    val_buf: Vec<u8>,
    tag_buf: Vec<u8>,
    ts_abs: Vec<u64>,
    val_abs: Vec<u64>,
    tag_abs: Vec<u64>,
}

impl NumericDecoder {
    pub fn open(buf: &[u8], compression: &dyn Compression) -> Result<Self> {
        let header = NumericHeader::from_bytes(buf)?;
        let endian = header.flag.endian;

        let has_tag = header.flag.has_tag;
        let entry_size = NumericIndexEntry::wire_size(has_tag);
        let index_start = header.index_offset as usize;
        let index_end = index_start + entry_size * header.metric_count as usize;
        if index_end > buf.len() {
            return Err(MeboError::InsufficientData {
                needed: index_end,
                offset: index_start,
                len: buf.len(),
            });
        }
        let mut index = Vec::with_capacity(header.metric_count as usize);
        for i in 0..header.metric_count as usize {
            let start = index_start + i * entry_size;
            index.push(NumericIndexEntry::read(&buf[start..], endian, has_tag)?);
        }

        let names = if header.flag.has_metric_names {
            let names = parse_names_payload(buf, header.names_payload_offset as usize)?;
            let index_ids: Vec<u64> = index.iter().map(|e| e.metric_id).collect();
            validate_metric_names(&names, &index_ids)?;
            Some(names)
        } else {
            None
        };

        let ts_buf = slice_and_decompress(
            buf,
            header.ts_payload_offset as usize,
            header.ts_payload_compressed_size as usize,
            header.ts_payload_uncompressed_size as usize,
            header.flag.ts_compression,
            compression,
        )?;
        let val_buf = slice_and_decompress(
            buf,
            header.val_payload_offset as usize,
            header.val_payload_compressed_size as usize,
            header.val_payload_uncompressed_size as usize,
            header.flag.value_compression,
            compression,
        )?;
        let tag_buf = if has_tag {
            slice_and_decompress(
                buf,
                header.tag_payload_offset as usize,
                header.tag_payload_compressed_size as usize,
                header.tag_payload_uncompressed_size as usize,
                header.flag.value_compression,
                compression,
            )?
        } else {
            Vec::new()
        };

        let ts_deltas: Vec<u32> = index.iter().map(|e| e.ts_offset_delta).collect();
        let val_deltas: Vec<u32> = index.iter().map(|e| e.val_offset_delta).collect();
        let tag_deltas: Vec<u32> = index.iter().map(|e| e.tag_offset_delta).collect();

        Ok(NumericDecoder {
            header,
            index,
            names,
            ts_buf,
            val_buf,
            tag_buf,
            ts_abs: prefix_sum_offsets(&ts_deltas),
            val_abs: prefix_sum_offsets(&val_deltas),
            tag_abs: if has_tag { prefix_sum_offsets(&tag_deltas) } else { Vec::new() },
        })
    }

    pub fn metric_count(&self) -> usize {
        self.header.metric_count as usize
    }

    pub fn start_time_us(&self) -> i64 {
        self.header.start_time_us
    }

    pub fn endian(&self) -> Endian {
        self.header.flag.endian
    }

    pub fn timestamp_encoding(&self) -> TimestampEncoding {
        self.header.flag.ts_encoding
    }

    pub fn value_encoding(&self) -> ValueEncoding {
        self.header.flag.value_encoding
    }

    pub fn has_tag(&self) -> bool {
        self.header.flag.has_tag
    }

    /// Names in index order, only present when a real hash collision
    /// forced them onto the wire.
    pub fn metric_names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    pub fn metric_id_at(&self, metric_index: usize) -> Option<u64> {
        self.index.get(metric_index).map(|e| e.metric_id)
    }

    pub fn point_count_at(&self, metric_index: usize) -> Option<u16> {
        self.index.get(metric_index).map(|e| e.count)
    }

    /// Raw index entries in on-wire order, offset deltas included. Exposed
    /// for tooling (blob inspection) and tests that assert on the index
    /// layout directly rather than through decoded payload values.
    pub fn index_entries(&self) -> &[NumericIndexEntry] {
        &self.index
    }

    pub fn find_by_id(&self, id: u64) -> Option<usize> {
        self.index.iter().position(|e| e.metric_id == id)
    }

    /// Resolve a metric name to its index, verifying against the names
    /// payload when one is present (collision case) and otherwise against
    /// the hash of `name` directly.
    pub fn find_by_name(&self, name: &str) -> Result<Option<usize>> {
        if let Some(names) = &self.names {
            return Ok(names.iter().position(|n| n == name));
        }
        let id = hash_metric_name(name);
        Ok(self.find_by_id(id))
    }

    /// Verify that `name` actually hashes to the id stored for
    /// `metric_index` — useful after `find_by_name` returns an index found
    /// via the names payload, to catch a caller passing a name that
    /// collides with another but was never itself started.
    pub fn verify_metric_name(&self, metric_index: usize, name: &str) -> Result<()> {
        let expected = self.metric_id_at(metric_index).ok_or(MeboError::InvalidOffset {
            offset: metric_index,
            len: self.index.len(),
        })?;
        let actual = hash_metric_name(name);
        if actual != expected && self.find_by_id(expected).is_some() {
            return Err(MeboError::MetricNameVerificationFailed {
                name: name.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn ts_slice(&self, metric_index: usize) -> Result<&[u8]> {
        slice_from(&self.ts_buf, self.ts_abs.get(metric_index).copied())
    }

    fn val_slice(&self, metric_index: usize) -> Result<&[u8]> {
        slice_from(&self.val_buf, self.val_abs.get(metric_index).copied())
    }

    fn tag_slice(&self, metric_index: usize) -> Result<&[u8]> {
        slice_from(&self.tag_buf, self.tag_abs.get(metric_index).copied())
    }

    pub fn timestamps_for(&self, metric_index: usize) -> Result<Vec<i64>> {
        let count = self.point_count_at(metric_index).ok_or(MeboError::InvalidOffset {
            offset: metric_index,
            len: self.index.len(),
        })? as usize;
        payload::decode_timestamps(
            self.ts_slice(metric_index)?,
            count,
            self.header.start_time_us,
            self.header.flag.ts_encoding,
            self.header.flag.endian,
        )
    }

    pub fn values_for(&self, metric_index: usize) -> Result<Vec<f64>> {
        let count = self.point_count_at(metric_index).ok_or(MeboError::InvalidOffset {
            offset: metric_index,
            len: self.index.len(),
        })? as usize;
        payload::decode_values(
            self.val_slice(metric_index)?,
            count,
            self.header.flag.value_encoding,
            self.header.flag.endian,
        )
    }

    pub fn tags_for(&self, metric_index: usize) -> Result<Option<Vec<String>>> {
        if !self.has_tag() {
            return Ok(None);
        }
        let count = self.point_count_at(metric_index).ok_or(MeboError::InvalidOffset {
            offset: metric_index,
            len: self.index.len(),
        })? as usize;
        Ok(Some(payload::decode_tags(self.tag_slice(metric_index)?, count)?))
    }

    pub fn timestamp_at(&self, metric_index: usize, point_index: usize) -> Result<Option<i64>> {
        Ok(payload::timestamp_at(
            self.ts_slice(metric_index)?,
            point_index,
            self.header.start_time_us,
            self.header.flag.ts_encoding,
            self.header.flag.endian,
        ))
    }

    pub fn value_at(&self, metric_index: usize, point_index: usize) -> Result<Option<f64>> {
        Ok(payload::value_at(
            self.val_slice(metric_index)?,
            point_index,
            self.header.flag.value_encoding,
            self.header.flag.endian,
        ))
    }

    /// Total uncompressed size of the timestamp/value/tag payload columns.
    pub fn raw_size(&self) -> u64 {
        (self.header.ts_payload_uncompressed_size
            + self.header.val_payload_uncompressed_size
            + self.header.tag_payload_uncompressed_size) as u64
    }

    /// Total on-wire size of the timestamp/value/tag payload columns.
    pub fn compressed_size(&self) -> u64 {
        (self.header.ts_payload_compressed_size
            + self.header.val_payload_compressed_size
            + self.header.tag_payload_compressed_size) as u64
    }

    /// `raw_size() / compressed_size()`, or `1.0` if the payload is empty.
    pub fn compression_ratio(&self) -> f64 {
        let compressed = self.compressed_size();
        if compressed == 0 {
            return 1.0;
        }
        self.raw_size() as f64 / compressed as f64
    }

    pub fn tag_at(&self, metric_index: usize, point_index: usize) -> Result<Option<String>> {
        if !self.has_tag() {
            return Ok(None);
        }
        let count = self.point_count_at(metric_index).ok_or(MeboError::InvalidOffset {
            offset: metric_index,
            len: self.index.len(),
        })? as usize;
        Ok(payload::tag_at(self.tag_slice(metric_index)?, count, point_index))
    }
}

fn slice_from(buf: &[u8], abs_offset: Option<u64>) -> Result<&[u8]> {
    let offset = abs_offset.ok_or(MeboError::InvalidOffset { offset: 0, len: buf.len() })? as usize;
    if offset > buf.len() {
        return Err(MeboError::InvalidOffset { offset, len: buf.len() });
    }
    Ok(&buf[offset..])
}

fn slice_and_decompress(
    buf: &[u8],
    offset: usize,
    compressed_size: usize,
    uncompressed_size: usize,
    codec: crate::flags::CompressionCodec,
    compression: &dyn Compression,
) -> Result<Vec<u8>> {
    let end = offset + compressed_size;
    if end > buf.len() {
        return Err(MeboError::InsufficientData {
            needed: end,
            offset,
            len: buf.len(),
        });
    }
    let out = compression.decompress(codec, &buf[offset..end], uncompressed_size)?;
    if out.len() != uncompressed_size {
        return Err(MeboError::SizeMismatch {
            expected: uncompressed_size,
            actual: out.len(),
        });
    }
    Ok(out)
}
