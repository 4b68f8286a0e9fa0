//! Text blob decoder: the row-based sibling of [`crate::decoder::numeric`].

use crate::byteorder::Endian;
use crate::compression::Compression;
use crate::errors::{MeboError, Result};
use crate::flags::TimestampEncoding;
use crate::hash::hash_metric_name;
use crate::header::TextHeader;
use crate::index::{prefix_sum_offsets, TextIndexEntry};
use crate::payload::{self, TextRow};

use super::{parse_names_payload, validate_metric_names};

pub struct TextDecoder {
    header: TextHeader,
    index: Vec<TextIndexEntry>,
    names: Option<Vec<String>>,
    data_buf: Vec<u8>,
    abs_offsets: Vec<u64>,
}

impl TextDecoder {
    pub fn open(buf: &[u8], compression: &dyn Compression) -> Result<Self> {
        let header = TextHeader::from_bytes(buf)?;
        let endian = header.flag.endian;

        let index_start = header.index_offset as usize;
        let index_end = index_start + TextIndexEntry::WIRE_SIZE * header.metric_count as usize;
        if index_end > buf.len() {
            return Err(MeboError::InsufficientData {
                needed: index_end,
                offset: index_start,
                len: buf.len(),
            });
        }
        let mut index = Vec::with_capacity(header.metric_count as usize);
        for i in 0..header.metric_count as usize {
            let start = index_start + i * TextIndexEntry::WIRE_SIZE;
            index.push(TextIndexEntry::read(&buf[start..], endian)?);
        }

        let names = if header.flag.has_metric_names {
            let names = parse_names_payload(buf, header.names_payload_offset as usize)?;
            let index_ids: Vec<u64> = index.iter().map(|e| e.metric_id).collect();
            validate_metric_names(&names, &index_ids)?;
            Some(names)
        } else {
            None
        };

        let offset = header.data_payload_offset as usize;
        let end = offset + header.data_payload_compressed_size as usize;
        if end > buf.len() {
            return Err(MeboError::InsufficientData {
                needed: end,
                offset,
                len: buf.len(),
            });
        }
        let data_buf = compression.decompress(
            header.flag.value_compression,
            &buf[offset..end],
            header.data_payload_uncompressed_size as usize,
        )?;
        if data_buf.len() != header.data_payload_uncompressed_size as usize {
            return Err(MeboError::SizeMismatch {
                expected: header.data_payload_uncompressed_size as usize,
                actual: data_buf.len(),
            });
        }

        let deltas: Vec<u32> = index.iter().map(|e| e.offset_delta).collect();
        let abs_offsets = prefix_sum_offsets(&deltas);

        Ok(TextDecoder {
            header,
            index,
            names,
            data_buf,
            abs_offsets,
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

    pub fn has_tag(&self) -> bool {
        self.header.flag.has_tag
    }

    pub fn metric_names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    pub fn metric_id_at(&self, metric_index: usize) -> Option<u64> {
        self.index.get(metric_index).map(|e| e.metric_id)
    }

    pub fn point_count_at(&self, metric_index: usize) -> Option<u16> {
        self.index.get(metric_index).map(|e| e.count)
    }

    pub fn find_by_id(&self, id: u64) -> Option<usize> {
        self.index.iter().position(|e| e.metric_id == id)
    }

    pub fn index_entries(&self) -> &[TextIndexEntry] {
        &self.index
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<usize>> {
        if let Some(names) = &self.names {
            return Ok(names.iter().position(|n| n == name));
        }
        let id = hash_metric_name(name);
        Ok(self.find_by_id(id))
    }

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

    pub fn raw_size(&self) -> u64 {
        self.header.data_payload_uncompressed_size as u64
    }

    pub fn compressed_size(&self) -> u64 {
        self.header.data_payload_compressed_size as u64
    }

    pub fn compression_ratio(&self) -> f64 {
        let compressed = self.compressed_size();
        if compressed == 0 {
            return 1.0;
        }
        self.raw_size() as f64 / compressed as f64
    }

    fn data_slice(&self, metric_index: usize) -> Result<&[u8]> {
        let offset = *self.abs_offsets.get(metric_index).ok_or(MeboError::InvalidOffset {
            offset: 0,
            len: self.data_buf.len(),
        })? as usize;
        if offset > self.data_buf.len() {
            return Err(MeboError::InvalidOffset {
                offset,
                len: self.data_buf.len(),
            });
        }
        Ok(&self.data_buf[offset..])
    }

    /// Decode every row for one metric, in order.
    pub fn rows_for(&self, metric_index: usize) -> Result<Vec<TextRow>> {
        let count = self.point_count_at(metric_index).ok_or(MeboError::InvalidOffset {
            offset: metric_index,
            len: self.index.len(),
        })? as usize;
        let buf = self.data_slice(metric_index)?;
        let mut rows = Vec::with_capacity(count);
        let mut offset = 0;
        for _ in 0..count {
            let row = payload::decode_text_row(
                buf,
                offset,
                self.header.start_time_us,
                self.header.flag.has_tag,
                self.header.flag.ts_encoding,
                self.header.flag.endian,
            )?;
            offset = row.next_offset;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Decode a single row. O(point_index): rows are variable-length so
    /// every preceding row in the metric must be walked.
    pub fn row_at(&self, metric_index: usize, point_index: usize) -> Result<Option<TextRow>> {
        let count = self.point_count_at(metric_index).ok_or(MeboError::InvalidOffset {
            offset: metric_index,
            len: self.index.len(),
        })? as usize;
        if point_index >= count {
            return Ok(None);
        }
        let buf = self.data_slice(metric_index)?;
        let mut offset = 0;
        let mut row = None;
        for _ in 0..=point_index {
            row = Some(payload::decode_text_row(
                buf,
                offset,
                self.header.start_time_us,
                self.header.flag.has_tag,
                self.header.flag.ts_encoding,
                self.header.flag.endian,
            )?);
            offset = row.as_ref().unwrap().next_offset;
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{EncoderOptions, TextEncoder};
    use crate::flags::CompressionCodec;

    struct NoopCompression;
    impl Compression for NoopCompression {
        fn compress(&self, _codec: CompressionCodec, raw: &[u8]) -> Result<Vec<u8>> {
            Ok(raw.to_vec())
        }
        fn decompress(&self, _codec: CompressionCodec, compressed: &[u8], _expected_size: usize) -> Result<Vec<u8>> {
            Ok(compressed.to_vec())
        }
    }

    fn build_sample() -> Vec<u8> {
        let mut enc = TextEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(1, 2).unwrap();
        enc.add_data_point(0, "up", None).unwrap();
        enc.add_data_point(1, "down", None).unwrap();
        enc.end_metric().unwrap();
        enc.finish(&NoopCompression).unwrap()
    }

    #[test]
    fn open_and_read_back_rows() {
        let bytes = build_sample();
        let decoder = TextDecoder::open(&bytes, &NoopCompression).unwrap();
        assert_eq!(decoder.metric_count(), 1);
        let rows = decoder.rows_for(0).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, "up");
        assert_eq!(rows[1].value, "down");
    }

    #[test]
    fn row_at_matches_full_decode() {
        let bytes = build_sample();
        let decoder = TextDecoder::open(&bytes, &NoopCompression).unwrap();
        let row0 = decoder.row_at(0, 0).unwrap().unwrap();
        let row1 = decoder.row_at(0, 1).unwrap().unwrap();
        assert_eq!(row0.value, "up");
        assert_eq!(row1.value, "down");
        assert!(decoder.row_at(0, 2).unwrap().is_none());
    }

    #[test]
    fn find_by_id() {
        let bytes = build_sample();
        let decoder = TextDecoder::open(&bytes, &NoopCompression).unwrap();
        assert_eq!(decoder.find_by_id(1), Some(0));
        assert_eq!(decoder.find_by_id(99), None);
    }

    #[test]
    fn collision_roundtrip_emits_and_reads_names() {
        let mut enc = TextEncoder::new(0, EncoderOptions::default());
        enc.start_metric_name("metric.a", 1).unwrap();
        enc.add_data_point(0, "up", None).unwrap();
        enc.end_metric().unwrap();
        let id_a = crate::hash::hash_metric_name("metric.a");
        enc.debug_force_alias("metric.a", id_a);
        enc.start_metric_name("metric.b", 1).unwrap();
        enc.add_data_point(1, "down", None).unwrap();
        enc.end_metric().unwrap();
        let bytes = enc.finish(&NoopCompression).unwrap();
        let decoder = TextDecoder::open(&bytes, &NoopCompression).unwrap();
        assert_eq!(decoder.metric_names(), Some(&["metric.a".to_string(), "metric.b".to_string()][..]));
    }

    #[test]
    fn corrupted_name_fails_hash_verification() {
        let mut enc = TextEncoder::new(0, EncoderOptions::default());
        enc.start_metric_name("metric.a", 1).unwrap();
        enc.add_data_point(0, "up", None).unwrap();
        enc.end_metric().unwrap();
        let id_a = crate::hash::hash_metric_name("metric.a");
        enc.debug_force_alias("metric.a", id_a);
        enc.start_metric_name("metric.b", 1).unwrap();
        enc.add_data_point(1, "down", None).unwrap();
        enc.end_metric().unwrap();
        let mut bytes = enc.finish(&NoopCompression).unwrap();

        let pos = bytes
            .windows(b"metric.b".len())
            .position(|w| w == b"metric.b")
            .expect("names payload contains metric.b");
        bytes[pos + b"metric.b".len() - 1] = b'c';

        let err = TextDecoder::open(&bytes, &NoopCompression).unwrap_err();
        assert!(matches!(err, MeboError::MetricNameVerificationFailed { .. }));
    }
}
