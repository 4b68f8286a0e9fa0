//! Per-metric columnar payload encode/decode for numeric blobs, and
//! per-point row encode/decode for text blobs.
//!
//! Each function operates on one metric's full points at a time — the
//! encoder buffers a metric's points in `InMetric` and hands the whole
//! slice here at `end_metric`, then compresses the gathered payload in one
//! call rather than incrementally.

use crate::byteorder::Endian;
use crate::errors::{MeboError, Result};
use crate::flags::{TimestampEncoding, ValueEncoding};
use crate::gorilla;
use crate::varint::{read_zigzag_varint, write_zigzag_varint};

// ── Timestamp column (numeric blobs) ────────────────────────────────────

pub fn encode_timestamps(
    timestamps: &[i64],
    start_time_us: i64,
    encoding: TimestampEncoding,
    endian: Endian,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(timestamps.len() * 8);
    match encoding {
        TimestampEncoding::Raw => {
            for &ts in timestamps {
                endian.write_i64(&mut out, ts);
            }
        }
        TimestampEncoding::Delta => {
            for &ts in timestamps {
                write_zigzag_varint(&mut out, ts - start_time_us);
            }
        }
    }
    out
}

pub fn decode_timestamps(
    buf: &[u8],
    count: usize,
    start_time_us: i64,
    encoding: TimestampEncoding,
    endian: Endian,
) -> Result<Vec<i64>> {
    let mut out = Vec::with_capacity(count);
    match encoding {
        TimestampEncoding::Raw => {
            if buf.len() < count * 8 {
                return Err(MeboError::InsufficientData {
                    needed: count * 8,
                    offset: 0,
                    len: buf.len(),
                });
            }
            for i in 0..count {
                out.push(endian.read_i64(&buf[i * 8..]));
            }
        }
        TimestampEncoding::Delta => {
            let mut pos = 0;
            for _ in 0..count {
                let delta = read_zigzag_varint(buf, &mut pos).ok_or(MeboError::InsufficientData {
                    needed: pos + 1,
                    offset: pos,
                    len: buf.len(),
                })?;
                out.push(start_time_us + delta);
            }
        }
    }
    Ok(out)
}

/// Random access to a single timestamp without materializing the column.
/// O(1) for `Raw`, O(index) for `Delta` (must walk the varint stream).
pub fn timestamp_at(
    buf: &[u8],
    index: usize,
    start_time_us: i64,
    encoding: TimestampEncoding,
    endian: Endian,
) -> Option<i64> {
    match encoding {
        TimestampEncoding::Raw => {
            let offset = index * 8;
            if offset + 8 > buf.len() {
                return None;
            }
            Some(endian.read_i64(&buf[offset..]))
        }
        TimestampEncoding::Delta => {
            let mut pos = 0;
            let mut delta = None;
            for _ in 0..=index {
                delta = read_zigzag_varint(buf, &mut pos);
                delta?;
            }
            delta.map(|d| start_time_us + d)
        }
    }
}

// ── Value column (numeric blobs) ────────────────────────────────────────

pub fn encode_values(values: &[f64], encoding: ValueEncoding, endian: Endian) -> Vec<u8> {
    match encoding {
        ValueEncoding::Raw => {
            let mut out = Vec::with_capacity(values.len() * 8);
            for &v in values {
                endian.write_f64(&mut out, v);
            }
            out
        }
        ValueEncoding::Gorilla => gorilla::encode(values),
    }
}

pub fn decode_values(buf: &[u8], count: usize, encoding: ValueEncoding, endian: Endian) -> Result<Vec<f64>> {
    match encoding {
        ValueEncoding::Raw => {
            if buf.len() < count * 8 {
                return Err(MeboError::InsufficientData {
                    needed: count * 8,
                    offset: 0,
                    len: buf.len(),
                });
            }
            let mut out = Vec::with_capacity(count);
            for i in 0..count {
                out.push(endian.read_f64(&buf[i * 8..]));
            }
            Ok(out)
        }
        ValueEncoding::Gorilla => gorilla::decode(buf, count).ok_or(MeboError::InsufficientData {
            needed: 0,
            offset: 0,
            len: buf.len(),
        }),
    }
}

/// Random access to a single value. O(1) for `Raw` (fixed 8-byte stride);
/// for `Gorilla` this decodes the prefix up to `index` (O(index)), since
/// the bitstream is only self-synchronizing sequentially.
pub fn value_at(buf: &[u8], index: usize, encoding: ValueEncoding, endian: Endian) -> Option<f64> {
    match encoding {
        ValueEncoding::Raw => {
            let offset = index * 8;
            if offset + 8 > buf.len() {
                return None;
            }
            Some(endian.read_f64(&buf[offset..]))
        }
        ValueEncoding::Gorilla => gorilla::decode(buf, index + 1)?.pop(),
    }
}

// ── Tag column (numeric blobs: independent payload) ─────────────────────

/// Length-prefixed (1 byte) UTF-8 tags, concatenated in point order.
pub fn encode_tags(tags: &[String]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for tag in tags {
        let bytes = tag.as_bytes();
        if bytes.len() > 255 {
            return Err(MeboError::TagTooLong(bytes.len()));
        }
        out.push(bytes.len() as u8);
        out.extend_from_slice(bytes);
    }
    Ok(out)
}

pub fn decode_tags(buf: &[u8], count: usize) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(count);
    let mut pos = 0;
    for _ in 0..count {
        let (tag, next) = read_length_prefixed_string(buf, pos)?;
        out.push(tag);
        pos = next;
    }
    Ok(out)
}

/// Random access to a single tag. O(index): tag records are variable-length
/// so every preceding tag must be skipped.
pub fn tag_at(buf: &[u8], count: usize, index: usize) -> Option<String> {
    if index >= count {
        return None;
    }
    let mut pos = 0;
    for i in 0..=index {
        let (tag, next) = read_length_prefixed_string(buf, pos).ok()?;
        if i == index {
            return Some(tag);
        }
        pos = next;
    }
    None
}

fn read_length_prefixed_string(buf: &[u8], pos: usize) -> Result<(String, usize)> {
    if pos >= buf.len() {
        return Err(MeboError::InsufficientData {
            needed: pos + 1,
            offset: pos,
            len: buf.len(),
        });
    }
    let len = buf[pos] as usize;
    let start = pos + 1;
    let end = start + len;
    if end > buf.len() {
        return Err(MeboError::InsufficientData {
            needed: end,
            offset: start,
            len: buf.len(),
        });
    }
    let s = std::str::from_utf8(&buf[start..end])
        .map_err(|_| MeboError::InsufficientData {
            needed: end,
            offset: start,
            len: buf.len(),
        })?
        .to_string();
    Ok((s, end))
}

// ── Text blob rows: (timestamp | value | tag?) interleaved ──────────────

/// Append one text row to `out`. `tag` is only written when `has_tag` is
/// set on the blob — callers pass an empty string when tags are
/// disabled so the row shape stays uniform within a blob.
pub fn encode_text_row(
    out: &mut Vec<u8>,
    ts: i64,
    start_time_us: i64,
    value: &str,
    tag: Option<&str>,
    encoding: TimestampEncoding,
    endian: Endian,
) -> Result<()> {
    match encoding {
        TimestampEncoding::Delta => {
            write_zigzag_varint(out, ts - start_time_us);
        }
        TimestampEncoding::Raw => {
            out.push(8u8);
            endian.write_i64(out, ts);
        }
    }

    let value_bytes = value.as_bytes();
    if value_bytes.len() > 255 {
        return Err(MeboError::TextTooLong(value_bytes.len()));
    }
    out.push(value_bytes.len() as u8);
    out.extend_from_slice(value_bytes);

    if let Some(tag) = tag {
        let tag_bytes = tag.as_bytes();
        if tag_bytes.len() > 255 {
            return Err(MeboError::TagTooLong(tag_bytes.len()));
        }
        out.push(tag_bytes.len() as u8);
        out.extend_from_slice(tag_bytes);
    }

    Ok(())
}

/// Decoded text row plus the byte offset immediately after it.
pub struct TextRow {
    pub timestamp: i64,
    pub value: String,
    pub tag: Option<String>,
    pub next_offset: usize,
}

/// Decode one row starting at `buf[offset]`.
pub fn decode_text_row(
    buf: &[u8],
    offset: usize,
    start_time_us: i64,
    has_tag: bool,
    encoding: TimestampEncoding,
    endian: Endian,
) -> Result<TextRow> {
    let mut pos = offset;

    let timestamp = match encoding {
        TimestampEncoding::Delta => {
            let delta = read_zigzag_varint(buf, &mut pos).ok_or(MeboError::InsufficientData {
                needed: pos + 1,
                offset: pos,
                len: buf.len(),
            })?;
            start_time_us + delta
        }
        TimestampEncoding::Raw => {
            if pos >= buf.len() {
                return Err(MeboError::InsufficientData {
                    needed: pos + 1,
                    offset: pos,
                    len: buf.len(),
                });
            }
            let len = buf[pos] as usize;
            pos += 1;
            if len != 8 || pos + 8 > buf.len() {
                return Err(MeboError::InsufficientData {
                    needed: pos + 8,
                    offset: pos,
                    len: buf.len(),
                });
            }
            let ts = endian.read_i64(&buf[pos..]);
            pos += 8;
            ts
        }
    };

    let (value, next_pos) = read_length_prefixed_string(buf, pos)?;
    pos = next_pos;

    let tag = if has_tag {
        let (tag, next_pos) = read_length_prefixed_string(buf, pos)?;
        pos = next_pos;
        Some(tag)
    } else {
        None
    };

    Ok(TextRow {
        timestamp,
        value,
        tag,
        next_offset: pos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_raw_roundtrip() {
        let ts = vec![1_000_000i64, 2_000_000, 3_000_000];
        let encoded = encode_timestamps(&ts, 0, TimestampEncoding::Raw, Endian::Little);
        assert_eq!(encoded.len(), 24);
        let decoded = decode_timestamps(&encoded, 3, 0, TimestampEncoding::Raw, Endian::Little).unwrap();
        assert_eq!(decoded, ts);
    }

    #[test]
    fn timestamp_delta_roundtrip_and_out_of_order() {
        let start = 1_700_000_000_000_000i64;
        let ts = vec![start, start - 500, start + 1_000_000, start + 999_999];
        let encoded = encode_timestamps(&ts, start, TimestampEncoding::Delta, Endian::Little);
        let decoded =
            decode_timestamps(&encoded, ts.len(), start, TimestampEncoding::Delta, Endian::Little).unwrap();
        assert_eq!(decoded, ts);
    }

    #[test]
    fn timestamp_delta_is_smaller_than_raw_for_regular_series() {
        let start = 0i64;
        let ts: Vec<i64> = (0..100).map(|i| start + i * 1_000_000).collect();
        let raw = encode_timestamps(&ts, start, TimestampEncoding::Raw, Endian::Little);
        let delta = encode_timestamps(&ts, start, TimestampEncoding::Delta, Endian::Little);
        assert!((delta.len() as f64) <= 0.7 * (raw.len() as f64));
    }

    #[test]
    fn timestamp_at_matches_decode_for_both_encodings() {
        let start = 10i64;
        let ts = vec![10i64, 20, 5, 1000];
        for encoding in [TimestampEncoding::Raw, TimestampEncoding::Delta] {
            let encoded = encode_timestamps(&ts, start, encoding, Endian::Little);
            for (i, &expected) in ts.iter().enumerate() {
                assert_eq!(
                    timestamp_at(&encoded, i, start, encoding, Endian::Little),
                    Some(expected)
                );
            }
            assert_eq!(timestamp_at(&encoded, 99, start, encoding, Endian::Little), None);
        }
    }

    #[test]
    fn value_raw_roundtrip_and_random_access() {
        let values = vec![1.5, -2.25, 0.0, 100.125];
        let encoded = encode_values(&values, ValueEncoding::Raw, Endian::Little);
        let decoded = decode_values(&encoded, values.len(), ValueEncoding::Raw, Endian::Little).unwrap();
        assert_eq!(decoded, values);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(value_at(&encoded, i, ValueEncoding::Raw, Endian::Little), Some(v));
        }
    }

    #[test]
    fn value_gorilla_roundtrip_and_random_access() {
        let values = vec![1.0, 1.0, 2.5, 2.5, 2.5, 9.75];
        let encoded = encode_values(&values, ValueEncoding::Gorilla, Endian::Little);
        let decoded = decode_values(&encoded, values.len(), ValueEncoding::Gorilla, Endian::Little).unwrap();
        assert_eq!(decoded, values);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(
                value_at(&encoded, i, ValueEncoding::Gorilla, Endian::Little),
                Some(v)
            );
        }
    }

    #[test]
    fn tag_roundtrip_and_random_access() {
        let tags = vec!["a".to_string(), "bb".to_string(), "".to_string(), "ccc".to_string()];
        let encoded = encode_tags(&tags).unwrap();
        let decoded = decode_tags(&encoded, tags.len()).unwrap();
        assert_eq!(decoded, tags);
        for (i, tag) in tags.iter().enumerate() {
            assert_eq!(tag_at(&encoded, tags.len(), i).as_deref(), Some(tag.as_str()));
        }
        assert_eq!(tag_at(&encoded, tags.len(), 99), None);
    }

    #[test]
    fn tag_too_long_is_rejected() {
        let tags = vec!["x".repeat(256)];
        let err = encode_tags(&tags).unwrap_err();
        assert_eq!(err, MeboError::TagTooLong(256));
    }

    #[test]
    fn text_row_roundtrip_delta() {
        let start = 1000i64;
        let mut buf = Vec::new();
        encode_text_row(&mut buf, 1500, start, "value0", Some("a"), TimestampEncoding::Delta, Endian::Little)
            .unwrap();
        let row = decode_text_row(&buf, 0, start, true, TimestampEncoding::Delta, Endian::Little).unwrap();
        assert_eq!(row.timestamp, 1500);
        assert_eq!(row.value, "value0");
        assert_eq!(row.tag.as_deref(), Some("a"));
        assert_eq!(row.next_offset, buf.len());
    }

    #[test]
    fn text_row_roundtrip_raw_no_tag() {
        let start = 0i64;
        let mut buf = Vec::new();
        encode_text_row(&mut buf, 42, start, "hello", None, TimestampEncoding::Raw, Endian::Big).unwrap();
        let row = decode_text_row(&buf, 0, start, false, TimestampEncoding::Raw, Endian::Big).unwrap();
        assert_eq!(row.timestamp, 42);
        assert_eq!(row.value, "hello");
        assert_eq!(row.tag, None);
    }

    #[test]
    fn text_row_multiple_rows_sequential_decode() {
        let start = 0i64;
        let mut buf = Vec::new();
        encode_text_row(&mut buf, 1, start, "v1", Some("t1"), TimestampEncoding::Delta, Endian::Little).unwrap();
        encode_text_row(&mut buf, 2, start, "v2", Some("t2"), TimestampEncoding::Delta, Endian::Little).unwrap();
        let row1 = decode_text_row(&buf, 0, start, true, TimestampEncoding::Delta, Endian::Little).unwrap();
        let row2 =
            decode_text_row(&buf, row1.next_offset, start, true, TimestampEncoding::Delta, Endian::Little).unwrap();
        assert_eq!(row1.value, "v1");
        assert_eq!(row2.value, "v2");
        assert_eq!(row2.next_offset, buf.len());
    }

    #[test]
    fn text_value_too_long_is_rejected() {
        let mut buf = Vec::new();
        let err = encode_text_row(&mut buf, 0, 0, &"x".repeat(300), None, TimestampEncoding::Delta, Endian::Little)
            .unwrap_err();
        assert_eq!(err, MeboError::TextTooLong(300));
    }
}
