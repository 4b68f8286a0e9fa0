//! Per-metric index entries.
//!
//! Offsets are stored as deltas from the previous entry's offset (the first
//! entry's delta equals its absolute offset) so that mostly-monotonic,
//! similarly-sized metrics compress well when the index itself is run
//! through a general-purpose compressor upstream of this crate. Absolute
//! offsets are recovered by prefix-summing on decode.

use crate::byteorder::Endian;
use crate::errors::{MeboError, Result};

/// One metric's locator in a numeric blob's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumericIndexEntry {
    pub metric_id: u64,
    pub count: u16,
    /// Delta from the previous entry's absolute timestamp-payload offset.
    pub ts_offset_delta: u32,
    /// Delta from the previous entry's absolute value-payload offset.
    pub val_offset_delta: u32,
    /// Delta from the previous entry's absolute tag-payload offset.
    /// Only present on the wire when the blob's `has_tag` flag is set.
    pub tag_offset_delta: u32,
}

impl NumericIndexEntry {
    pub fn wire_size(has_tag: bool) -> usize {
        if has_tag {
            8 + 2 + 4 + 4 + 4
        } else {
            8 + 2 + 4 + 4
        }
    }

    pub fn write(&self, out: &mut Vec<u8>, endian: Endian, has_tag: bool) {
        endian.write_u64(out, self.metric_id);
        endian.write_u16(out, self.count);
        endian.write_u32(out, self.ts_offset_delta);
        endian.write_u32(out, self.val_offset_delta);
        if has_tag {
            endian.write_u32(out, self.tag_offset_delta);
        }
    }

    pub fn read(buf: &[u8], endian: Endian, has_tag: bool) -> Result<Self> {
        let needed = Self::wire_size(has_tag);
        if buf.len() < needed {
            return Err(MeboError::InsufficientData {
                needed,
                offset: 0,
                len: buf.len(),
            });
        }
        Ok(NumericIndexEntry {
            metric_id: endian.read_u64(&buf[0..8]),
            count: endian.read_u16(&buf[8..10]),
            ts_offset_delta: endian.read_u32(&buf[10..14]),
            val_offset_delta: endian.read_u32(&buf[14..18]),
            tag_offset_delta: if has_tag {
                endian.read_u32(&buf[18..22])
            } else {
                0
            },
        })
    }
}

/// One metric's locator in a text blob's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextIndexEntry {
    pub metric_id: u64,
    pub count: u16,
    /// Delta from the previous entry's absolute data-payload offset.
    pub offset_delta: u32,
}

impl TextIndexEntry {
    pub const WIRE_SIZE: usize = 8 + 2 + 4;

    pub fn write(&self, out: &mut Vec<u8>, endian: Endian) {
        endian.write_u64(out, self.metric_id);
        endian.write_u16(out, self.count);
        endian.write_u32(out, self.offset_delta);
    }

    pub fn read(buf: &[u8], endian: Endian) -> Result<Self> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(MeboError::InsufficientData {
                needed: Self::WIRE_SIZE,
                offset: 0,
                len: buf.len(),
            });
        }
        Ok(TextIndexEntry {
            metric_id: endian.read_u64(&buf[0..8]),
            count: endian.read_u16(&buf[8..10]),
            offset_delta: endian.read_u32(&buf[10..14]),
        })
    }
}

/// Recover absolute offsets from a sequence of deltas: `abs[0] = delta[0]`,
/// `abs[i] = abs[i-1] + delta[i]`.
pub fn prefix_sum_offsets(deltas: &[u32]) -> Vec<u64> {
    let mut out = Vec::with_capacity(deltas.len());
    let mut running: u64 = 0;
    for &d in deltas {
        running += d as u64;
        out.push(running);
    }
    out
}

/// Turn a sequence of absolute, non-decreasing offsets into deltas from the
/// previous offset (the inverse of [`prefix_sum_offsets`]).
pub fn deltas_from_absolute(offsets: &[u64]) -> Vec<u32> {
    let mut out = Vec::with_capacity(offsets.len());
    let mut prev: u64 = 0;
    for &abs in offsets {
        out.push((abs - prev) as u32);
        prev = abs;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_delta_roundtrip() {
        let absolute = vec![0u64, 40, 64];
        let deltas = deltas_from_absolute(&absolute);
        assert_eq!(deltas, vec![0, 40, 24]);
        assert_eq!(prefix_sum_offsets(&deltas), absolute);
    }

    #[test]
    fn numeric_entry_roundtrip_without_tag() {
        let entry = NumericIndexEntry {
            metric_id: 0xdead_beef_0000_0001,
            count: 42,
            ts_offset_delta: 100,
            val_offset_delta: 200,
            tag_offset_delta: 0,
        };
        let mut buf = Vec::new();
        entry.write(&mut buf, Endian::Little, false);
        assert_eq!(buf.len(), NumericIndexEntry::wire_size(false));
        assert_eq!(
            NumericIndexEntry::read(&buf, Endian::Little, false).unwrap(),
            entry
        );
    }

    #[test]
    fn numeric_entry_roundtrip_with_tag() {
        let entry = NumericIndexEntry {
            metric_id: 7,
            count: 3,
            ts_offset_delta: 10,
            val_offset_delta: 20,
            tag_offset_delta: 30,
        };
        let mut buf = Vec::new();
        entry.write(&mut buf, Endian::Big, true);
        assert_eq!(buf.len(), NumericIndexEntry::wire_size(true));
        assert_eq!(
            NumericIndexEntry::read(&buf, Endian::Big, true).unwrap(),
            entry
        );
    }

    #[test]
    fn text_entry_roundtrip() {
        let entry = TextIndexEntry {
            metric_id: 99,
            count: 5,
            offset_delta: 1234,
        };
        let mut buf = Vec::new();
        entry.write(&mut buf, Endian::Little);
        assert_eq!(buf.len(), TextIndexEntry::WIRE_SIZE);
        assert_eq!(TextIndexEntry::read(&buf, Endian::Little).unwrap(), entry);
    }

    #[test]
    fn truncated_entry_is_insufficient_data() {
        let err = NumericIndexEntry::read(&[0u8; 10], Endian::Little, false).unwrap_err();
        assert!(matches!(err, MeboError::InsufficientData { .. }));
    }
}
