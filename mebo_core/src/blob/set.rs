//! Chronologically ordered collections of blobs.

use crate::errors::{MeboError, Result};
use crate::reader::{NumericReader, TextReader};

/// A chronologically sorted collection of numeric blob readers. Stable-sorts
/// by `start_time` so blobs with equal start times keep their insertion
/// order, then exposes cross-blob queries with a continuous global index.
pub struct NumericBlobSet {
    blobs: Vec<NumericReader>,
}

impl NumericBlobSet {
    pub fn new(mut blobs: Vec<NumericReader>) -> Result<Self> {
        if blobs.is_empty() {
            return Err(MeboError::EmptyBlobSet);
        }
        blobs.sort_by_key(|b| b.start_time());
        Ok(NumericBlobSet { blobs })
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    pub fn blobs(&self) -> &[NumericReader] {
        &self.blobs
    }

    pub fn metric_len(&self, id: u64) -> usize {
        self.blobs.iter().map(|b| b.len(id)).sum()
    }

    /// `last_ts - first_ts` in microseconds across every blob, 0 for a
    /// single point or an absent metric.
    pub fn metric_duration(&self, id: u64) -> i64 {
        let mut first = None;
        let mut last = None;
        for b in &self.blobs {
            for ts in b.all_timestamps(id) {
                first.get_or_insert(ts);
                last = Some(ts);
            }
        }
        match (first, last) {
            (Some(f), Some(l)) => l - f,
            _ => 0,
        }
    }

    pub fn value_at(&self, id: u64, global_index: usize) -> (f64, bool) {
        let mut remaining = global_index;
        for b in &self.blobs {
            let len = b.len(id);
            if remaining < len {
                return b.value_at(id, remaining);
            }
            remaining -= len;
        }
        (0.0, false)
    }

    pub fn timestamp_at(&self, id: u64, global_index: usize) -> (i64, bool) {
        let mut remaining = global_index;
        for b in &self.blobs {
            let len = b.len(id);
            if remaining < len {
                return b.timestamp_at(id, remaining);
            }
            remaining -= len;
        }
        (0, false)
    }

    pub fn tag_at(&self, id: u64, global_index: usize) -> (String, bool) {
        let mut remaining = global_index;
        for b in &self.blobs {
            let len = b.len(id);
            if remaining < len {
                return b.tag_at(id, remaining);
            }
            remaining -= len;
        }
        (String::new(), false)
    }

    /// Cross-blob iteration: every point for `id`, in chronological blob
    /// order. Metrics absent from a blob are silently skipped.
    pub fn all(&self, id: u64) -> impl Iterator<Item = (i64, f64, Option<String>)> + '_ {
        self.blobs.iter().flat_map(move |b| b.all(id))
    }
}

/// The text-blob sibling of [`NumericBlobSet`].
pub struct TextBlobSet {
    blobs: Vec<TextReader>,
}

impl TextBlobSet {
    pub fn new(mut blobs: Vec<TextReader>) -> Result<Self> {
        if blobs.is_empty() {
            return Err(MeboError::EmptyBlobSet);
        }
        blobs.sort_by_key(|b| b.start_time());
        Ok(TextBlobSet { blobs })
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    pub fn blobs(&self) -> &[TextReader] {
        &self.blobs
    }

    pub fn metric_len(&self, id: u64) -> usize {
        self.blobs.iter().map(|b| b.len(id)).sum()
    }

    pub fn metric_duration(&self, id: u64) -> i64 {
        let mut first = None;
        let mut last = None;
        for b in &self.blobs {
            for ts in b.all_timestamps(id) {
                first.get_or_insert(ts);
                last = Some(ts);
            }
        }
        match (first, last) {
            (Some(f), Some(l)) => l - f,
            _ => 0,
        }
    }

    pub fn value_at(&self, id: u64, global_index: usize) -> (String, bool) {
        let mut remaining = global_index;
        for b in &self.blobs {
            let len = b.len(id);
            if remaining < len {
                return b.value_at(id, remaining);
            }
            remaining -= len;
        }
        (String::new(), false)
    }

    pub fn timestamp_at(&self, id: u64, global_index: usize) -> (i64, bool) {
        let mut remaining = global_index;
        for b in &self.blobs {
            let len = b.len(id);
            if remaining < len {
                return b.timestamp_at(id, remaining);
            }
            remaining -= len;
        }
        (0, false)
    }

    pub fn tag_at(&self, id: u64, global_index: usize) -> (String, bool) {
        let mut remaining = global_index;
        for b in &self.blobs {
            let len = b.len(id);
            if remaining < len {
                return b.tag_at(id, remaining);
            }
            remaining -= len;
        }
        (String::new(), false)
    }

    pub fn all(&self, id: u64) -> impl Iterator<Item = (i64, String, Option<String>)> + '_ {
        self.blobs.iter().flat_map(move |b| b.all(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{EncoderOptions, NumericEncoder};
    use crate::flags::CompressionCodec;

    struct NoopCompression;
    impl crate::compression::Compression for NoopCompression {
        fn compress(&self, _codec: CompressionCodec, raw: &[u8]) -> Result<Vec<u8>> {
            Ok(raw.to_vec())
        }
        fn decompress(&self, _codec: CompressionCodec, compressed: &[u8], _expected_size: usize) -> Result<Vec<u8>> {
            Ok(compressed.to_vec())
        }
    }

    fn blob(start: i64, values: &[f64]) -> Vec<u8> {
        let mut enc = NumericEncoder::new(start, EncoderOptions::default());
        enc.start_metric_id(100, values.len()).unwrap();
        for (i, &v) in values.iter().enumerate() {
            enc.add_data_point(start + i as i64, v, None).unwrap();
        }
        enc.end_metric().unwrap();
        enc.finish(&NoopCompression).unwrap()
    }

    #[test]
    fn empty_set_is_rejected() {
        assert_eq!(NumericBlobSet::new(vec![]).unwrap_err(), MeboError::EmptyBlobSet);
    }

    #[test]
    fn scenario_s6_blob_set_ordering_and_global_index() {
        let hour = 3_600_000_000i64;
        let t = 1_700_000_000_000_000i64;
        let b0 = NumericReader::open(&blob(t, &[1.0, 2.0, 3.0]), &NoopCompression).unwrap();
        let b1 = NumericReader::open(&blob(t + hour, &[10.0, 20.0]), &NoopCompression).unwrap();
        let b2 = NumericReader::open(&blob(t + 2 * hour, &[100.0, 200.0, 300.0, 400.0]), &NoopCompression).unwrap();
        // Insert out of chronological order; the set must re-sort.
        let set = NumericBlobSet::new(vec![b2, b0, b1]).unwrap();
        assert_eq!(set.metric_len(100), 9);
        assert_eq!(set.value_at(100, 4), (20.0, true));
        assert_eq!(set.value_at(100, 9), (0.0, false));
    }

    #[test]
    fn metric_duration_spans_all_blobs() {
        let t = 0i64;
        let b0 = NumericReader::open(&blob(t, &[1.0, 2.0]), &NoopCompression).unwrap();
        let b1 = NumericReader::open(&blob(t + 100, &[3.0]), &NoopCompression).unwrap();
        let set = NumericBlobSet::new(vec![b0, b1]).unwrap();
        assert_eq!(set.metric_duration(100), 100);
    }
}
