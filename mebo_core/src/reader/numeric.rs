//! Lazy iteration and bool-sentinel random access over a decoded numeric
//! blob. Wraps [`crate::decoder::NumericDecoder`]: a returned blob is
//! already internally validated at decode time, so reader queries never
//! raise — missing metrics, out-of-range indices, and (unreachable in
//! practice) corrupted payloads all collapse to the `false`/empty sentinel.

use crate::compression::Compression;
use crate::decoder::NumericDecoder;
use crate::errors::Result;

pub type TimestampIter = std::vec::IntoIter<i64>;
pub type ValueIter = std::vec::IntoIter<f64>;
pub type TagIter = std::vec::IntoIter<String>;
pub type PointIter = std::vec::IntoIter<(i64, f64, Option<String>)>;

pub struct NumericReader {
    decoder: NumericDecoder,
}

impl NumericReader {
    pub fn open(buf: &[u8], compression: &dyn Compression) -> Result<Self> {
        Ok(NumericReader {
            decoder: NumericDecoder::open(buf, compression)?,
        })
    }

    pub fn metric_count(&self) -> usize {
        self.decoder.metric_count()
    }

    pub fn start_time(&self) -> i64 {
        self.decoder.start_time_us()
    }

    pub fn metric_ids(&self) -> Vec<u64> {
        (0..self.metric_count())
            .filter_map(|i| self.decoder.metric_id_at(i))
            .collect()
    }

    pub fn metric_names(&self) -> Option<&[String]> {
        self.decoder.metric_names()
    }

    pub fn has_metric_id(&self, id: u64) -> bool {
        self.decoder.find_by_id(id).is_some()
    }

    pub fn has_metric_name(&self, name: &str) -> bool {
        self.decoder.find_by_name(name).ok().flatten().is_some()
    }

    pub fn len(&self, id: u64) -> usize {
        self.index_for_id(id)
            .and_then(|i| self.decoder.point_count_at(i))
            .unwrap_or(0) as usize
    }

    pub fn len_by_name(&self, name: &str) -> usize {
        self.index_for_name(name)
            .and_then(|i| self.decoder.point_count_at(i))
            .unwrap_or(0) as usize
    }

    fn index_for_id(&self, id: u64) -> Option<usize> {
        self.decoder.find_by_id(id)
    }

    fn index_for_name(&self, name: &str) -> Option<usize> {
        self.decoder.find_by_name(name).ok().flatten()
    }

    pub fn all_timestamps(&self, id: u64) -> TimestampIter {
        self.index_for_id(id)
            .and_then(|i| self.decoder.timestamps_for(i).ok())
            .unwrap_or_default()
            .into_iter()
    }

    pub fn all_timestamps_by_name(&self, name: &str) -> TimestampIter {
        self.index_for_name(name)
            .and_then(|i| self.decoder.timestamps_for(i).ok())
            .unwrap_or_default()
            .into_iter()
    }

    pub fn all_values(&self, id: u64) -> ValueIter {
        self.index_for_id(id)
            .and_then(|i| self.decoder.values_for(i).ok())
            .unwrap_or_default()
            .into_iter()
    }

    pub fn all_values_by_name(&self, name: &str) -> ValueIter {
        self.index_for_name(name)
            .and_then(|i| self.decoder.values_for(i).ok())
            .unwrap_or_default()
            .into_iter()
    }

    pub fn all_tags(&self, id: u64) -> TagIter {
        self.index_for_id(id)
            .and_then(|i| self.decoder.tags_for(i).ok().flatten())
            .unwrap_or_default()
            .into_iter()
    }

    pub fn all_tags_by_name(&self, name: &str) -> TagIter {
        self.index_for_name(name)
            .and_then(|i| self.decoder.tags_for(i).ok().flatten())
            .unwrap_or_default()
            .into_iter()
    }

    pub fn all(&self, id: u64) -> PointIter {
        self.points_for(self.index_for_id(id))
    }

    pub fn all_by_name(&self, name: &str) -> PointIter {
        self.points_for(self.index_for_name(name))
    }

    fn points_for(&self, metric_index: Option<usize>) -> PointIter {
        let Some(mi) = metric_index else {
            return Vec::new().into_iter();
        };
        let ts = self.decoder.timestamps_for(mi).unwrap_or_default();
        let vals = self.decoder.values_for(mi).unwrap_or_default();
        let tags = self.decoder.tags_for(mi).ok().flatten();
        ts.into_iter()
            .zip(vals)
            .enumerate()
            .map(|(i, (t, v))| (t, v, tags.as_ref().and_then(|t| t.get(i).cloned())))
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn value_at(&self, id: u64, i: usize) -> (f64, bool) {
        match self.index_for_id(id).and_then(|mi| self.decoder.value_at(mi, i).ok().flatten()) {
            Some(v) => (v, true),
            None => (0.0, false),
        }
    }

    pub fn value_at_by_name(&self, name: &str, i: usize) -> (f64, bool) {
        match self
            .index_for_name(name)
            .and_then(|mi| self.decoder.value_at(mi, i).ok().flatten())
        {
            Some(v) => (v, true),
            None => (0.0, false),
        }
    }

    pub fn timestamp_at(&self, id: u64, i: usize) -> (i64, bool) {
        match self
            .index_for_id(id)
            .and_then(|mi| self.decoder.timestamp_at(mi, i).ok().flatten())
        {
            Some(v) => (v, true),
            None => (0, false),
        }
    }

    pub fn timestamp_at_by_name(&self, name: &str, i: usize) -> (i64, bool) {
        match self
            .index_for_name(name)
            .and_then(|mi| self.decoder.timestamp_at(mi, i).ok().flatten())
        {
            Some(v) => (v, true),
            None => (0, false),
        }
    }

    /// `("", false)` for a missing metric or out-of-range index, or when the
    /// blob has no tags at all.
    pub fn tag_at(&self, id: u64, i: usize) -> (String, bool) {
        if !self.decoder.has_tag() {
            return (String::new(), false);
        }
        match self.index_for_id(id).and_then(|mi| self.decoder.tag_at(mi, i).ok().flatten()) {
            Some(t) => (t, true),
            None => (String::new(), false),
        }
    }

    pub fn tag_at_by_name(&self, name: &str, i: usize) -> (String, bool) {
        if !self.decoder.has_tag() {
            return (String::new(), false);
        }
        match self
            .index_for_name(name)
            .and_then(|mi| self.decoder.tag_at(mi, i).ok().flatten())
        {
            Some(t) => (t, true),
            None => (String::new(), false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{EncoderOptions, NumericEncoder};
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

    fn sample() -> Vec<u8> {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default().with_tags_enabled(true));
        enc.start_metric_id(100, 3).unwrap();
        enc.add_data_point(0, 1.0, Some("a")).unwrap();
        enc.add_data_point(1, 2.0, Some("b")).unwrap();
        enc.add_data_point(2, 3.0, Some("c")).unwrap();
        enc.end_metric().unwrap();
        enc.finish(&NoopCompression).unwrap()
    }

    #[test]
    fn missing_metric_is_false_sentinel() {
        let bytes = sample();
        let reader = NumericReader::open(&bytes, &NoopCompression).unwrap();
        assert_eq!(reader.value_at(999, 0), (0.0, false));
        assert_eq!(reader.timestamp_at(999, 0), (0, false));
        assert_eq!(reader.tag_at(999, 0), (String::new(), false));
        assert_eq!(reader.all(999).collect::<Vec<_>>(), vec![]);
    }

    #[test]
    fn out_of_range_index_is_false_sentinel() {
        let bytes = sample();
        let reader = NumericReader::open(&bytes, &NoopCompression).unwrap();
        assert_eq!(reader.value_at(100, 99), (0.0, false));
    }

    #[test]
    fn sequential_and_random_access_agree() {
        let bytes = sample();
        let reader = NumericReader::open(&bytes, &NoopCompression).unwrap();
        let all_values: Vec<f64> = reader.all_values(100).collect();
        assert_eq!(all_values, vec![1.0, 2.0, 3.0]);
        for (i, &v) in all_values.iter().enumerate() {
            assert_eq!(reader.value_at(100, i), (v, true));
        }
        assert_eq!(reader.tag_at(100, 1), ("b".to_string(), true));
        assert_eq!(reader.len(100), 3);
    }

    #[test]
    fn all_yields_combined_points() {
        let bytes = sample();
        let reader = NumericReader::open(&bytes, &NoopCompression).unwrap();
        let points: Vec<_> = reader.all(100).collect();
        assert_eq!(points[1], (1, 2.0, Some("b".to_string())));
    }
}
