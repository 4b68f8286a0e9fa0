//! Lazy iteration and bool-sentinel random access over a decoded text blob,
//! the row-based sibling of [`crate::reader::numeric::NumericReader`].

use crate::compression::Compression;
use crate::decoder::TextDecoder;
use crate::errors::Result;

pub type TimestampIter = std::vec::IntoIter<i64>;
pub type ValueIter = std::vec::IntoIter<String>;
pub type TagIter = std::vec::IntoIter<String>;
pub type PointIter = std::vec::IntoIter<(i64, String, Option<String>)>;

pub struct TextReader {
    decoder: TextDecoder,
}

impl TextReader {
    pub fn open(buf: &[u8], compression: &dyn Compression) -> Result<Self> {
        Ok(TextReader {
            decoder: TextDecoder::open(buf, compression)?,
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

    fn rows(&self, metric_index: Option<usize>) -> Vec<crate::payload::TextRow> {
        metric_index
            .and_then(|mi| self.decoder.rows_for(mi).ok())
            .unwrap_or_default()
    }

    pub fn all_timestamps(&self, id: u64) -> TimestampIter {
        self.rows(self.index_for_id(id))
            .into_iter()
            .map(|r| r.timestamp)
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn all_timestamps_by_name(&self, name: &str) -> TimestampIter {
        self.rows(self.index_for_name(name))
            .into_iter()
            .map(|r| r.timestamp)
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn all_values(&self, id: u64) -> ValueIter {
        self.rows(self.index_for_id(id))
            .into_iter()
            .map(|r| r.value)
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn all_values_by_name(&self, name: &str) -> ValueIter {
        self.rows(self.index_for_name(name))
            .into_iter()
            .map(|r| r.value)
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn all_tags(&self, id: u64) -> TagIter {
        self.rows(self.index_for_id(id))
            .into_iter()
            .filter_map(|r| r.tag)
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn all_tags_by_name(&self, name: &str) -> TagIter {
        self.rows(self.index_for_name(name))
            .into_iter()
            .filter_map(|r| r.tag)
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn all(&self, id: u64) -> PointIter {
        self.rows(self.index_for_id(id))
            .into_iter()
            .map(|r| (r.timestamp, r.value, r.tag))
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn all_by_name(&self, name: &str) -> PointIter {
        self.rows(self.index_for_name(name))
            .into_iter()
            .map(|r| (r.timestamp, r.value, r.tag))
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn value_at(&self, id: u64, i: usize) -> (String, bool) {
        match self.index_for_id(id).and_then(|mi| self.decoder.row_at(mi, i).ok().flatten()) {
            Some(row) => (row.value, true),
            None => (String::new(), false),
        }
    }

    pub fn value_at_by_name(&self, name: &str, i: usize) -> (String, bool) {
        match self
            .index_for_name(name)
            .and_then(|mi| self.decoder.row_at(mi, i).ok().flatten())
        {
            Some(row) => (row.value, true),
            None => (String::new(), false),
        }
    }

    pub fn timestamp_at(&self, id: u64, i: usize) -> (i64, bool) {
        match self.index_for_id(id).and_then(|mi| self.decoder.row_at(mi, i).ok().flatten()) {
            Some(row) => (row.timestamp, true),
            None => (0, false),
        }
    }

    pub fn timestamp_at_by_name(&self, name: &str, i: usize) -> (i64, bool) {
        match self
            .index_for_name(name)
            .and_then(|mi| self.decoder.row_at(mi, i).ok().flatten())
        {
            Some(row) => (row.timestamp, true),
            None => (0, false),
        }
    }

    pub fn tag_at(&self, id: u64, i: usize) -> (String, bool) {
        if !self.decoder.has_tag() {
            return (String::new(), false);
        }
        match self.index_for_id(id).and_then(|mi| self.decoder.row_at(mi, i).ok().flatten()) {
            Some(row) => match row.tag {
                Some(t) => (t, true),
                None => (String::new(), false),
            },
            None => (String::new(), false),
        }
    }

    pub fn tag_at_by_name(&self, name: &str, i: usize) -> (String, bool) {
        if !self.decoder.has_tag() {
            return (String::new(), false);
        }
        match self
            .index_for_name(name)
            .and_then(|mi| self.decoder.row_at(mi, i).ok().flatten())
        {
            Some(row) => match row.tag {
                Some(t) => (t, true),
                None => (String::new(), false),
            },
            None => (String::new(), false),
        }
    }
}
