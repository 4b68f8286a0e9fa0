//! One-shot materialization into flat per-metric arrays with O(1) random
//! access.

use std::collections::HashMap;

use crate::blob::set::{NumericBlobSet, TextBlobSet};
use crate::reader::{NumericReader, TextReader};

/// One metric's fully decoded columns. `tags` is always the same length as
/// `values`/`timestamps` — padded with `""` wherever no tag was present —
/// so index alignment holds regardless of whether the source blob(s) had
/// tags enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedNumericMetric {
    pub id: u64,
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
    pub tags: Vec<String>,
}

impl MaterializedNumericMetric {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at(&self, i: usize) -> (f64, bool) {
        match self.values.get(i) {
            Some(&v) => (v, true),
            None => (0.0, false),
        }
    }

    pub fn timestamp_at(&self, i: usize) -> (i64, bool) {
        match self.timestamps.get(i) {
            Some(&t) => (t, true),
            None => (0, false),
        }
    }

    /// `("", true)` when `i` is in range of the values array (tags are
    /// never a random-access error on a materialized blob), `("", false)`
    /// otherwise.
    pub fn tag_at(&self, i: usize) -> (String, bool) {
        match self.tags.get(i) {
            Some(t) => (t.clone(), true),
            None => (String::new(), false),
        }
    }
}

fn materialize_one_numeric(reader: &NumericReader, id: u64) -> MaterializedNumericMetric {
    let mut timestamps = Vec::new();
    let mut values = Vec::new();
    let mut tags = Vec::new();
    for (t, v, tag) in reader.all(id) {
        timestamps.push(t);
        values.push(v);
        tags.push(tag.unwrap_or_default());
    }
    MaterializedNumericMetric {
        id,
        timestamps,
        values,
        tags,
    }
}

pub struct MaterializedNumericBlob {
    metrics: Vec<MaterializedNumericMetric>,
    by_id: HashMap<u64, usize>,
    by_name: HashMap<String, usize>,
}

impl MaterializedNumericBlob {
    pub fn from_reader(reader: &NumericReader) -> Self {
        let ids = reader.metric_ids();
        let names = reader.metric_names().map(|n| n.to_vec());
        let metrics: Vec<_> = ids.iter().map(|&id| materialize_one_numeric(reader, id)).collect();
        let by_id = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let by_name = names
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();
        MaterializedNumericBlob { metrics, by_id, by_name }
    }

    pub fn metric(&self, id: u64) -> Option<&MaterializedNumericMetric> {
        self.by_id.get(&id).map(|&i| &self.metrics[i])
    }

    pub fn metric_by_name(&self, name: &str) -> Option<&MaterializedNumericMetric> {
        self.by_name.get(name).map(|&i| &self.metrics[i])
    }

    pub fn value_at(&self, id: u64, i: usize) -> (f64, bool) {
        self.metric(id).map(|m| m.value_at(i)).unwrap_or((0.0, false))
    }

    pub fn value_at_by_name(&self, name: &str, i: usize) -> (f64, bool) {
        self.metric_by_name(name).map(|m| m.value_at(i)).unwrap_or((0.0, false))
    }

    pub fn timestamp_at(&self, id: u64, i: usize) -> (i64, bool) {
        self.metric(id).map(|m| m.timestamp_at(i)).unwrap_or((0, false))
    }

    pub fn timestamp_at_by_name(&self, name: &str, i: usize) -> (i64, bool) {
        self.metric_by_name(name).map(|m| m.timestamp_at(i)).unwrap_or((0, false))
    }

    pub fn tag_at(&self, id: u64, i: usize) -> (String, bool) {
        self.metric(id).map(|m| m.tag_at(i)).unwrap_or((String::new(), false))
    }

    pub fn tag_at_by_name(&self, name: &str, i: usize) -> (String, bool) {
        self.metric_by_name(name)
            .map(|m| m.tag_at(i))
            .unwrap_or((String::new(), false))
    }
}

/// Materialize a single metric without decoding every other metric in the
/// blob.
pub fn materialize_metric(reader: &NumericReader, id: u64) -> Option<MaterializedNumericMetric> {
    if !reader.has_metric_id(id) {
        return None;
    }
    Some(materialize_one_numeric(reader, id))
}

/// A blob-set materialization: one metric's columns concatenated in
/// chronological blob order, with capacity pre-allocated from each blob's
/// reported length and tags padded across blobs that disagree on whether
/// tags are present.
pub fn materialize_blob_set(set: &NumericBlobSet) -> MaterializedNumericBlob {
    let mut order = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for b in set.blobs() {
        for id in b.metric_ids() {
            if seen.insert(id) {
                order.push(id);
            }
        }
    }

    let mut metrics = Vec::with_capacity(order.len());
    for &id in &order {
        let capacity = set.metric_len(id);
        let mut timestamps = Vec::with_capacity(capacity);
        let mut values = Vec::with_capacity(capacity);
        let mut tags = Vec::with_capacity(capacity);
        for (t, v, tag) in set.all(id) {
            timestamps.push(t);
            values.push(v);
            tags.push(tag.unwrap_or_default());
        }
        metrics.push(MaterializedNumericMetric { id, timestamps, values, tags });
    }
    let by_id = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    MaterializedNumericBlob {
        metrics,
        by_id,
        by_name: HashMap::new(),
    }
}

// ── Text family ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedTextMetric {
    pub id: u64,
    pub timestamps: Vec<i64>,
    pub values: Vec<String>,
    pub tags: Vec<String>,
}

impl MaterializedTextMetric {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at(&self, i: usize) -> (String, bool) {
        match self.values.get(i) {
            Some(v) => (v.clone(), true),
            None => (String::new(), false),
        }
    }

    pub fn timestamp_at(&self, i: usize) -> (i64, bool) {
        match self.timestamps.get(i) {
            Some(&t) => (t, true),
            None => (0, false),
        }
    }

    pub fn tag_at(&self, i: usize) -> (String, bool) {
        match self.tags.get(i) {
            Some(t) => (t.clone(), true),
            None => (String::new(), false),
        }
    }
}

fn materialize_one_text(reader: &TextReader, id: u64) -> MaterializedTextMetric {
    let mut timestamps = Vec::new();
    let mut values = Vec::new();
    let mut tags = Vec::new();
    for (t, v, tag) in reader.all(id) {
        timestamps.push(t);
        values.push(v);
        tags.push(tag.unwrap_or_default());
    }
    MaterializedTextMetric { id, timestamps, values, tags }
}

pub struct MaterializedTextBlob {
    metrics: Vec<MaterializedTextMetric>,
    by_id: HashMap<u64, usize>,
    by_name: HashMap<String, usize>,
}

impl MaterializedTextBlob {
    pub fn from_reader(reader: &TextReader) -> Self {
        let ids = reader.metric_ids();
        let names = reader.metric_names().map(|n| n.to_vec());
        let metrics: Vec<_> = ids.iter().map(|&id| materialize_one_text(reader, id)).collect();
        let by_id = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let by_name = names
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();
        MaterializedTextBlob { metrics, by_id, by_name }
    }

    pub fn metric(&self, id: u64) -> Option<&MaterializedTextMetric> {
        self.by_id.get(&id).map(|&i| &self.metrics[i])
    }

    pub fn metric_by_name(&self, name: &str) -> Option<&MaterializedTextMetric> {
        self.by_name.get(name).map(|&i| &self.metrics[i])
    }
}

pub fn materialize_text_metric(reader: &TextReader, id: u64) -> Option<MaterializedTextMetric> {
    if !reader.has_metric_id(id) {
        return None;
    }
    Some(materialize_one_text(reader, id))
}

pub fn materialize_text_blob_set(set: &TextBlobSet) -> MaterializedTextBlob {
    let mut order = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for b in set.blobs() {
        for id in b.metric_ids() {
            if seen.insert(id) {
                order.push(id);
            }
        }
    }

    let mut metrics = Vec::with_capacity(order.len());
    for &id in &order {
        let capacity = set.metric_len(id);
        let mut timestamps = Vec::with_capacity(capacity);
        let mut values = Vec::with_capacity(capacity);
        let mut tags = Vec::with_capacity(capacity);
        for (t, v, tag) in set.all(id) {
            timestamps.push(t);
            values.push(v);
            tags.push(tag.unwrap_or_default());
        }
        metrics.push(MaterializedTextMetric { id, timestamps, values, tags });
    }
    let by_id = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    MaterializedTextBlob {
        metrics,
        by_id,
        by_name: HashMap::new(),
    }
}
