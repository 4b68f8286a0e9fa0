//! Numeric blob encoder: a small start/add/end state machine.

use std::collections::HashSet;

use log::debug;

use crate::compression::Compression;
use crate::constants::{MAX_METRIC_COUNT, MAX_POINTS_PER_METRIC};
use crate::encoder::options::EncoderOptions;
use crate::errors::{MeboError, Result};
use crate::flags::FlagWord;
use crate::hash::CollisionTracker;
use crate::header::{NumericHeader, FORMAT_VERSION, NUMERIC_HEADER_SIZE};
use crate::index::{deltas_from_absolute, NumericIndexEntry};
use crate::payload;
use crate::varint::write_uvarint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentifierMode {
    Id,
    Name,
}

impl IdentifierMode {
    fn name(self) -> &'static str {
        match self {
            IdentifierMode::Id => "id",
            IdentifierMode::Name => "name",
        }
    }
}

struct InMetric {
    id: u64,
    claimed: usize,
    timestamps: Vec<i64>,
    values: Vec<f64>,
    tags: Vec<String>,
}

struct MetricRecord {
    id: u64,
    count: u16,
    timestamps: Vec<i64>,
    values: Vec<f64>,
    tags: Vec<String>,
}

/// Streaming builder for numeric (float64) blobs.
///
/// See module docs for the full state machine. A single instance
/// is meant to be used once: `start_metric_*` → `add_data_point*` →
/// `end_metric`, repeated per metric, then `finish`.
pub struct NumericEncoder {
    start_time_us: i64,
    options: EncoderOptions,
    mode: Option<IdentifierMode>,
    finished: bool,
    metrics: Vec<MetricRecord>,
    used_ids: HashSet<u64>,
    collision_tracker: CollisionTracker,
    current: Option<InMetric>,
}

impl NumericEncoder {
    pub fn new(start_time_us: i64, options: EncoderOptions) -> Self {
        NumericEncoder {
            start_time_us,
            options,
            mode: None,
            finished: false,
            metrics: Vec::new(),
            used_ids: HashSet::new(),
            collision_tracker: CollisionTracker::new(),
            current: None,
        }
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn start_time_us(&self) -> i64 {
        self.start_time_us
    }

    fn check_can_start(&self, count: usize) -> Result<()> {
        if self.finished {
            return Err(MeboError::EncoderFinished);
        }
        if self.current.is_some() {
            return Err(MeboError::MetricAlreadyStarted(format!("{:#018x}", self.current.as_ref().unwrap().id)));
        }
        if !(1..=MAX_POINTS_PER_METRIC).contains(&count) {
            return Err(MeboError::InvalidNumOfDataPoints(count));
        }
        if self.metrics.len() >= MAX_METRIC_COUNT {
            return Err(MeboError::MaxMetricCountExceeded);
        }
        Ok(())
    }

    /// Start a metric identified by a caller-supplied 64-bit ID ("ID mode").
    pub fn start_metric_id(&mut self, id: u64, count: usize) -> Result<()> {
        self.check_can_start(count)?;
        if id == 0 {
            return Err(MeboError::InvalidMetricID);
        }
        match self.mode {
            None => self.mode = Some(IdentifierMode::Id),
            Some(IdentifierMode::Name) => {
                return Err(MeboError::MixedIdentifierMode(IdentifierMode::Name.name()))
            }
            Some(IdentifierMode::Id) => {}
        }
        if !self.used_ids.insert(id) {
            return Err(MeboError::HashCollision(id));
        }
        debug!("numeric encoder: start_metric_id({id:#018x}, {count})");
        self.current = Some(InMetric {
            id,
            claimed: count,
            timestamps: Vec::with_capacity(count),
            values: Vec::with_capacity(count),
            tags: Vec::with_capacity(count),
        });
        Ok(())
    }

    /// Start a metric identified by name ("name mode"); the name is hashed
    /// to a 64-bit ID via [`crate::hash::hash_metric_name`].
    pub fn start_metric_name(&mut self, name: &str, count: usize) -> Result<()> {
        self.check_can_start(count)?;
        if name.is_empty() {
            return Err(MeboError::InvalidMetricName);
        }
        match self.mode {
            None => self.mode = Some(IdentifierMode::Name),
            Some(IdentifierMode::Id) => {
                return Err(MeboError::MixedIdentifierMode(IdentifierMode::Id.name()))
            }
            Some(IdentifierMode::Name) => {}
        }
        let id = self.collision_tracker.start(name)?;
        debug!("numeric encoder: start_metric_name({name:?} -> {id:#018x}, {count})");
        self.current = Some(InMetric {
            id,
            claimed: count,
            timestamps: Vec::with_capacity(count),
            values: Vec::with_capacity(count),
            tags: Vec::with_capacity(count),
        });
        Ok(())
    }

    /// Test-seam: force the next `start_metric_name` of a given name to
    /// collide with a previously started name's id, to deterministically
    /// exercise the real-hash-collision path (scenario S2 in the seed
    /// suite) without depending on finding an actual xxh3 collision.
    #[cfg(any(test, feature = "test-seams"))]
    pub fn debug_force_alias(&mut self, existing_name: &str, id: u64) {
        self.collision_tracker.force_alias(existing_name, id);
    }

    pub fn add_data_point(&mut self, ts: i64, val: f64, tag: Option<&str>) -> Result<()> {
        let in_metric = self.current.as_mut().ok_or(MeboError::NoMetricStarted)?;
        if in_metric.timestamps.len() >= in_metric.claimed {
            return Err(MeboError::TooManyDataPoints {
                claimed: in_metric.claimed,
                attempted: in_metric.timestamps.len() + 1,
            });
        }
        if let Some(tag) = tag {
            if tag.len() > 255 {
                return Err(MeboError::TagTooLong(tag.len()));
            }
        }
        in_metric.timestamps.push(ts);
        in_metric.values.push(val);
        in_metric.tags.push(tag.unwrap_or("").to_string());
        Ok(())
    }

    pub fn add_data_points(&mut self, ts: &[i64], val: &[f64], tag: Option<&[&str]>) -> Result<()> {
        if ts.len() != val.len() || tag.map_or(false, |t| t.len() != ts.len()) {
            return Err(MeboError::MismatchedLengths {
                ts: ts.len(),
                val: val.len(),
                tag: tag.map(|t| t.len()),
            });
        }
        if ts.is_empty() {
            return Ok(());
        }
        let in_metric = self.current.as_ref().ok_or(MeboError::NoMetricStarted)?;
        let remaining = in_metric.claimed - in_metric.timestamps.len();
        if ts.len() > remaining {
            return Err(MeboError::TooManyDataPoints {
                claimed: in_metric.claimed,
                attempted: in_metric.timestamps.len() + ts.len(),
            });
        }
        for i in 0..ts.len() {
            self.add_data_point(ts[i], val[i], tag.map(|t| t[i]))?;
        }
        Ok(())
    }

    pub fn end_metric(&mut self) -> Result<()> {
        let in_metric = self.current.take().ok_or(MeboError::NoMetricStarted)?;
        if in_metric.timestamps.is_empty() {
            // Put it back so the caller can still inspect/retry.
            self.current = Some(in_metric);
            return Err(MeboError::NoDataPointsAdded);
        }
        if in_metric.timestamps.len() != in_metric.claimed {
            let added = in_metric.timestamps.len();
            let claimed = in_metric.claimed;
            self.current = Some(in_metric);
            return Err(MeboError::DataPointCountMismatch { claimed, added });
        }
        debug!(
            "numeric encoder: end_metric({:#018x}, {} points)",
            in_metric.id,
            in_metric.timestamps.len()
        );
        self.metrics.push(MetricRecord {
            id: in_metric.id,
            count: in_metric.timestamps.len() as u16,
            timestamps: in_metric.timestamps,
            values: in_metric.values,
            tags: in_metric.tags,
        });
        Ok(())
    }

    /// Produce the final blob bytes. Does not mutate `self` beyond marking
    /// it finished — all header state is computed on a local copy.
    pub fn finish(&mut self, compression: &dyn Compression) -> Result<Vec<u8>> {
        if self.finished {
            return Err(MeboError::EncoderFinished);
        }
        if self.current.is_some() {
            return Err(MeboError::MetricNotEnded);
        }
        if self.metrics.is_empty() {
            return Err(MeboError::NoMetricsAdded);
        }

        let endian = self.options.endian;
        let ts_encoding = self.options.resolved_timestamp_encoding()?;
        let value_encoding = self.options.value_encoding;

        // Empty-tag optimization: clear has_tag if every appended
        // tag, across every metric, was empty.
        let any_nonempty_tag = self.options.tags_enabled
            && self
                .metrics
                .iter()
                .any(|m| m.tags.iter().any(|t| !t.is_empty()));
        let has_tag = any_nonempty_tag;
        let has_metric_names = self.collision_tracker.has_collision();

        let flag = FlagWord {
            endian,
            ts_encoding,
            value_encoding,
            ts_compression: self.options.timestamp_compression,
            value_compression: self.options.value_compression,
            has_tag,
            has_metric_names,
        };

        // ── Optional metric-names payload ───────────────────────────────
        let mut names_payload = Vec::new();
        if has_metric_names {
            let names = self.collision_tracker.ordered_names();
            let mut body = Vec::new();
            for name in names {
                write_uvarint(&mut body, name.len() as u64);
                body.extend_from_slice(name.as_bytes());
            }
            write_uvarint(&mut names_payload, body.len() as u64);
            names_payload.extend_from_slice(&body);
        }

        // ── Index (offsets patched in below) ────────────────────────────
        let mut ts_abs_offsets = Vec::with_capacity(self.metrics.len());
        let mut val_abs_offsets = Vec::with_capacity(self.metrics.len());
        let mut tag_abs_offsets = Vec::with_capacity(self.metrics.len());

        let mut ts_payload = Vec::new();
        let mut val_payload = Vec::new();
        let mut tag_payload = Vec::new();

        for m in &self.metrics {
            ts_abs_offsets.push(ts_payload.len() as u64);
            ts_payload.extend(payload::encode_timestamps(
                &m.timestamps,
                self.start_time_us,
                ts_encoding,
                endian,
            ));

            val_abs_offsets.push(val_payload.len() as u64);
            val_payload.extend(payload::encode_values(&m.values, value_encoding, endian));

            if has_tag {
                tag_abs_offsets.push(tag_payload.len() as u64);
                tag_payload.extend(payload::encode_tags(&m.tags)?);
            }
        }

        let ts_deltas = deltas_from_absolute(&ts_abs_offsets);
        let val_deltas = deltas_from_absolute(&val_abs_offsets);
        let tag_deltas = if has_tag {
            deltas_from_absolute(&tag_abs_offsets)
        } else {
            Vec::new()
        };

        let index_entries: Vec<NumericIndexEntry> = self
            .metrics
            .iter()
            .enumerate()
            .map(|(i, m)| NumericIndexEntry {
                metric_id: m.id,
                count: m.count,
                ts_offset_delta: ts_deltas[i],
                val_offset_delta: val_deltas[i],
                tag_offset_delta: if has_tag { tag_deltas[i] } else { 0 },
            })
            .collect();

        let mut index_bytes = Vec::new();
        for entry in &index_entries {
            entry.write(&mut index_bytes, endian, has_tag);
        }

        // ── Compress payloads ────────────────────────────────────────────
        let ts_compressed = compression.compress(flag.ts_compression, &ts_payload)?;
        let val_compressed = compression.compress(flag.value_compression, &val_payload)?;
        // Tags share the value payload's compression slot; numeric blobs
        // have no dedicated tag-compression flag bit.
        let tag_compressed = if has_tag {
            compression.compress(flag.value_compression, &tag_payload)?
        } else {
            Vec::new()
        };

        // ── Lay out absolute offsets ─────────────────────────────────────
        let names_offset = if has_metric_names {
            NUMERIC_HEADER_SIZE as u32
        } else {
            0
        };
        let index_offset = NUMERIC_HEADER_SIZE as u32 + names_payload.len() as u32;
        let ts_offset = index_offset + index_bytes.len() as u32;
        let val_offset = ts_offset + ts_compressed.len() as u32;
        let tag_offset = val_offset + val_compressed.len() as u32;

        let header = NumericHeader {
            version: FORMAT_VERSION,
            start_time_us: self.start_time_us,
            flag,
            metric_count: self.metrics.len() as u32,
            names_payload_offset: names_offset,
            names_payload_size: names_payload.len() as u32,
            index_offset,
            ts_payload_offset: ts_offset,
            ts_payload_compressed_size: ts_compressed.len() as u32,
            ts_payload_uncompressed_size: ts_payload.len() as u32,
            val_payload_offset: val_offset,
            val_payload_compressed_size: val_compressed.len() as u32,
            val_payload_uncompressed_size: val_payload.len() as u32,
            tag_payload_offset: if has_tag { tag_offset } else { 0 },
            tag_payload_compressed_size: tag_compressed.len() as u32,
            tag_payload_uncompressed_size: tag_payload.len() as u32,
        };

        let mut out = header.to_bytes();
        out.extend_from_slice(&names_payload);
        out.extend_from_slice(&index_bytes);
        out.extend_from_slice(&ts_compressed);
        out.extend_from_slice(&val_compressed);
        out.extend_from_slice(&tag_compressed);

        self.finished = true;
        debug!(
            "numeric encoder: finish() -> {} metrics, {} bytes",
            header.metric_count,
            out.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Compression;
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

    #[test]
    fn id_mode_basic_flow() {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(1, 2).unwrap();
        enc.add_data_point(0, 1.0, None).unwrap();
        enc.add_data_point(1, 2.0, None).unwrap();
        enc.end_metric().unwrap();
        assert_eq!(enc.metric_count(), 1);
        let bytes = enc.finish(&NoopCompression).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn mixing_id_and_name_mode_fails() {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(1, 1).unwrap();
        enc.add_data_point(0, 1.0, None).unwrap();
        enc.end_metric().unwrap();
        let err = enc.start_metric_name("cpu", 1).unwrap_err();
        assert_eq!(err, MeboError::MixedIdentifierMode("id"));
    }

    #[test]
    fn duplicate_id_is_hash_collision() {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(12345, 1).unwrap();
        enc.add_data_point(0, 1.0, None).unwrap();
        enc.end_metric().unwrap();
        let err = enc.start_metric_id(12345, 1).unwrap_err();
        assert_eq!(err, MeboError::HashCollision(12345));
        assert!(format!("{err}").contains("0x0000000000003039"));
    }

    #[test]
    fn zero_id_is_rejected() {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default());
        assert_eq!(enc.start_metric_id(0, 1).unwrap_err(), MeboError::InvalidMetricID);
    }

    #[test]
    fn invalid_count_is_rejected() {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default());
        assert_eq!(
            enc.start_metric_id(1, 0).unwrap_err(),
            MeboError::InvalidNumOfDataPoints(0)
        );
        assert_eq!(
            enc.start_metric_id(1, 70_000).unwrap_err(),
            MeboError::InvalidNumOfDataPoints(70_000)
        );
    }

    #[test]
    fn too_many_points_is_rejected() {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(1, 1).unwrap();
        enc.add_data_point(0, 1.0, None).unwrap();
        let err = enc.add_data_point(1, 2.0, None).unwrap_err();
        assert_eq!(err, MeboError::TooManyDataPoints { claimed: 1, attempted: 2 });
    }

    #[test]
    fn end_metric_before_enough_points_fails() {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(1, 2).unwrap();
        enc.add_data_point(0, 1.0, None).unwrap();
        let err = enc.end_metric().unwrap_err();
        assert_eq!(err, MeboError::DataPointCountMismatch { claimed: 2, added: 1 });
        // Encoder stays in-metric so the caller can add the missing point.
        enc.add_data_point(1, 2.0, None).unwrap();
        enc.end_metric().unwrap();
    }

    #[test]
    fn finish_without_ending_metric_fails() {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(1, 1).unwrap();
        enc.add_data_point(0, 1.0, None).unwrap();
        assert_eq!(enc.finish(&NoopCompression).unwrap_err(), MeboError::MetricNotEnded);
    }

    #[test]
    fn finish_with_no_metrics_fails() {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default());
        assert_eq!(enc.finish(&NoopCompression).unwrap_err(), MeboError::NoMetricsAdded);
    }

    #[test]
    fn header_is_stable_after_finish() {
        let mut enc = NumericEncoder::new(1000, EncoderOptions::default());
        enc.start_metric_id(1, 1).unwrap();
        enc.add_data_point(1000, 1.0, None).unwrap();
        enc.end_metric().unwrap();
        let metric_count_before = enc.metric_count();
        let start_before = enc.start_time_us();
        enc.finish(&NoopCompression).unwrap();
        assert_eq!(enc.metric_count(), metric_count_before);
        assert_eq!(enc.start_time_us(), start_before);
    }

    #[test]
    fn add_data_points_batch_rejects_mismatched_lengths() {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(1, 3).unwrap();
        let err = enc
            .add_data_points(&[0, 1], &[1.0, 2.0, 3.0], None)
            .unwrap_err();
        assert_eq!(err, MeboError::MismatchedLengths { ts: 2, val: 3, tag: None });
    }

    #[test]
    fn add_data_points_batch_empty_is_noop() {
        let mut enc = NumericEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(1, 1).unwrap();
        enc.add_data_points(&[], &[], None).unwrap();
        enc.add_data_point(0, 1.0, None).unwrap();
        enc.end_metric().unwrap();
    }

    #[test]
    fn empty_tags_are_elided() {
        let opts = EncoderOptions::default().with_tags_enabled(true);
        let mut enc = NumericEncoder::new(0, opts);
        enc.start_metric_id(1, 2).unwrap();
        enc.add_data_point(0, 1.0, Some("")).unwrap();
        enc.add_data_point(1, 2.0, None).unwrap();
        enc.end_metric().unwrap();
        let bytes = enc.finish(&NoopCompression).unwrap();
        let header = NumericHeader::from_bytes(&bytes).unwrap();
        assert!(!header.flag.has_tag);
        assert_eq!(header.tag_payload_uncompressed_size, 0);
    }
}
