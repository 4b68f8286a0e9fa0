//! Text blob encoder: the row-based sibling of [`crate::encoder::numeric`].

use std::collections::HashSet;

use log::debug;

use crate::compression::Compression;
use crate::constants::{MAX_METRIC_COUNT, MAX_POINTS_PER_METRIC};
use crate::encoder::options::EncoderOptions;
use crate::errors::{MeboError, Result};
use crate::flags::{CompressionCodec, FlagWord};
use crate::hash::CollisionTracker;
use crate::header::{TextHeader, FORMAT_VERSION, TEXT_HEADER_SIZE};
use crate::index::{deltas_from_absolute, TextIndexEntry};
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
    values: Vec<String>,
    tags: Vec<String>,
}

struct MetricRecord {
    id: u64,
    count: u16,
    timestamps: Vec<i64>,
    values: Vec<String>,
    tags: Vec<String>,
}

/// Streaming builder for text (UTF-8 string) blobs. Rows are laid out
/// (timestamp, value, tag?) per point rather than columnar, since string
/// values have no fixed stride to exploit (see module docs).
pub struct TextEncoder {
    start_time_us: i64,
    options: EncoderOptions,
    mode: Option<IdentifierMode>,
    finished: bool,
    metrics: Vec<MetricRecord>,
    used_ids: HashSet<u64>,
    collision_tracker: CollisionTracker,
    current: Option<InMetric>,
}

impl TextEncoder {
    pub fn new(start_time_us: i64, options: EncoderOptions) -> Self {
        TextEncoder {
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
            return Err(MeboError::MetricAlreadyStarted(format!(
                "{:#018x}",
                self.current.as_ref().unwrap().id
            )));
        }
        if !(1..=MAX_POINTS_PER_METRIC).contains(&count) {
            return Err(MeboError::InvalidNumOfDataPoints(count));
        }
        if self.metrics.len() >= MAX_METRIC_COUNT {
            return Err(MeboError::MaxMetricCountExceeded);
        }
        Ok(())
    }

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
        debug!("text encoder: start_metric_id({id:#018x}, {count})");
        self.current = Some(InMetric {
            id,
            claimed: count,
            timestamps: Vec::with_capacity(count),
            values: Vec::with_capacity(count),
            tags: Vec::with_capacity(count),
        });
        Ok(())
    }

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
        debug!("text encoder: start_metric_name({name:?} -> {id:#018x}, {count})");
        self.current = Some(InMetric {
            id,
            claimed: count,
            timestamps: Vec::with_capacity(count),
            values: Vec::with_capacity(count),
            tags: Vec::with_capacity(count),
        });
        Ok(())
    }

    #[cfg(any(test, feature = "test-seams"))]
    pub fn debug_force_alias(&mut self, existing_name: &str, id: u64) {
        self.collision_tracker.force_alias(existing_name, id);
    }

    pub fn add_data_point(&mut self, ts: i64, val: &str, tag: Option<&str>) -> Result<()> {
        let in_metric = self.current.as_mut().ok_or(MeboError::NoMetricStarted)?;
        if in_metric.timestamps.len() >= in_metric.claimed {
            return Err(MeboError::TooManyDataPoints {
                claimed: in_metric.claimed,
                attempted: in_metric.timestamps.len() + 1,
            });
        }
        if val.len() > 255 {
            return Err(MeboError::TextTooLong(val.len()));
        }
        if let Some(tag) = tag {
            if tag.len() > 255 {
                return Err(MeboError::TagTooLong(tag.len()));
            }
        }
        in_metric.timestamps.push(ts);
        in_metric.values.push(val.to_string());
        in_metric.tags.push(tag.unwrap_or("").to_string());
        Ok(())
    }

    pub fn add_data_points(&mut self, ts: &[i64], val: &[&str], tag: Option<&[&str]>) -> Result<()> {
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
            "text encoder: end_metric({:#018x}, {} points)",
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
            value_encoding: crate::flags::ValueEncoding::Raw,
            ts_compression: CompressionCodec::None,
            value_compression: self.options.data_compression,
            has_tag,
            has_metric_names,
        };

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

        let mut data_payload = Vec::new();
        let mut abs_offsets = Vec::with_capacity(self.metrics.len());
        for m in &self.metrics {
            abs_offsets.push(data_payload.len() as u64);
            for i in 0..m.timestamps.len() {
                let tag = if has_tag { Some(m.tags[i].as_str()) } else { None };
                payload::encode_text_row(
                    &mut data_payload,
                    m.timestamps[i],
                    self.start_time_us,
                    &m.values[i],
                    tag,
                    ts_encoding,
                    endian,
                )?;
            }
        }

        let offset_deltas = deltas_from_absolute(&abs_offsets);
        let index_entries: Vec<TextIndexEntry> = self
            .metrics
            .iter()
            .enumerate()
            .map(|(i, m)| TextIndexEntry {
                metric_id: m.id,
                count: m.count,
                offset_delta: offset_deltas[i],
            })
            .collect();

        let mut index_bytes = Vec::new();
        for entry in &index_entries {
            entry.write(&mut index_bytes, endian);
        }

        let data_compressed = compression.compress(flag.value_compression, &data_payload)?;

        let names_offset = if has_metric_names {
            TEXT_HEADER_SIZE as u32
        } else {
            0
        };
        let index_offset = TEXT_HEADER_SIZE as u32 + names_payload.len() as u32;
        let data_offset = index_offset + index_bytes.len() as u32;

        let header = TextHeader {
            version: FORMAT_VERSION,
            start_time_us: self.start_time_us,
            flag,
            metric_count: self.metrics.len() as u32,
            names_payload_offset: names_offset,
            names_payload_size: names_payload.len() as u32,
            index_offset,
            data_payload_offset: data_offset,
            data_payload_compressed_size: data_compressed.len() as u32,
            data_payload_uncompressed_size: data_payload.len() as u32,
        };

        let mut out = header.to_bytes();
        out.extend_from_slice(&names_payload);
        out.extend_from_slice(&index_bytes);
        out.extend_from_slice(&data_compressed);

        self.finished = true;
        debug!(
            "text encoder: finish() -> {} metrics, {} bytes",
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
    use crate::flags::CompressionCodec as Codec;

    struct NoopCompression;
    impl Compression for NoopCompression {
        fn compress(&self, _codec: Codec, raw: &[u8]) -> Result<Vec<u8>> {
            Ok(raw.to_vec())
        }
        fn decompress(&self, _codec: Codec, compressed: &[u8], _expected_size: usize) -> Result<Vec<u8>> {
            Ok(compressed.to_vec())
        }
    }

    #[test]
    fn id_mode_basic_flow() {
        let mut enc = TextEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(1, 2).unwrap();
        enc.add_data_point(0, "up", None).unwrap();
        enc.add_data_point(1, "down", None).unwrap();
        enc.end_metric().unwrap();
        assert_eq!(enc.metric_count(), 1);
        let bytes = enc.finish(&NoopCompression).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn name_mode_multiple_metrics() {
        let mut enc = TextEncoder::new(0, EncoderOptions::default());
        enc.start_metric_name("service.status", 1).unwrap();
        enc.add_data_point(0, "ok", None).unwrap();
        enc.end_metric().unwrap();
        enc.start_metric_name("deploy.phase", 2).unwrap();
        enc.add_data_point(0, "build", None).unwrap();
        enc.add_data_point(1, "deploy", None).unwrap();
        enc.end_metric().unwrap();
        assert_eq!(enc.metric_count(), 2);
        enc.finish(&NoopCompression).unwrap();
    }

    #[test]
    fn value_too_long_is_rejected() {
        let mut enc = TextEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(1, 1).unwrap();
        let err = enc.add_data_point(0, &"x".repeat(300), None).unwrap_err();
        assert_eq!(err, MeboError::TextTooLong(300));
    }

    #[test]
    fn empty_tags_are_elided() {
        let opts = EncoderOptions::default().with_tags_enabled(true);
        let mut enc = TextEncoder::new(0, opts);
        enc.start_metric_id(1, 2).unwrap();
        enc.add_data_point(0, "a", Some("")).unwrap();
        enc.add_data_point(1, "b", None).unwrap();
        enc.end_metric().unwrap();
        let bytes = enc.finish(&NoopCompression).unwrap();
        let header = TextHeader::from_bytes(&bytes).unwrap();
        assert!(!header.flag.has_tag);
    }

    #[test]
    fn mixing_id_and_name_mode_fails() {
        let mut enc = TextEncoder::new(0, EncoderOptions::default());
        enc.start_metric_id(1, 1).unwrap();
        enc.add_data_point(0, "a", None).unwrap();
        enc.end_metric().unwrap();
        let err = enc.start_metric_name("x", 1).unwrap_err();
        assert_eq!(err, MeboError::MixedIdentifierMode("id"));
    }

    #[test]
    fn finish_with_no_metrics_fails() {
        let mut enc = TextEncoder::new(0, EncoderOptions::default());
        assert_eq!(enc.finish(&NoopCompression).unwrap_err(), MeboError::NoMetricsAdded);
    }
}
