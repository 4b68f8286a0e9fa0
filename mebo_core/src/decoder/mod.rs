//! Blob decoders: parse a header, decompress payload columns, and expose
//! full-materialization plus random-access reads per metric.

pub mod numeric;
pub mod text;

pub use numeric::NumericDecoder;
pub use text::TextDecoder;

use crate::errors::{MeboError, Result};
use crate::hash::hash_metric_name;
use crate::varint::read_uvarint;

/// Parse the optional metric-names payload shared by both blob families: a
/// uvarint body length followed by back-to-back `(uvarint len, utf8 bytes)`
/// name entries, in the same order as the index entries they correspond to.
pub(crate) fn parse_names_payload(buf: &[u8], offset: usize) -> Result<Vec<String>> {
    let mut pos = offset;
    let body_len = read_uvarint(buf, &mut pos).ok_or(MeboError::InsufficientData {
        needed: pos + 1,
        offset: pos,
        len: buf.len(),
    })? as usize;
    let body_end = pos + body_len;
    if body_end > buf.len() {
        return Err(MeboError::InsufficientData {
            needed: body_end,
            offset: pos,
            len: buf.len(),
        });
    }
    let mut names = Vec::new();
    while pos < body_end {
        let len = read_uvarint(buf, &mut pos).ok_or(MeboError::InsufficientData {
            needed: pos + 1,
            offset: pos,
            len: buf.len(),
        })? as usize;
        let start = pos;
        let end = start + len;
        if end > body_end {
            return Err(MeboError::InsufficientData {
                needed: end,
                offset: start,
                len: buf.len(),
            });
        }
        let name = std::str::from_utf8(&buf[start..end])
            .map_err(|_| MeboError::InsufficientData {
                needed: end,
                offset: start,
                len: buf.len(),
            })?
            .to_string();
        names.push(name);
        pos = end;
    }
    Ok(names)
}

/// Validate a decoded metric-names payload against the index it belongs to:
/// the name count must match the index length, and each name, rehashed, must
/// reproduce the id stored at its own index entry, in order. A decoder must
/// reject either inconsistency before returning a blob, so every opened
/// blob is internally consistent by construction.
pub(crate) fn validate_metric_names(names: &[String], index_ids: &[u64]) -> Result<()> {
    if names.len() != index_ids.len() {
        return Err(MeboError::InvalidMetricNamesCount {
            expected: index_ids.len() as u32,
            actual: names.len() as u32,
        });
    }
    for (name, &expected) in names.iter().zip(index_ids) {
        let actual = hash_metric_name(name);
        if actual != expected {
            return Err(MeboError::MetricNameVerificationFailed {
                name: name.clone(),
                expected,
                actual,
            });
        }
    }
    Ok(())
}
