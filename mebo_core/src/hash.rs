//! Metric-name hashing and collision tracking.
//!
//! The hash function itself is an out-of-scope external collaborator — any
//! deterministic, well-distributed 64-bit hash qualifies. This crate binds
//! it to `xxhash-rust`'s xxh3, a fast non-cryptographic hash also suited to
//! block checksums.

use std::collections::HashMap;

use xxhash_rust::xxh3::xxh3_64;

use crate::errors::{MeboError, Result};

/// Hash a metric name to its 64-bit ID. Never returns 0 — 0 is reserved for
/// "absent" — by flipping the top bit on the vanishingly rare input
/// that hashes to exactly zero.
pub fn hash_metric_name(name: &str) -> u64 {
    let h = xxh3_64(name.as_bytes());
    if h == 0 {
        1 << 63
    } else {
        h
    }
}

/// Tracks `id -> name` assignments made during name-mode encoding and flags
/// the point at which two *different* names hash to the same ID.
///
/// - a brand-new id is recorded and the name appended to insertion order;
/// - a known id with the *same* name is a caller error (`MetricAlreadyStarted`);
/// - a known id with a *different* name is a real hash collision, which
///   forces the metric-names payload to be emitted at `finish()`.
#[derive(Debug, Default)]
pub struct CollisionTracker {
    id_to_name: HashMap<u64, String>,
    ordered_names: Vec<String>,
    has_collision: bool,
}

impl CollisionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` to a metric ID, recording it. Returns the ID to use,
    /// or `MetricAlreadyStarted` if this exact name was already started.
    pub fn start(&mut self, name: &str) -> Result<u64> {
        let id = hash_metric_name(name);
        match self.id_to_name.get(&id) {
            None => {
                self.id_to_name.insert(id, name.to_string());
                self.ordered_names.push(name.to_string());
                Ok(id)
            }
            Some(existing) if existing == name => {
                Err(MeboError::MetricAlreadyStarted(name.to_string()))
            }
            Some(_) => {
                // Real collision: two distinct names share an id. The first
                // name stays the id's canonical owner in `id_to_name`, but
                // both names are retained in `ordered_names` in the order
                // they were started.
                self.ordered_names.push(name.to_string());
                self.has_collision = true;
                Ok(id)
            }
        }
    }

    pub fn has_collision(&self) -> bool {
        self.has_collision
    }

    /// Ordered list of every name started, in insertion order. Matches the
    /// index entry order 1:1 as long as every `start` call corresponds to
    /// exactly one completed metric.
    pub fn ordered_names(&self) -> &[String] {
        &self.ordered_names
    }

    /// Test-seam: force two names to resolve to the same id, to exercise the
    /// real-collision path deterministically (S2 in the testable-properties
    /// seed suite) without depending on finding an actual xxh3 collision.
    #[cfg(any(test, feature = "test-seams"))]
    pub fn force_alias(&mut self, name: &str, id: u64) {
        self.id_to_name.entry(id).or_insert_with(|| name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_metric_name("cpu.usage"), hash_metric_name("cpu.usage"));
    }

    #[test]
    fn hash_never_zero() {
        // Can't force an actual zero-hash input deterministically without
        // reversing xxh3, but the guard itself is exercised directly.
        assert_ne!(hash_metric_name(""), 0);
    }

    #[test]
    fn distinct_names_get_distinct_ids_usually() {
        assert_ne!(hash_metric_name("cpu.usage"), hash_metric_name("memory.usage"));
    }

    #[test]
    fn same_name_twice_is_metric_already_started() {
        let mut tracker = CollisionTracker::new();
        tracker.start("cpu.usage").unwrap();
        let err = tracker.start("cpu.usage").unwrap_err();
        assert_eq!(err, MeboError::MetricAlreadyStarted("cpu.usage".to_string()));
    }

    #[test]
    fn forced_alias_is_detected_as_real_collision() {
        let mut tracker = CollisionTracker::new();
        let id_a = tracker.start("metric.a").unwrap();
        // Simulate a real hash collision: force "metric.b" to hash to id_a.
        let mut tracker2 = CollisionTracker::new();
        tracker2.force_alias("metric.a", id_a);
        let id_b = tracker2.start("metric.b").unwrap();
        assert_eq!(id_a, id_b);
        assert!(tracker2.has_collision());
        assert_eq!(tracker2.ordered_names(), &["metric.a", "metric.b"]);
    }

    #[test]
    fn no_collision_by_default() {
        let mut tracker = CollisionTracker::new();
        tracker.start("a").unwrap();
        tracker.start("b").unwrap();
        assert!(!tracker.has_collision());
        assert_eq!(tracker.ordered_names(), &["a", "b"]);
    }
}
