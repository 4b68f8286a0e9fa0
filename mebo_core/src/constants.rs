//! Hard limits from the data model.

/// Metric count ≤ 65 536 per blob.
pub const MAX_METRIC_COUNT: usize = 65_536;

/// Per-metric point count ≤ 65 535 (fits a `u16`).
pub const MAX_POINTS_PER_METRIC: usize = 65_535;

/// Max bytes per text value / tag (single-byte length prefix).
pub const MAX_TEXT_LEN: usize = 255;
