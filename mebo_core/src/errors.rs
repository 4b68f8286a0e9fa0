//! Named error taxonomy for encoder, decoder, and config failures.
//!
//! Every fallible operation in this crate returns `Result<T, MeboError>`
//! rather than an opaque string so callers can match on failure kind (e.g.
//! retry on `HashCollision`, surface `MetricNotEnded` as a caller bug).

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum MeboError {
    // ── Encoder-input errors ────────────────────────────────────────────
    #[error("invalid metric id: must be non-zero")]
    InvalidMetricID,

    #[error("invalid metric name: must not be empty")]
    InvalidMetricName,

    #[error("invalid number of data points: {0} (must be 1..=65535)")]
    InvalidNumOfDataPoints(usize),

    #[error("metric count exceeded 65536")]
    MaxMetricCountExceeded,

    #[error("metric already started: {0}")]
    MetricAlreadyStarted(String),

    #[error("mixed identifier mode: encoder already committed to {0}")]
    MixedIdentifierMode(&'static str),

    #[error("no metric started")]
    NoMetricStarted,

    #[error("too many data points: claimed {claimed}, attempted to add point {attempted}")]
    TooManyDataPoints { claimed: usize, attempted: usize },

    #[error("mismatched lengths: timestamps={ts}, values={val}, tags={tag:?}")]
    MismatchedLengths {
        ts: usize,
        val: usize,
        tag: Option<usize>,
    },

    #[error("no data points added before end_metric")]
    NoDataPointsAdded,

    #[error("data point count mismatch: claimed {claimed}, added {added}")]
    DataPointCountMismatch { claimed: usize, added: usize },

    #[error("metric not ended before finish")]
    MetricNotEnded,

    #[error("no metrics added before finish")]
    NoMetricsAdded,

    #[error("text value too long: {0} bytes (max 255)")]
    TextTooLong(usize),

    #[error("tag too long: {0} bytes (max 255)")]
    TagTooLong(usize),

    #[error("hash collision on id mode: id {0:#018x} already used")]
    HashCollision(u64),

    /// Implied by the `Finished` state in the encoder state machine: once
    /// `finish` has produced bytes, every further call is rejected.
    #[error("encoder already finished")]
    EncoderFinished,

    // ── Encoder-config errors ───────────────────────────────────────────
    #[error("invalid timestamp encoding: {0}")]
    InvalidTimestampEncoding(String),

    #[error("invalid value encoding: {0}")]
    InvalidValueEncoding(String),

    #[error("invalid compression: {0}")]
    InvalidCompression(String),

    #[error("gorilla encoding is not supported for timestamps")]
    GorillaNotSupportedForTimestamps,

    // ── Decoder errors ──────────────────────────────────────────────────
    #[error("invalid header size: need at least {needed} bytes, got {got}")]
    InvalidHeaderSize { needed: usize, got: usize },

    #[error("invalid metric names count: header says {expected}, payload has {actual}")]
    InvalidMetricNamesCount { expected: u32, actual: u32 },

    #[error("insufficient data: need {needed} bytes at offset {offset}, buffer is {len} bytes")]
    InsufficientData {
        needed: usize,
        offset: usize,
        len: usize,
    },

    #[error("invalid offset: {offset} exceeds buffer length {len}")]
    InvalidOffset { offset: usize, len: usize },

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Mirrors `DecompressionFailed` symmetrically: a codec binding
    /// (`mebo_codecs`) can in principle fail on the compress side too.
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("metric name verification failed for {name:?}: expected id {expected:#018x}, hashed to {actual:#018x}")]
    MetricNameVerificationFailed {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("unsupported timestamp encoding code {0}")]
    UnsupportedTimestampEncoding(u8),

    // ── Blob-set errors ──────────────────────────────────────────────────
    /// A blob set's constructor rejects an empty input.
    #[error("blob set must contain at least one blob")]
    EmptyBlobSet,
}

pub type Result<T> = std::result::Result<T, MeboError>;
