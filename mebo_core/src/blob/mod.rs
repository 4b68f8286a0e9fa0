//! Blob sets and materializers, layered on top of the
//! readers in [`crate::reader`].

pub mod materialize;
pub mod set;

pub use materialize::{
    materialize_blob_set, materialize_metric, materialize_text_blob_set, materialize_text_metric,
    MaterializedNumericBlob, MaterializedNumericMetric, MaterializedTextBlob, MaterializedTextMetric,
};
pub use set::{NumericBlobSet, TextBlobSet};
