//! Streaming blob encoders.

pub mod numeric;
pub mod options;
pub mod text;

pub use numeric::NumericEncoder;
pub use options::{EncoderOptions, TimestampEncodingOption};
pub use text::TextEncoder;
