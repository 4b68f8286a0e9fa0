pub mod blob;
pub mod byteorder;
pub mod compression;
pub mod constants;
pub mod decoder;
pub mod encoder;
pub mod errors;
pub mod flags;
pub mod gorilla;
pub mod hash;
pub mod header;
pub mod index;
pub mod payload;
pub mod reader;
pub mod varint;

pub use blob::{MaterializedNumericBlob, MaterializedTextBlob, NumericBlobSet, TextBlobSet};
pub use byteorder::Endian;
pub use compression::Compression;
pub use decoder::{NumericDecoder, TextDecoder};
pub use encoder::{EncoderOptions, NumericEncoder, TextEncoder, TimestampEncodingOption};
pub use errors::{MeboError, Result};
pub use flags::{CompressionCodec, TimestampEncoding, ValueEncoding};
pub use header::{NumericHeader, TextHeader, FORMAT_VERSION};
pub use index::{NumericIndexEntry, TextIndexEntry};
pub use reader::{NumericReader, TextReader};
