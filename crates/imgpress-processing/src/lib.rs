//! Imgpress Processing Library
//!
//! Decoding of raw uploads and encoding into the target codecs, plus the
//! conversion unit that turns one staged input into one converted artifact.

pub mod compression;
pub mod conversion;

pub use compression::ImageCompressor;
pub use conversion::{ConversionCause, ConversionError, Converter, ImageConverter};
