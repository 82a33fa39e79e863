pub mod conversion;

pub use conversion::{
    compression_ratio_percent, converted_file_name, format_megabytes, has_converted_extension,
    parse_quality, public_path, ConversionConfig, ConversionOutcome, RawConversionConfig,
    RequestedFormat, TargetFormat, UnsupportedFormat, CONVERTED_EXTENSIONS, DEFAULT_QUALITY,
    MAX_QUALITY,
};
