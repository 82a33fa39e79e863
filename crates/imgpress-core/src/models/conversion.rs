//! Conversion domain models
//!
//! Types shared by the conversion unit, the batch orchestrator and the
//! presentation layer: the target codec, the per-batch configuration and the
//! per-file outcome with its size metrics.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Quality used when the client omits it or sends something that is not an integer.
pub const DEFAULT_QUALITY: u8 = 70;

/// Upper bound of the quality scale (lower bound is 0).
pub const MAX_QUALITY: u8 = 100;

/// Extensions recognised as converted artifacts in the results directory.
pub const CONVERTED_EXTENSIONS: [&str; 4] = ["webp", "avif", "jpeg", "jpg"];

/// Base name used when an upload carries no usable file stem.
const FALLBACK_BASE_NAME: &str = "image";

/// Characters kept verbatim in a public path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// Codec a batch is converted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    WebP,
    Avif,
    Jpeg,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported target format: {0}")]
pub struct UnsupportedFormat(pub String);

impl TargetFormat {
    pub const ALL: [TargetFormat; 3] = [TargetFormat::WebP, TargetFormat::Avif, TargetFormat::Jpeg];

    /// File extension of converted artifacts (also the wire name of the format)
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::WebP => "webp",
            TargetFormat::Avif => "avif",
            TargetFormat::Jpeg => "jpeg",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "webp" => Ok(TargetFormat::WebP),
            "avif" => Ok(TargetFormat::Avif),
            "jpeg" | "jpg" => Ok(TargetFormat::Jpeg),
            _ => Err(UnsupportedFormat(s.to_string())),
        }
    }
}

/// Target format as requested by the client.
///
/// Unknown names are kept so that lenient batches can hand them to the
/// conversion unit, which then fails the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedFormat {
    Supported(TargetFormat),
    Unsupported(String),
}

impl RequestedFormat {
    /// Missing or blank input selects the default format (webp).
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => RequestedFormat::Supported(TargetFormat::default()),
            Some(name) => match name.parse::<TargetFormat>() {
                Ok(format) => RequestedFormat::Supported(format),
                Err(_) => RequestedFormat::Unsupported(name.to_string()),
            },
        }
    }

    pub fn supported(&self) -> Option<TargetFormat> {
        match self {
            RequestedFormat::Supported(format) => Some(*format),
            RequestedFormat::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for RequestedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestedFormat::Supported(format) => format.fmt(f),
            RequestedFormat::Unsupported(name) => f.write_str(name),
        }
    }
}

/// Untrusted configuration fields exactly as they arrived with the upload form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConversionConfig {
    pub format: Option<String>,
    pub quality: Option<String>,
}

/// Normalize a client-supplied quality.
///
/// The leading integer of the input is used (`"80abc"` is 80, `"12.5"` is
/// 12). Input without one yields [`DEFAULT_QUALITY`]; integers outside
/// `0..=100` are clamped.
pub fn parse_quality(raw: Option<&str>) -> u8 {
    raw.and_then(leading_integer)
        .map(|q| q.clamp(0, MAX_QUALITY as i64) as u8)
        .unwrap_or(DEFAULT_QUALITY)
}

/// Optionally signed digit run at the start of `s`, after leading whitespace.
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    // Overlong digit runs saturate; the caller clamps anyway
    let value = rest[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * value)
}

/// Immutable per-batch configuration applied uniformly to every item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    format: RequestedFormat,
    quality: u8,
}

impl ConversionConfig {
    pub fn new(format: TargetFormat, quality: u8) -> Self {
        Self {
            format: RequestedFormat::Supported(format),
            quality: quality.min(MAX_QUALITY),
        }
    }

    pub fn from_raw(raw: &RawConversionConfig) -> Self {
        Self {
            format: RequestedFormat::from_raw(raw.format.as_deref()),
            quality: parse_quality(raw.quality.as_deref()),
        }
    }

    pub fn format(&self) -> &RequestedFormat {
        &self.format
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self::new(TargetFormat::default(), DEFAULT_QUALITY)
    }
}

/// Result of converting one staged input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionOutcome {
    pub original_name: String,
    pub converted_name: String,
    pub original_size_bytes: u64,
    pub converted_size_bytes: u64,
    /// Signed; negative when the converted file is larger than the original
    pub compression_ratio_percent: f64,
    pub public_path: String,
}

impl ConversionOutcome {
    pub fn original_size_mb(&self) -> String {
        format_megabytes(self.original_size_bytes)
    }

    pub fn converted_size_mb(&self) -> String {
        format_megabytes(self.converted_size_bytes)
    }

    pub fn compression_ratio_display(&self) -> String {
        format!("{:.1}", self.compression_ratio_percent)
    }
}

/// `(original - converted) / original * 100`, rounded to one decimal.
pub fn compression_ratio_percent(original_size: u64, converted_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    let ratio = (original_size as f64 - converted_size as f64) / original_size as f64 * 100.0;
    (ratio * 10.0).round() / 10.0
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0 / 1024.0)
}

/// `<stem>.<ext>` for a client-supplied file name.
///
/// Directory components are stripped so the result always names a file
/// directly inside the results directory.
pub fn converted_file_name(original_name: &str, extension: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .map(|name| {
            Path::new(name)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
        })
        .filter(|stem| !stem.is_empty() && *stem != "." && *stem != "..")
        .unwrap_or(FALLBACK_BASE_NAME);
    format!("{}.{}", base, extension)
}

/// Relative download path of a converted file, e.g. `/uploads/photo.webp`.
pub fn public_path(prefix: &str, file_name: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        utf8_percent_encode(file_name, PATH_SEGMENT)
    )
}

/// Whether a file name carries one of the converted-artifact extensions.
///
/// The match is case-sensitive: `a.JPG` is not a converted artifact.
pub fn has_converted_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| CONVERTED_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}
