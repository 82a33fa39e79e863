use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageReader};
use imgpress_core::models::{TargetFormat, MAX_QUALITY};
use std::io::Cursor;

/// AVIF encoder speed (1 slowest .. 10 fastest)
const AVIF_SPEED: u8 = 6;

/// Decoding and encoding of still images
pub struct ImageCompressor;

impl ImageCompressor {
    /// Decode raw bytes, sniffing the container format from the content.
    pub fn decode(data: &[u8]) -> Result<DynamicImage> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .context("Failed to read image header")?;

        if reader.format().is_none() {
            return Err(anyhow!("Unrecognized image format"));
        }

        reader.decode().context("Failed to decode image")
    }

    /// Encode an image into `format` at `quality` (0-100).
    pub fn encode(img: &DynamicImage, format: TargetFormat, quality: u8) -> Result<Bytes> {
        let quality = quality.min(MAX_QUALITY);

        let encoded = match format {
            TargetFormat::WebP => Self::encode_webp(img, quality)?,
            TargetFormat::Avif => Self::encode_avif(img, quality)?,
            TargetFormat::Jpeg => Self::encode_jpeg(img, quality)?,
        };

        tracing::trace!(
            format = %format,
            quality = quality,
            width = img.width(),
            height = img.height(),
            encoded_bytes = encoded.len(),
            "Image encoded"
        );

        Ok(encoded)
    }

    /// Encode to JPEG using mozjpeg
    fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(Bytes::from(jpeg_data))
    }

    /// Encode to lossy WebP
    fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let (width, height) = img.dimensions();

        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(quality as f32);

        Ok(Bytes::copy_from_slice(&webp_data))
    }

    /// Encode to AVIF
    fn encode_avif(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let (width, height) = img.dimensions();

        let rgb_img = img.to_rgb8();
        let rgb_data: Vec<rgb::RGB8> = rgb_img
            .as_raw()
            .chunks_exact(3)
            .map(|chunk| rgb::RGB8::new(chunk[0], chunk[1], chunk[2]))
            .collect();

        let img_buf = ravif::Img::new(rgb_data.as_slice(), width as usize, height as usize);

        // ravif only accepts quality in 1..=100
        let encoder = ravif::Encoder::new()
            .with_quality(quality.max(1) as f32)
            .with_speed(AVIF_SPEED);

        let avif_data = encoder.encode_rgb(img_buf)?;

        Ok(Bytes::from(avif_data.avif_file))
    }
}
