//! Test fixtures: encoded images and upload forms.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// A gradient PNG of the given dimensions.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbaImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = Rgba([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8, 255]);
    }
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("Failed to encode PNG fixture");
    buffer
}

pub fn image_part(file_name: &str, data: Vec<u8>) -> Part {
    Part::bytes(data)
        .file_name(file_name.to_string())
        .mime_type("image/png")
}

/// Upload form with the given files and optional quality/format fields.
pub fn upload_form(
    files: Vec<(&str, Vec<u8>)>,
    quality: Option<&str>,
    format: Option<&str>,
) -> MultipartForm {
    let mut form = MultipartForm::new();
    for (name, data) in files {
        form = form.add_part("images", image_part(name, data));
    }
    if let Some(quality) = quality {
        form = form.add_text("quality", quality.to_string());
    }
    if let Some(format) = format {
        form = form.add_text("format", format.to_string());
    }
    form
}
