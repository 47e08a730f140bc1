//! Tiny inline previews shown while the full thumbnail loads.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::{self, FilterType};
use image::{ImageFormat, ImageReader, RgbImage};

use super::errors::ThumbnailError;

/// Width of the blur preview in pixels. Height keeps the aspect ratio.
pub const BLUR_WIDTH: u32 = 10;

/// Gaussian sigma applied after downscaling.
pub const BLUR_SIGMA: f32 = 1.0;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Downscale `bytes` to [`BLUR_WIDTH`], blur it and encode the JPEG as a
/// `data:` URL.
pub fn blur_data_url(bytes: &[u8]) -> Result<String, ThumbnailError> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ThumbnailError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

    let height = scaled_height(img.width(), img.height());
    let small = img
        .resize_exact(BLUR_WIDTH, height, FilterType::Triangle)
        .into_rgb8();

    let mut buffer = Vec::new();
    soften(&small)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

    Ok(format!("{DATA_URL_PREFIX}{}", STANDARD.encode(&buffer)))
}

fn soften(preview: &RgbImage) -> RgbImage {
    imageops::blur(preview, BLUR_SIGMA)
}

fn scaled_height(width: u32, height: u32) -> u32 {
    if width == 0 {
        return 1;
    }
    let scaled = (u64::from(height) * u64::from(BLUR_WIDTH)).div_ceil(u64::from(width));
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("encode sample png");
    buffer
}
