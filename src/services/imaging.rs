//! Sticker image normalization.
//!
//! | Step | Operation |
//! |------|-----------|
//! | Crop | center square of the shorter side (`DynamicImage::crop_imm`) |
//! | Primary | lossy WebP, quality 80 |
//! | Thumbnail | 128x128 `Lanczos3` resize of the square, lossy WebP, quality 70 |

use image::{imageops::FilterType, DynamicImage, GenericImageView};

use crate::error::{AppError, AppResult};

pub const PRIMARY_QUALITY: f32 = 80.0;
pub const THUMBNAIL_QUALITY: f32 = 70.0;
pub const THUMBNAIL_SIDE: u32 = 128;

pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub data: Vec<u8>,
    pub thumbnail: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub size_kb: i32,
}

pub fn is_accepted_content_type(content_type: &str) -> bool {
    ACCEPTED_CONTENT_TYPES.contains(&content_type)
}

/// Center-crops to a square, re-encodes as WebP and derives a thumbnail.
pub fn normalize(data: &[u8]) -> AppResult<NormalizedImage> {
    let img = image::load_from_memory(data).map_err(|e| AppError::Decode(e.to_string()))?;

    let square = crop_to_square(&img);
    let (width, height) = square.dimensions();
    let primary = encode_webp(&square, PRIMARY_QUALITY)?;

    let thumb = square.resize_exact(THUMBNAIL_SIDE, THUMBNAIL_SIDE, FilterType::Lanczos3);
    let thumbnail = encode_webp(&thumb, THUMBNAIL_QUALITY)?;

    Ok(NormalizedImage {
        size_kb: size_in_kb(primary.len()),
        data: primary,
        thumbnail,
        width,
        height,
    })
}

fn crop_to_square(img: &DynamicImage) -> DynamicImage {
    let (width, height) = img.dimensions();
    let side = width.min(height);
    let x = (width - side) / 2;
    let y = (height - side) / 2;
    img.crop_imm(x, y, side, side)
}

// libwebp only takes 8-bit RGB(A) buffers.
fn encode_webp(img: &DynamicImage, quality: f32) -> AppResult<Vec<u8>> {
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    let encoder = webp::Encoder::from_image(&rgba)
        .map_err(|e| AppError::Decode(format!("WebP encode failed: {}", e)))?;
    Ok(encoder.encode(quality).to_vec())
}

fn size_in_kb(bytes: usize) -> i32 {
    (bytes as f64 / 1024.0).round() as i32
}
