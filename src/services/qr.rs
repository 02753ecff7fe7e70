use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use crate::error::{AppError, AppResult};

const MODULE_PIXELS: u32 = 8;

/// Renders `text` as a PNG QR code and returns it as a `data:` URL.
pub fn qr_data_url(text: &str) -> AppResult<String> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::M)
        .map_err(|e| AppError::Qr(e.to_string()))?;

    let img = code
        .render::<Luma<u8>>()
        .module_dimensions(MODULE_PIXELS, MODULE_PIXELS)
        .quiet_zone(true)
        .build();

    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, ImageFormat::Png)
        .map_err(|e| AppError::Qr(e.to_string()))?;

    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(png.into_inner())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_png(data_url: &str) -> image::DynamicImage {
        let encoded = data_url
            .strip_prefix("data:image/png;base64,")
            .expect("png data url");
        let bytes = STANDARD.decode(encoded).unwrap();
        image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap()
    }

    #[test]
    fn renders_url_as_png_data_url() {
        let data_url = qr_data_url("https://stickers.example/a/my-pack").unwrap();
        let img = decode_png(&data_url);

        assert_eq!(img.width(), img.height());
        assert_eq!(img.width() % MODULE_PIXELS, 0);
    }

    #[test]
    fn longer_text_gives_larger_code() {
        let short = decode_png(&qr_data_url("hi").unwrap());
        let long = decode_png(&qr_data_url(&"x".repeat(400)).unwrap());
        assert!(long.width() > short.width());
    }

    #[test]
    fn text_beyond_capacity_fails() {
        let result = qr_data_url(&"x".repeat(5000));
        assert!(matches!(result, Err(AppError::Qr(_))));
    }
}
