//! Image encoding: `DynamicImage` → base64 PNG for the OCR request body.
//!
//! PNG is lossless; JPEG artefacts around glyph edges measurably hurt OCR on
//! small print, and the OCR endpoint accepts either.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as base64 PNG (no data-URI prefix).
pub fn encode_page(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} image → {} bytes base64",
        img.width(),
        img.height(),
        b64.len()
    );
    Ok(b64)
}

/// Wrap base64 PNG data as a `data:` URI.
pub fn to_data_uri(b64: &str) -> String {
    format!("data:image/png;base64,{b64}")
}

/// Return the payload of a `data:<mime>;base64,<payload>` URI, or the input
/// unchanged when it carries no such prefix.
pub fn strip_data_uri_prefix(data: &str) -> &str {
    if data.starts_with("data:") {
        if let Some((_, payload)) = data.split_once(',') {
            return payload;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_page(&img).expect("encode should succeed");
        assert!(!data.is_empty());
        let decoded = STANDARD.decode(&data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn strip_prefix_from_data_uri() {
        let uri = to_data_uri("iVBORw0KGgo=");
        assert_eq!(strip_data_uri_prefix(&uri), "iVBORw0KGgo=");
    }

    #[test]
    fn plain_base64_passes_through() {
        assert_eq!(strip_data_uri_prefix("iVBORw0KGgo="), "iVBORw0KGgo=");
        assert_eq!(strip_data_uri_prefix(""), "");
    }
}
