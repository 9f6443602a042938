//! PNG/JPEG encoding and data-URL decoding for pixel buffers.

use crate::error::{Error, Result};
use crate::util;
use base64::Engine as Base64Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageEncoder, ImageFormat, RgbaImage};
use std::io::Cursor;

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| Error::EncodeError(format!("PNG: {}", e)))?;
    Ok(buffer)
}

/// JPEG bytes at `quality` in `[0, 1]` (alpha is dropped)
pub fn encode_jpeg(image: &RgbaImage, quality: f32) -> Result<Vec<u8>> {
    let quality = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8.into())
        .map_err(|e| Error::EncodeError(format!("JPEG: {}", e)))?;
    Ok(buffer)
}

pub fn png_data_url(image: &RgbaImage) -> Result<String> {
    let bytes = encode_png(image)?;
    Ok(util::data_as_url(
        &base64::engine::general_purpose::STANDARD.encode(bytes),
        "image/png",
    ))
}

pub fn jpeg_data_url(image: &RgbaImage, quality: f32) -> Result<String> {
    let bytes = encode_jpeg(image, quality)?;
    Ok(util::data_as_url(
        &base64::engine::general_purpose::STANDARD.encode(bytes),
        "image/jpeg",
    ))
}

/// Decode a base64 raster data URL (`data:image/png;base64,...`)
pub fn decode_data_url(uri: &str) -> Result<RgbaImage> {
    let (header, payload) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| Error::ImageLoad(format!("not a data URL: {}", truncate(uri))))?;
    if !header.ends_with(";base64") {
        return Err(Error::ImageLoad(format!("unsupported data URL encoding: {}", header)));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::ImageLoad(format!("invalid base64: {}", e)))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| Error::ImageLoad(format!("{}: {}", truncate(uri), e)))?;
    Ok(image.to_rgba8())
}

/// Keep error messages readable when the URI is a large payload
pub(crate) fn truncate(uri: &str) -> &str {
    match uri.char_indices().nth(64) {
        Some((idx, _)) => &uri[..idx],
        None => uri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_data_url_decodes_back() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let url = png_data_url(&img).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_url(&url).unwrap(), img);
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([200, 0, 0, 255]));
        let bytes = encode_jpeg(&img, 0.5).unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
        assert!(jpeg_data_url(&img, 1.0).unwrap().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_data_url("https://x/a.png"), Err(Error::ImageLoad(_))));
        assert!(matches!(decode_data_url("data:image/png;base64,AAAA"), Err(Error::ImageLoad(_))));
        assert!(matches!(decode_data_url("data:text/plain,hi"), Err(Error::ImageLoad(_))));
    }
}
