//! Rendering module: pixel surfaces, the raster backend and image encoders

pub mod backend;
pub mod encode;
pub mod raster;

pub use backend::{DataUriBackend, RasterBackend};

use crate::error::{Error, Result};
use image::{imageops, Rgba, RgbaImage};

/// Largest surface allocated, in pixels (8192 x 8192)
pub const MAX_SURFACE_PIXELS: u64 = 8192 * 8192;

/// Reject surface sizes above [`MAX_SURFACE_PIXELS`]
pub fn check_size(width: u32, height: u32) -> Result<()> {
    if width as u64 * height as u64 > MAX_SURFACE_PIXELS {
        return Err(Error::InvalidInput(format!(
            "{}x{} surface exceeds the {} pixel limit",
            width, height, MAX_SURFACE_PIXELS
        )));
    }
    Ok(())
}

/// An RGBA pixel surface that decoded images are drawn onto
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// Fully transparent surface
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_size(width, height)?;
        Ok(Self {
            pixels: RgbaImage::new(width, height),
        })
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for px in self.pixels.pixels_mut() {
            *px = color;
        }
    }

    /// Fill with any CSS color (`"#ff0000"`, `"rgba(0,0,0,.5)"`, `"white"`)
    pub fn fill_css(&mut self, color: &str) -> Result<()> {
        let parsed = csscolorparser::parse(color)
            .map_err(|e| Error::ConfigError(format!("Invalid background color {}: {}", color, e)))?;
        self.fill(Rgba(parsed.to_rgba8()));
        Ok(())
    }

    /// Alpha-composite `image` with its top-left corner at `(x, y)`
    pub fn draw_image(&mut self, image: &RgbaImage, x: i64, y: i64) {
        imageops::overlay(&mut self.pixels, image, x, y);
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        encode::encode_png(&self.pixels)
    }

    pub fn to_png_data_url(&self) -> Result<String> {
        encode::png_data_url(&self.pixels)
    }

    /// JPEG data URL; `quality` in `[0, 1]`
    pub fn to_jpeg_data_url(&self, quality: f32) -> Result<String> {
        encode::jpeg_data_url(&self.pixels, quality)
    }

    pub fn to_blob(&self) -> Result<Blob> {
        Ok(Blob {
            mime_type: "image/png".to_string(),
            bytes: self.to_png()?,
        })
    }

    /// Raw RGBA bytes of the `width`×`height` region at the origin.
    /// Pixels outside the surface read as transparent black.
    pub fn pixel_data(&self, width: u32, height: u32) -> Result<Vec<u8>> {
        if width == self.width() && height == self.height() {
            return Ok(self.pixels.as_raw().clone());
        }
        check_size(width, height)?;
        let mut region = RgbaImage::new(width, height);
        imageops::replace(&mut region, &self.pixels, 0, 0);
        Ok(region.into_raw())
    }
}

/// Binary image payload with its MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_with_css_color() {
        let mut s = Surface::new(3, 2).unwrap();
        s.fill_css("#ff0000").unwrap();
        assert!(s.pixels().pixels().all(|p| *p == Rgba([255, 0, 0, 255])));
        assert!(s.fill_css("not-a-color").is_err());
    }

    #[test]
    fn pixel_data_region_pads_with_transparent() {
        let mut s = Surface::new(1, 1).unwrap();
        s.fill(Rgba([1, 2, 3, 4]));
        assert_eq!(s.pixel_data(1, 1).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(s.pixel_data(2, 1).unwrap(), vec![1, 2, 3, 4, 0, 0, 0, 0]);
        assert!(matches!(s.pixel_data(u32::MAX, u32::MAX), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn drawing_transparent_image_keeps_background() {
        let mut s = Surface::new(2, 2).unwrap();
        s.fill(Rgba([0, 0, 255, 255]));
        s.draw_image(&RgbaImage::new(2, 2), 0, 0);
        assert!(s.pixels().pixels().all(|p| *p == Rgba([0, 0, 255, 255])));
    }

    #[test]
    fn blob_is_png() {
        let blob = Surface::new(2, 2).unwrap().to_blob().unwrap();
        assert_eq!(blob.mime_type, "image/png");
        assert_eq!(&blob.bytes[0..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn oversized_surface_is_rejected() {
        assert!(matches!(Surface::new(u32::MAX, u32::MAX), Err(Error::InvalidInput(_))));
        assert!(Surface::new(8192, 8193).is_err());
        assert!(Surface::new(8192, 1).is_ok());
    }
}
