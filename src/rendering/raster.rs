//! Raster draw pipeline: decode a capture, let it settle, paint it onto a surface

use crate::error::Result;
use crate::rendering::{check_size, RasterBackend, Surface};
use image::{imageops, RgbaImage};
use std::time::Duration;

/// Pause between image load and draw. Embedded rasters inside an SVG may
/// still be decoding when the load completes.
pub const SETTLE_DELAY_MS: u64 = 100;

/// Decode `uri` and draw it at the origin of a fresh `width`×`height` surface,
/// pre-filled with `bgcolor` when given.
pub async fn draw(
    backend: &dyn RasterBackend,
    uri: &str,
    width: u32,
    height: u32,
    bgcolor: Option<&str>,
) -> Result<Surface> {
    check_size(width, height)?;
    let image = backend.decode(uri).await?;
    tokio::time::sleep(Duration::from_millis(SETTLE_DELAY_MS)).await;

    let mut surface = new_surface(width, height, bgcolor)?;
    surface.draw_image(&image, 0, 0);
    log::debug!("drew {}x{} image onto {}x{} surface", image.width(), image.height(), width, height);
    Ok(surface)
}

pub fn new_surface(width: u32, height: u32, bgcolor: Option<&str>) -> Result<Surface> {
    let mut surface = Surface::new(width, height)?;
    if let Some(color) = bgcolor {
        surface.fill_css(color)?;
    }
    Ok(surface)
}

/// Scale `frame` to fit a `box_width`×`box_height` box, centered, with
/// transparent bands on the short axis. `None` when either side is empty
/// or the box is too large to allocate.
pub fn letterbox(frame: &RgbaImage, box_width: u32, box_height: u32) -> Option<RgbaImage> {
    let (frame_width, frame_height) = frame.dimensions();
    if frame_width == 0 || frame_height == 0 || box_width == 0 || box_height == 0 {
        return None;
    }
    check_size(box_width, box_height).ok()?;

    let ratio = f64::max(
        frame_width as f64 / box_width as f64,
        frame_height as f64 / box_height as f64,
    );
    let width = (frame_width as f64 / ratio).round().max(1.0) as u32;
    let height = (frame_height as f64 / ratio).round().max(1.0) as u32;
    let x = (box_width as f64 / 2.0 - width as f64 / 2.0).round() as i64;
    let y = (box_height as f64 / 2.0 - height as f64 / 2.0).round() as i64;

    let scaled = imageops::resize(frame, width, height, imageops::FilterType::Triangle);
    let mut canvas = RgbaImage::new(box_width, box_height);
    imageops::overlay(&mut canvas, &scaled, x, y);
    Some(canvas)
}
