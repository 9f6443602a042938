//! Raster backend: turns an image URI into decoded pixels.

use crate::error::{Error, Result};
use crate::rendering::encode;
use futures::future::BoxFuture;
use image::RgbaImage;
use std::sync::Arc;

/// Decodes an image URI (usually the capture's SVG data URL) into pixels.
///
/// A decode failure is reported as [`Error::ImageLoad`] and fails the
/// raster capture that requested it.
pub trait RasterBackend: Send + Sync {
    fn decode<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<RgbaImage>>;
}

impl<T: RasterBackend + ?Sized> RasterBackend for Arc<T> {
    fn decode<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<RgbaImage>> {
        (**self).decode(uri)
    }
}

/// Decodes base64 raster data URLs with `image`, and SVG data URLs with
/// `resvg` when the `svg-raster` feature is enabled.
///
/// resvg does not paint `foreignObject` content, so SVG captures come out
/// at the right size but without their HTML body.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUriBackend;

impl DataUriBackend {
    pub fn new() -> Self {
        DataUriBackend
    }

    fn decode_sync(&self, uri: &str) -> Result<RgbaImage> {
        if uri.starts_with("data:image/svg+xml") {
            let (_, payload) = uri
                .split_once(',')
                .ok_or_else(|| Error::ImageLoad("malformed SVG data URL".into()))?;
            let svg = urlencoding::decode(payload)
                .map_err(|e| Error::ImageLoad(format!("invalid percent-encoding: {}", e)))?;
            return render_svg(&svg);
        }
        encode::decode_data_url(uri)
    }
}

impl RasterBackend for DataUriBackend {
    fn decode<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<RgbaImage>> {
        Box::pin(async move { self.decode_sync(uri) })
    }
}

#[cfg(feature = "svg-raster")]
fn render_svg(svg: &str) -> Result<RgbaImage> {
    use resvg::{tiny_skia, usvg};

    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| Error::ImageLoad(format!("Failed to parse SVG: {}", e)))?;

    let size = tree.size().to_int_size();
    crate::rendering::check_size(size.width(), size.height())?;
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height()).ok_or_else(|| {
        Error::ImageLoad(format!("cannot allocate {}x{} surface", size.width(), size.height()))
    })?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha
    let mut out = RgbaImage::new(size.width(), size.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(out)
}

#[cfg(not(feature = "svg-raster"))]
fn render_svg(_svg: &str) -> Result<RgbaImage> {
    Err(Error::ImageLoad(
        "SVG decoding requires the `svg-raster` feature".into(),
    ))
}
