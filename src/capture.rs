//! Capture entry points: `to_svg`, `to_png`, `to_jpeg`, `to_blob`, `to_pixel_data`.
//!
//! Every capture runs the same pipeline: replicate the node, embed web fonts,
//! embed images, apply the caller's overrides, then assemble the SVG. Raster
//! outputs additionally decode that SVG and draw it onto a pixel surface.

use crate::assemble;
use crate::dom::{Element, Snapshot, SnapshotElement, SourceNode};
use crate::engine::{self, RenderEngine};
use crate::error::{Error, Result};
use crate::fetch::ResourceFetcher;
use crate::fonts;
use crate::images;
use crate::loader::{ResourceLoader, FETCH_TIMEOUT_MS};
use crate::rendering::raster;
use crate::rendering::{Blob, DataUriBackend, RasterBackend, Surface};
use crate::replicate::Replicator;
use crate::CaptureOptions;
use std::sync::Arc;
use std::time::Duration;

/// Captures nodes laid out by one rendering engine.
///
/// A `Capturer` holds no per-capture state: each call builds its own
/// resource policy from the options it is given, so captures with different
/// placeholder settings may run concurrently.
pub struct Capturer<'e> {
    engine: &'e dyn RenderEngine,
    fetcher: Arc<dyn ResourceFetcher>,
    backend: Arc<dyn RasterBackend>,
    timeout: Duration,
}

/// A fully inlined snapshot and the canvas size it will be drawn at
struct Prepared {
    snapshot: Snapshot,
    width: u32,
    height: u32,
}

impl<'e> Capturer<'e> {
    /// Capturer fetching resources over HTTP with default loader settings
    #[cfg(feature = "http")]
    pub fn new(engine: &'e dyn RenderEngine) -> Result<Self> {
        Self::with_config(engine, &crate::LoaderConfig::default())
    }

    #[cfg(feature = "http")]
    pub fn with_config(engine: &'e dyn RenderEngine, config: &crate::LoaderConfig) -> Result<Self> {
        let fetcher = crate::fetch::HttpFetcher::new(config)?;
        Ok(Self::with_fetcher(engine, Arc::new(fetcher)).with_timeout(Duration::from_millis(config.timeout_ms)))
    }

    pub fn with_fetcher(engine: &'e dyn RenderEngine, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            engine,
            fetcher,
            backend: Arc::new(DataUriBackend::new()),
            timeout: Duration::from_millis(FETCH_TIMEOUT_MS),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn RasterBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Per-resource fetch ceiling
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// SVG data URI of `node`
    pub async fn to_svg(&self, node: &SourceNode, options: &CaptureOptions) -> Result<String> {
        let prepared = self.prepare(node, options).await?;
        assemble::assemble(&prepared.snapshot, prepared.width, prepared.height)
    }

    /// PNG data URI of `node`
    pub async fn to_png(&self, node: &SourceNode, options: &CaptureOptions) -> Result<String> {
        self.draw(node, options).await?.to_png_data_url()
    }

    /// JPEG data URI of `node` at `options.quality`
    pub async fn to_jpeg(&self, node: &SourceNode, options: &CaptureOptions) -> Result<String> {
        self.draw(node, options).await?.to_jpeg_data_url(options.jpeg_quality())
    }

    /// PNG bytes of `node`
    pub async fn to_blob(&self, node: &SourceNode, options: &CaptureOptions) -> Result<Blob> {
        self.draw(node, options).await?.to_blob()
    }

    /// RGBA bytes of the node's measured box, row-major
    pub async fn to_pixel_data(&self, node: &SourceNode, options: &CaptureOptions) -> Result<Vec<u8>> {
        let element = root_element(node)?;
        let surface = self.draw(node, options).await?;
        let width = engine::width(self.engine, element);
        let height = engine::height(self.engine, element);
        surface.pixel_data(width, height)
    }

    /// Rendered pixel surface of `node`
    pub async fn draw(&self, node: &SourceNode, options: &CaptureOptions) -> Result<Surface> {
        let prepared = self.prepare(node, options).await?;
        let uri = assemble::assemble(&prepared.snapshot, prepared.width, prepared.height)?;
        raster::draw(
            self.backend.as_ref(),
            &uri,
            prepared.width,
            prepared.height,
            options.bgcolor.as_deref(),
        )
        .await
    }

    async fn prepare(&self, node: &SourceNode, options: &CaptureOptions) -> Result<Prepared> {
        let element = root_element(node)?;
        let loader = ResourceLoader::new(self.fetcher.clone(), options.load_policy()).with_timeout(self.timeout);

        log::debug!("replicating <{}>", element.tag);
        let replicator = Replicator::new(self.engine).with_filter(options.filter.clone());
        let mut snapshot = replicator
            .replicate(node, true)
            .await?
            .ok_or_else(|| Error::InvalidInput("capture root produced no snapshot".into()))?;

        log::debug!("embedding fonts");
        let font_css = fonts::resolve_all(self.engine, &loader).await?;
        embed_font_css(&mut snapshot, font_css);

        log::debug!("embedding images");
        images::inline_all(&mut snapshot, self.engine.base_url(), &loader).await?;

        apply_options(&mut snapshot, options);

        let (width, height) = self.dimensions(element, options);
        Ok(Prepared { snapshot, width, height })
    }

    fn dimensions(&self, element: &Element, options: &CaptureOptions) -> (u32, u32) {
        let width = options.output_width().unwrap_or_else(|| engine::width(self.engine, element));
        let height = options.output_height().unwrap_or_else(|| engine::height(self.engine, element));
        (width, height)
    }
}

fn root_element(node: &SourceNode) -> Result<&Element> {
    node.element()
        .ok_or_else(|| Error::InvalidInput("capture root must be an element".into()))
}

fn embed_font_css(snapshot: &mut Snapshot, css: String) {
    if css.is_empty() {
        return;
    }
    if let Some(root) = snapshot.as_element_mut() {
        let mut style = SnapshotElement::new("style");
        style.children.push(Snapshot::Text(css));
        root.children.push(Snapshot::Element(style));
    }
}

/// Caller overrides, applied last so they win over copied styles
fn apply_options(snapshot: &mut Snapshot, options: &CaptureOptions) {
    let Some(root) = snapshot.as_element_mut() else {
        return;
    };
    if let Some(color) = &options.bgcolor {
        root.style.set("background-color", color, false);
    }
    if let Some(width) = options.output_width() {
        root.style.set("width", &format!("{}px", width), false);
    }
    if let Some(height) = options.output_height() {
        root.style.set("height", &format!("{}px", height), false);
    }
    for (name, value) in &options.style {
        root.style.set(name, value, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeId;
    use crate::engine::InlineStyleEngine;
    use crate::fetch::FetchResponse;
    use futures::future::BoxFuture;
    use image::RgbaImage;

    struct NoNetwork;

    impl ResourceFetcher for NoNetwork {
        fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<FetchResponse>> {
            Box::pin(async { Ok(FetchResponse::status(404)) })
        }
    }

    struct Blank;

    impl RasterBackend for Blank {
        fn decode<'a>(&'a self, _uri: &'a str) -> BoxFuture<'a, Result<RgbaImage>> {
            Box::pin(async { Ok(RgbaImage::new(1, 1)) })
        }
    }

    fn sized(width: u32, height: u32) -> SourceNode {
        SourceNode::Element(
            Element::new(NodeId(0), "div")
                .with_attr("style", &format!("width: {}px; height: {}px", width, height))
                .with_child(SourceNode::Text("Hello".into())),
        )
    }

    #[test]
    fn options_override_root_style() {
        let mut root = SnapshotElement::new("div");
        root.style.set("width", "10px", false);
        let mut snapshot = Snapshot::Element(root);
        let options = CaptureOptions {
            bgcolor: Some("white".into()),
            width: Some(40),
            style: vec![("transform".into(), "scale(2)".into())],
            ..Default::default()
        };
        apply_options(&mut snapshot, &options);
        let root = snapshot.as_element().unwrap();
        assert_eq!(root.style.css_text(), "width: 40px; background-color: white; transform: scale(2);");
    }

    #[tokio::test]
    async fn svg_uses_measured_size_by_default() {
        let node = sized(30, 20);
        let capturer = Capturer::with_fetcher(&InlineStyleEngine, Arc::new(NoNetwork));
        let svg = capturer.to_svg(&node, &CaptureOptions::default()).await.unwrap();
        let doc = urlencoding::decode(&svg[assemble::SVG_DATA_URI_PREFIX.len()..]).unwrap().into_owned();
        assert!(doc.contains(r#"width="30" height="20""#));
        assert!(doc.contains("Hello"));
    }

    #[tokio::test]
    async fn zero_size_and_quality_mean_unset() {
        let node = sized(6, 4);
        let capturer = Capturer::with_fetcher(&InlineStyleEngine, Arc::new(NoNetwork)).with_backend(Arc::new(Blank));
        let options = CaptureOptions {
            width: Some(0),
            height: Some(0),
            quality: 0.0,
            bgcolor: Some("white".into()),
            ..Default::default()
        };

        let svg = capturer.to_svg(&node, &options).await.unwrap();
        let doc = urlencoding::decode(&svg[assemble::SVG_DATA_URI_PREFIX.len()..]).unwrap().into_owned();
        assert!(doc.contains(r#"width="6" height="4""#));
        assert!(doc.contains("width: 6px; height: 4px;"));

        let jpeg = capturer.to_jpeg(&node, &options).await.unwrap();
        let image = crate::rendering::encode::decode_data_url(&jpeg).unwrap();
        assert_eq!(image.dimensions(), (6, 4));
    }

    #[tokio::test]
    async fn text_root_is_invalid_input() {
        let capturer = Capturer::with_fetcher(&InlineStyleEngine, Arc::new(NoNetwork));
        let res = capturer.to_svg(&SourceNode::Text("x".into()), &CaptureOptions::default()).await;
        assert!(matches!(res, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn pixel_data_covers_measured_box() {
        let node = sized(4, 3);
        let capturer = Capturer::with_fetcher(&InlineStyleEngine, Arc::new(NoNetwork)).with_backend(Arc::new(Blank));
        let options = CaptureOptions {
            bgcolor: Some("#0000ff".into()),
            ..Default::default()
        };
        let pixels = capturer.to_pixel_data(&node, &options).await.unwrap();
        assert_eq!(pixels.len(), 4 * 3 * 4);
        assert_eq!(&pixels[0..4], &[0, 0, 255, 255]);
    }
}
