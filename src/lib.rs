//! RFox Capture
//!
//! Turns a rendered DOM node into a self-contained image: an SVG whose
//! `foreignObject` holds an XHTML copy of the node with every computed style,
//! generated-content rule, web font and image embedded inline, and optionally
//! a PNG/JPEG raster of that SVG.
//!
//! # Features
//!
//! - **http** (default): reqwest-backed resource fetcher
//! - **page** (default): static HTML page engine built on `scraper`
//! - **svg-raster** (default): SVG decoding for raster outputs via `resvg`
//!
//! # Example
//!
//! ```no_run
//! use rfcapture::{CaptureOptions, Capturer, StaticPage};
//!
//! # async fn run() -> rfcapture::Result<()> {
//! let page = StaticPage::parse("<div style=\"width: 200px; height: 50px\">Hello</div>", None)?;
//! let node = page.select("div")?.expect("div present");
//!
//! let options = CaptureOptions {
//!     bgcolor: Some("white".to_string()),
//!     ..Default::default()
//! };
//! let svg = Capturer::new(&page)?.to_svg(node, &options).await?;
//! assert!(svg.starts_with("data:image/svg+xml"));
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub mod error;
pub use error::{Error, Result};

pub mod assemble;
pub mod capture;
pub mod dom;
pub mod engine;
pub mod fetch;
pub mod fonts;
pub mod images;
pub mod inliner;
pub mod loader;
pub mod rendering;
pub mod replicate;
pub mod style;
pub mod util;

// Static page engine (HTML + CSS, no layout, no scripts)
#[cfg(feature = "page")]
pub mod css;
#[cfg(feature = "page")]
pub mod page;

pub use capture::Capturer;
pub use dom::{Element, NodeId, Snapshot, SnapshotElement, SourceNode};
pub use engine::{InlineStyleEngine, RenderEngine};
pub use fetch::{FetchResponse, ResourceFetcher};
pub use loader::{LoadPolicy, Loader, ResourceLoader};
pub use rendering::{Blob, DataUriBackend, RasterBackend, Surface};
pub use replicate::NodeFilter;
pub use style::{ComputedStyle, PseudoElement, StyleDeclaration};

#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
#[cfg(feature = "page")]
pub use page::StaticPage;

/// Options for one capture call
///
/// All fields are optional; the defaults capture the node at its measured
/// size with no overrides and fail-soft resource loading.
///
/// # Examples
///
/// ```
/// let opts = rfcapture::CaptureOptions::default();
/// assert_eq!(opts.quality, 1.0);
/// assert!(!opts.cache_bust);
/// ```
#[derive(Clone)]
pub struct CaptureOptions {
    /// Excludes a node and its subtree when it returns false. Never applied to the root.
    pub filter: Option<NodeFilter>,
    /// Background color of the captured root and the raster surface
    pub bgcolor: Option<String>,
    /// Output width in pixels; unset or 0 uses the measured box
    pub width: Option<u32>,
    /// Output height in pixels; unset or 0 uses the measured box
    pub height: Option<u32>,
    /// Style properties set on the captured root after everything else
    pub style: Vec<(String, String)>,
    /// JPEG quality in `[0, 1]`; 0 means the default of 1
    pub quality: f32,
    /// Data URL whose payload replaces resources that fail to load
    pub image_placeholder: Option<String>,
    /// Append a timestamp query parameter to every fetched URL
    pub cache_bust: bool,
    /// Fail the capture when a resource cannot be loaded and no placeholder is set
    pub strict_resources: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            filter: None,
            bgcolor: None,
            width: None,
            height: None,
            style: Vec::new(),
            quality: 1.0,
            image_placeholder: None,
            cache_bust: false,
            strict_resources: false,
        }
    }
}

impl fmt::Debug for CaptureOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureOptions")
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .field("bgcolor", &self.bgcolor)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("style", &self.style)
            .field("quality", &self.quality)
            .field("image_placeholder", &self.image_placeholder)
            .field("cache_bust", &self.cache_bust)
            .field("strict_resources", &self.strict_resources)
            .finish()
    }
}

impl CaptureOptions {
    /// Explicit output width, if any
    pub fn output_width(&self) -> Option<u32> {
        self.width.filter(|w| *w > 0)
    }

    /// Explicit output height, if any
    pub fn output_height(&self) -> Option<u32> {
        self.height.filter(|h| *h > 0)
    }

    /// Quality handed to the JPEG encoder
    pub fn jpeg_quality(&self) -> f32 {
        if self.quality > 0.0 {
            self.quality
        } else {
            1.0
        }
    }

    /// Resource policy for the loader of one capture
    pub fn load_policy(&self) -> LoadPolicy {
        LoadPolicy {
            image_placeholder: self.image_placeholder.clone(),
            cache_bust: self.cache_bust,
            strict: self.strict_resources,
        }
    }
}

/// Serializable subset of [`CaptureOptions`], e.g. read from a JSON file
///
/// ```
/// let settings: rfcapture::CaptureSettings =
///     serde_json::from_str(r#"{"bgcolor": "white", "quality": 0.5}"#).unwrap();
/// let opts = settings.into_options();
/// assert_eq!(opts.bgcolor.as_deref(), Some("white"));
/// assert_eq!(opts.quality, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureSettings {
    pub bgcolor: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub style: Vec<(String, String)>,
    pub quality: f32,
    pub image_placeholder: Option<String>,
    pub cache_bust: bool,
    pub strict_resources: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        let opts = CaptureOptions::default();
        Self {
            bgcolor: opts.bgcolor,
            width: opts.width,
            height: opts.height,
            style: opts.style,
            quality: opts.quality,
            image_placeholder: opts.image_placeholder,
            cache_bust: opts.cache_bust,
            strict_resources: opts.strict_resources,
        }
    }
}

impl CaptureSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::ConfigError(format!("Invalid capture settings: {}", e)))
    }

    pub fn into_options(self) -> CaptureOptions {
        CaptureOptions {
            filter: None,
            bgcolor: self.bgcolor,
            width: self.width,
            height: self.height,
            style: self.style,
            quality: self.quality,
            image_placeholder: self.image_placeholder,
            cache_bust: self.cache_bust,
            strict_resources: self.strict_resources,
        }
    }
}

/// Settings for fetching external resources and pages
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// User agent string to send with requests
    pub user_agent: String,
    /// Custom HTTP headers
    pub headers: HashMap<String, String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: loader::FETCH_TIMEOUT_MS,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/115.0 RFOX-Capture/0.1".to_string(),
            headers: HashMap::new(),
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Capture `node` as an SVG data URI, fetching resources over HTTP
#[cfg(feature = "http")]
pub async fn to_svg(node: &SourceNode, engine: &dyn RenderEngine, options: &CaptureOptions) -> Result<String> {
    Capturer::new(engine)?.to_svg(node, options).await
}

/// Capture `node` as a PNG data URI
#[cfg(feature = "http")]
pub async fn to_png(node: &SourceNode, engine: &dyn RenderEngine, options: &CaptureOptions) -> Result<String> {
    Capturer::new(engine)?.to_png(node, options).await
}

/// Capture `node` as a JPEG data URI
#[cfg(feature = "http")]
pub async fn to_jpeg(node: &SourceNode, engine: &dyn RenderEngine, options: &CaptureOptions) -> Result<String> {
    Capturer::new(engine)?.to_jpeg(node, options).await
}

/// Capture `node` as PNG bytes
#[cfg(feature = "http")]
pub async fn to_blob(node: &SourceNode, engine: &dyn RenderEngine, options: &CaptureOptions) -> Result<Blob> {
    Capturer::new(engine)?.to_blob(node, options).await
}

/// Capture `node` as raw RGBA pixels of its measured box
#[cfg(feature = "http")]
pub async fn to_pixel_data(node: &SourceNode, engine: &dyn RenderEngine, options: &CaptureOptions) -> Result<Vec<u8>> {
    Capturer::new(engine)?.to_pixel_data(node, options).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CaptureOptions::default();
        assert_eq!(options.quality, 1.0);
        assert!(options.filter.is_none());
        assert_eq!(options.load_policy(), LoadPolicy::default());
    }

    #[test]
    fn test_zero_values_are_unset() {
        let options = CaptureOptions {
            width: Some(0),
            height: Some(12),
            quality: 0.0,
            ..Default::default()
        };
        assert_eq!(options.output_width(), None);
        assert_eq!(options.output_height(), Some(12));
        assert_eq!(options.jpeg_quality(), 1.0);
        assert_eq!(CaptureOptions { quality: 0.4, ..Default::default() }.jpeg_quality(), 0.4);
    }

    #[test]
    fn test_viewport() {
        let viewport = Viewport {
            width: 1920,
            height: 1080,
        };
        assert_eq!(viewport.width, 1920);
        assert_eq!(Viewport::default().height, 720);
    }

    #[test]
    fn test_settings_from_json() {
        let settings = CaptureSettings::from_json(
            r#"{"imagePlaceholder": "data:image/png;base64,AAAA", "cacheBust": true, "style": [["color", "red"]]}"#,
        )
        .unwrap();
        let options = settings.into_options();
        let policy = options.load_policy();
        assert!(policy.cache_bust);
        assert_eq!(policy.image_placeholder.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(options.style, vec![("color".to_string(), "red".to_string())]);
        assert_eq!(options.quality, 1.0);

        assert!(matches!(CaptureSettings::from_json("{"), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_options_debug_hides_filter() {
        let options = CaptureOptions {
            filter: Some(std::sync::Arc::new(|_: &SourceNode| true)),
            ..Default::default()
        };
        assert!(format!("{:?}", options).contains("<fn>"));
    }
}
