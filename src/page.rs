//! Static page engine: a pure-Rust [`RenderEngine`] over parsed HTML.
//!
//! There is no layout and no script execution. Computed styles are the
//! declarations of every matching rule in sheet order followed by the
//! element's inline `style`; there is no inheritance or specificity. Box
//! sizes come from `width`/`height` styles or attributes and fall back to the
//! viewport.

use crate::css;
use crate::dom::{Element, MediaElement, NodeId, SourceNode, SurfaceElement, SVG_NS};
use crate::engine::{CssRule, InlineStyleEngine, RenderEngine, StyleSheet};
use crate::error::{Error, Result};
use crate::inliner;
use crate::rendering;
use crate::style::{parse_px, ComputedStyle, PseudoElement, StyleDeclaration};
use crate::util;
use crate::Viewport;
use image::RgbaImage;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;

const DEFAULT_SURFACE_WIDTH: u32 = 300;
const DEFAULT_SURFACE_HEIGHT: u32 = 150;

/// A sheet as seen by the page: parsed, or the reason it could not be read
#[derive(Debug, Clone)]
enum SheetEntry {
    Readable(StyleSheet),
    Unreadable(String),
}

/// One selector of a style rule, split from its pseudo-element
struct MatchRule {
    selector: Selector,
    pseudo: Option<PseudoElement>,
    style: StyleDeclaration,
}

/// A parsed HTML document exposed as a source tree plus rendering engine
#[derive(Debug)]
pub struct StaticPage {
    html: String,
    url: Option<String>,
    root: SourceNode,
    sheets: Vec<SheetEntry>,
    computed: HashMap<NodeId, StyleDeclaration>,
    pseudo: HashMap<(NodeId, PseudoElement), StyleDeclaration>,
    viewport: Viewport,
}

impl StaticPage {
    /// Parse `html`. Linked style sheets are not fetched and are reported
    /// as unreadable.
    pub fn parse(html: &str, base_url: Option<&str>) -> Result<Self> {
        Self::build(html, base_url, &|href| {
            Err(Error::StyleSheet(format!("{} was not loaded", href)))
        })
    }

    /// Read a page from disk; linked `file://` sheets are read too
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)
            .map_err(|e| Error::LoadError(format!("Failed to read {}: {}", path.display(), e)))?;
        let base = std::fs::canonicalize(path)
            .ok()
            .and_then(|p| url::Url::from_file_path(p).ok())
            .map(|u| u.to_string());

        Self::build(&html, base.as_deref(), &|href| {
            let file = url::Url::parse(href)
                .ok()
                .filter(|u| u.scheme() == "file")
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| Error::StyleSheet(format!("{} is not a local file", href)))?;
            std::fs::read_to_string(&file).map_err(|e| Error::StyleSheet(format!("{}: {}", href, e)))
        })
    }

    /// Fetch a page and its linked style sheets with a blocking client.
    ///
    /// Must not be called from inside an async runtime.
    #[cfg(feature = "http")]
    pub fn load_url(url: &str, config: &crate::LoaderConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let html = client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| Error::LoadError(format!("Failed to fetch {}: {}", url, e)))?
            .text()
            .map_err(|e| Error::LoadError(format!("Failed to read response body: {}", e)))?;

        Self::build(&html, Some(url), &|href| {
            let resp = client
                .get(href)
                .send()
                .map_err(|e| Error::StyleSheet(format!("{}: {}", href, e)))?;
            if !resp.status().is_success() {
                return Err(Error::StyleSheet(format!("{}: status {}", href, resp.status())));
            }
            resp.text().map_err(|e| Error::StyleSheet(format!("{}: {}", href, e)))
        })
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The document element
    pub fn root(&self) -> &SourceNode {
        &self.root
    }

    /// First source node matching `selector`
    pub fn select(&self, selector: &str) -> Result<Option<&SourceNode>> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let root = document.root_element();
        let Some(target) = document.select(&selector).next() else {
            return Ok(None);
        };

        // ids were handed out in the same pre-order walk
        let index = root
            .descendants()
            .filter_map(ElementRef::wrap)
            .position(|e| e.id() == target.id());
        Ok(index.and_then(|i| self.root.find(NodeId(i))))
    }

    fn build(html: &str, base_url: Option<&str>, load_sheet: &dyn Fn(&str) -> Result<String>) -> Result<Self> {
        let document = Html::parse_document(html);
        let sheets = collect_sheets(&document, base_url, load_sheet)?;
        let rules = match_rules(&sheets, base_url);

        let mut builder = TreeBuilder {
            rules: &rules,
            base_url,
            next_id: 0,
            computed: HashMap::new(),
            pseudo: HashMap::new(),
        };
        let root = builder.convert(document.root_element())?;
        log::debug!(
            "parsed page with {} element(s) and {} sheet(s)",
            builder.next_id,
            sheets.len()
        );

        Ok(Self {
            html: html.to_string(),
            url: base_url.map(str::to_string),
            root,
            computed: builder.computed,
            pseudo: builder.pseudo,
            sheets,
            viewport: Viewport::default(),
        })
    }
}

impl RenderEngine for StaticPage {
    fn computed_style(&self, element: &Element) -> ComputedStyle {
        match self.computed.get(&element.id) {
            Some(style) => ComputedStyle::from_properties(style.clone()),
            None => InlineStyleEngine.computed_style(element),
        }
    }

    fn pseudo_style(&self, element: &Element, pseudo: PseudoElement) -> ComputedStyle {
        self.pseudo
            .get(&(element.id, pseudo))
            .map(|style| ComputedStyle::from_properties(style.clone()))
            .unwrap_or_default()
    }

    fn scroll_size(&self, element: &Element) -> (f64, f64) {
        let style = self.computed_style(element);
        let dim = |name: &str, fallback: u32| {
            parse_px(style.get_property_value(name))
                .or_else(|| element.attr(name).and_then(parse_px))
                .unwrap_or(fallback as f64)
        };
        (dim("width", self.viewport.width), dim("height", self.viewport.height))
    }

    fn base_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn style_sheets(&self) -> Vec<Result<StyleSheet>> {
        self.sheets
            .iter()
            .map(|entry| match entry {
                SheetEntry::Readable(sheet) => Ok(sheet.clone()),
                SheetEntry::Unreadable(reason) => Err(Error::StyleSheet(reason.clone())),
            })
            .collect()
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| Error::InvalidInput(format!("Invalid selector {}: {:?}", selector, e)))
}

/// Inline `<style>` and linked sheets, in document order
fn collect_sheets(
    document: &Html,
    base_url: Option<&str>,
    load_sheet: &dyn Fn(&str) -> Result<String>,
) -> Result<Vec<SheetEntry>> {
    let sheet_sel = parse_selector("style, link[rel=\"stylesheet\"]")?;
    let mut sheets = Vec::new();

    for node in document.select(&sheet_sel) {
        if node.value().name() == "style" {
            let text = node.text().collect::<String>();
            sheets.push(SheetEntry::Readable(css::parse_stylesheet(&text, None)));
            continue;
        }

        let Some(href) = node.value().attr("href") else {
            continue;
        };
        let href = match base_url {
            Some(base) => util::resolve_url(href, base),
            None => href.to_string(),
        };
        match load_sheet(&href) {
            Ok(text) => sheets.push(SheetEntry::Readable(css::parse_stylesheet(&text, Some(&href)))),
            Err(e) => sheets.push(SheetEntry::Unreadable(e.to_string())),
        }
    }
    Ok(sheets)
}

/// Flatten style rules into one entry per selector, in sheet order.
/// `url(...)` values are made absolute against the sheet they came from.
fn match_rules(sheets: &[SheetEntry], page_url: Option<&str>) -> Vec<MatchRule> {
    let mut rules = Vec::new();
    for sheet in sheets {
        let SheetEntry::Readable(sheet) = sheet else {
            continue;
        };
        let base = sheet.href.as_deref().or(page_url);
        for rule in &sheet.rules {
            let CssRule::Style { selector, style } = rule else {
                continue;
            };
            let style = absolutize(style, base);
            for part in selector.split(',') {
                let (base, pseudo) = split_pseudo(part.trim());
                match Selector::parse(base) {
                    Ok(selector) => rules.push(MatchRule {
                        selector,
                        pseudo,
                        style: style.clone(),
                    }),
                    Err(_) => log::debug!("unsupported selector skipped: {}", part.trim()),
                }
            }
        }
    }
    rules
}

fn absolutize(style: &StyleDeclaration, base: Option<&str>) -> StyleDeclaration {
    let Some(base) = base else {
        return style.clone();
    };
    let mut out = StyleDeclaration::new();
    for property in style.iter() {
        let value = inliner::resolve_references(&property.value, base);
        out.set(&property.name, &value, property.important);
    }
    out
}

/// `"p::before"` → `("p", Some(Before))`
fn split_pseudo(selector: &str) -> (&str, Option<PseudoElement>) {
    for pseudo in PseudoElement::ALL {
        for sep in ["::", ":"] {
            let suffix = format!("{}{}", sep, pseudo.as_str());
            if let Some(base) = selector.strip_suffix(suffix.as_str()) {
                let base = if base.is_empty() { "*" } else { base };
                return (base, Some(pseudo));
            }
        }
    }
    (selector, None)
}

struct TreeBuilder<'r> {
    rules: &'r [MatchRule],
    base_url: Option<&'r str>,
    next_id: usize,
    computed: HashMap<NodeId, StyleDeclaration>,
    pseudo: HashMap<(NodeId, PseudoElement), StyleDeclaration>,
}

impl TreeBuilder<'_> {
    fn convert(&mut self, element_ref: ElementRef) -> Result<SourceNode> {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let value = element_ref.value();
        let mut element = Element::new(id, value.name());
        for (name, attr) in value.attrs() {
            element.attributes.push((name.to_string(), attr.to_string()));
        }
        self.resolve_styles(id, &element_ref, &element);

        for child in element_ref.children() {
            match child.value() {
                Node::Text(text) => element.children.push(SourceNode::Text(String::from(&**text))),
                Node::Comment(comment) => element.children.push(SourceNode::Comment(String::from(&**comment))),
                Node::Element(_) => {
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        let node = self.convert(child_ref)?;
                        element.children.push(node);
                    }
                }
                _ => {}
            }
        }

        match element.tag.as_str() {
            "input" => {
                if let Some(v) = element.attr("value").map(str::to_string) {
                    element.value = Some(v);
                }
            }
            "textarea" => {
                element.value = Some(element_ref.text().collect());
            }
            _ => {}
        }

        if &*value.name.ns == SVG_NS {
            return Ok(SourceNode::Vector(element));
        }
        let node = match element.tag.as_str() {
            "canvas" => {
                let (width, height) = attr_size(&element);
                rendering::check_size(width, height)?;
                SourceNode::DrawableSurface(SurfaceElement {
                    element,
                    pixels: RgbaImage::new(width, height),
                })
            }
            "video" => {
                let (width, height) = attr_size(&element);
                SourceNode::MotionMedia(MediaElement {
                    element,
                    intrinsic_width: width,
                    intrinsic_height: height,
                    frame: None,
                })
            }
            _ => SourceNode::Element(element),
        };
        Ok(node)
    }

    fn resolve_styles(&mut self, id: NodeId, element_ref: &ElementRef, element: &Element) {
        let mut computed = StyleDeclaration::new();
        for rule in self.rules.iter().filter(|r| r.selector.matches(element_ref)) {
            match rule.pseudo {
                None => computed.extend(&rule.style),
                Some(pseudo) => self.pseudo.entry((id, pseudo)).or_default().extend(&rule.style),
            }
        }
        if let Some(inline) = element.attr("style") {
            computed.extend(&absolutize(&StyleDeclaration::parse(inline), self.base_url));
        }
        self.computed.insert(id, computed);
    }
}

fn attr_size(element: &Element) -> (u32, u32) {
    let read = |name: &str, fallback: u32| {
        element
            .attr(name)
            .and_then(parse_px)
            .filter(|v| *v >= 0.0)
            .map(|v| v as u32)
            .unwrap_or(fallback)
    };
    (read("width", DEFAULT_SURFACE_WIDTH), read("height", DEFAULT_SURFACE_HEIGHT))
}
