//! Interface to the rendering engine that laid out the source tree.
//!
//! The capture pipeline never computes styles itself; it asks a
//! [`RenderEngine`] for each element's resolved presentation, its scroll box
//! and the document's style sheets.

use crate::dom::Element;
use crate::error::Result;
use crate::style::{parse_px, ComputedStyle, PseudoElement, StyleDeclaration};

/// One rule of a style sheet
#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
    Style {
        selector: String,
        style: StyleDeclaration,
    },
    FontFace {
        style: StyleDeclaration,
    },
    /// Any other at-rule, kept as raw text
    Other(String),
}

impl CssRule {
    /// Serialized rule text, the way a browser's `cssText` reports it
    pub fn css_text(&self) -> String {
        match self {
            CssRule::Style { selector, style } => format!("{} {{ {} }}", selector, style.css_text()),
            CssRule::FontFace { style } => format!("@font-face {{ {} }}", style.css_text()),
            CssRule::Other(text) => text.clone(),
        }
    }

    pub fn is_font_face(&self) -> bool {
        matches!(self, CssRule::FontFace { .. })
    }

    pub fn style(&self) -> Option<&StyleDeclaration> {
        match self {
            CssRule::Style { style, .. } | CssRule::FontFace { style } => Some(style),
            CssRule::Other(_) => None,
        }
    }
}

/// A style sheet reachable from the document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSheet {
    /// URL the sheet was loaded from; `None` for inline `<style>` sheets
    pub href: Option<String>,
    pub rules: Vec<CssRule>,
}

/// Rendering engine collaborator
pub trait RenderEngine: Send + Sync {
    /// Resolved style of an element
    fn computed_style(&self, element: &Element) -> ComputedStyle;

    /// Resolved style of a generated pseudo-element. Engines without
    /// generated content report an empty style.
    fn pseudo_style(&self, _element: &Element, _pseudo: PseudoElement) -> ComputedStyle {
        ComputedStyle::default()
    }

    /// `(scrollWidth, scrollHeight)` of an element
    fn scroll_size(&self, element: &Element) -> (f64, f64);

    /// Every sheet of the document; sheets that cannot be read (e.g.
    /// cross-origin) are reported as errors.
    fn style_sheets(&self) -> Vec<Result<StyleSheet>> {
        Vec::new()
    }

    /// Document URL that relative `src` and `url(...)` references resolve against
    fn base_url(&self) -> Option<&str> {
        None
    }
}

impl<T: RenderEngine + ?Sized> RenderEngine for &T {
    fn computed_style(&self, element: &Element) -> ComputedStyle {
        (**self).computed_style(element)
    }

    fn pseudo_style(&self, element: &Element, pseudo: PseudoElement) -> ComputedStyle {
        (**self).pseudo_style(element, pseudo)
    }

    fn scroll_size(&self, element: &Element) -> (f64, f64) {
        (**self).scroll_size(element)
    }

    fn style_sheets(&self) -> Vec<Result<StyleSheet>> {
        (**self).style_sheets()
    }

    fn base_url(&self) -> Option<&str> {
        (**self).base_url()
    }
}

/// Outer width: scroll width plus left and right borders
pub fn width(engine: &dyn RenderEngine, element: &Element) -> u32 {
    let style = engine.computed_style(element);
    let (scroll_width, _) = engine.scroll_size(element);
    to_pixels(scroll_width + style.px("border-left-width") + style.px("border-right-width"))
}

/// Outer height: scroll height plus top and bottom borders
pub fn height(engine: &dyn RenderEngine, element: &Element) -> u32 {
    let style = engine.computed_style(element);
    let (_, scroll_height) = engine.scroll_size(element);
    to_pixels(scroll_height + style.px("border-top-width") + style.px("border-bottom-width"))
}

fn to_pixels(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.round() as u32
    } else {
        0
    }
}

/// Engine whose computed style is each element's own `style` attribute.
///
/// Useful for trees that were already resolved (e.g. a snapshot fed back in
/// as a source) and in tests. Scroll size comes from the `width`/`height`
/// style properties, then the attributes of the same name.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineStyleEngine;

impl RenderEngine for InlineStyleEngine {
    fn computed_style(&self, element: &Element) -> ComputedStyle {
        ComputedStyle::from_properties(StyleDeclaration::parse(element.attr("style").unwrap_or("")))
    }

    fn scroll_size(&self, element: &Element) -> (f64, f64) {
        let style = self.computed_style(element);
        let dim = |name: &str| {
            parse_px(style.get_property_value(name))
                .or_else(|| element.attr(name).and_then(parse_px))
                .unwrap_or(0.0)
        };
        (dim("width"), dim("height"))
    }
}
