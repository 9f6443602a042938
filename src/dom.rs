//! Source nodes handed to the capture pipeline and the owned snapshots it produces.
//!
//! Source nodes are a closed set of variants. Whether a node is drawable,
//! a video or an SVG element is encoded in its variant.

use crate::style::StyleDeclaration;
use image::RgbaImage;

pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Attribute marking a `<style>` node synthesized for generated content
pub const PSEUDO_MARKER_ATTR: &str = "data-rfcapture-pseudo";

/// Identity of a source element, used by engines to look up computed styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A rendered element in the live tree
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub id: NodeId,
    /// Lower-case local name
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<SourceNode>,
    /// Current value of a form control, which may differ from its markup
    pub value: Option<String>,
}

impl Element {
    pub fn new(id: NodeId, tag: impl Into<String>) -> Self {
        Self {
            id,
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        set_attr(&mut self.attributes, name, value);
        self
    }

    pub fn with_child(mut self, child: SourceNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        get_attr(&self.attributes, name)
    }
}

/// A drawable surface (`<canvas>`) together with its current pixel content
#[derive(Debug, Clone)]
pub struct SurfaceElement {
    pub element: Element,
    pub pixels: RgbaImage,
}

/// A motion-media element (`<video>`) and its current frame.
///
/// `frame` is `None` when the frame cannot be read (not yet decoded, or
/// protected content); the capture then falls back to a transparent pixel.
#[derive(Debug, Clone)]
pub struct MediaElement {
    pub element: Element,
    pub intrinsic_width: u32,
    pub intrinsic_height: u32,
    pub frame: Option<RgbaImage>,
}

/// One node of the live, rendered tree
#[derive(Debug, Clone)]
pub enum SourceNode {
    Element(Element),
    Text(String),
    Comment(String),
    DrawableSurface(SurfaceElement),
    MotionMedia(MediaElement),
    /// Element in the SVG namespace
    Vector(Element),
}

impl SourceNode {
    /// The element behind any element-like variant
    pub fn element(&self) -> Option<&Element> {
        match self {
            SourceNode::Element(e) | SourceNode::Vector(e) => Some(e),
            SourceNode::DrawableSurface(s) => Some(&s.element),
            SourceNode::MotionMedia(m) => Some(&m.element),
            SourceNode::Text(_) | SourceNode::Comment(_) => None,
        }
    }

    pub fn children(&self) -> &[SourceNode] {
        self.element().map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn tag(&self) -> Option<&str> {
        self.element().map(|e| e.tag.as_str())
    }

    /// Depth-first search by id
    pub fn find(&self, id: NodeId) -> Option<&SourceNode> {
        if self.element().map(|e| e.id) == Some(id) {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(id))
    }

    /// Concatenated text of this subtree
    pub fn text_content(&self) -> String {
        match self {
            SourceNode::Text(t) => t.clone(),
            SourceNode::Comment(_) => String::new(),
            _ => self.children().iter().map(|c| c.text_content()).collect(),
        }
    }
}

/// An element inside a snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotElement {
    pub tag: String,
    /// Attributes other than `style`
    pub attributes: Vec<(String, String)>,
    /// Inline style, serialized as the `style` attribute
    pub style: StyleDeclaration,
    pub children: Vec<Snapshot>,
}

impl SnapshotElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        get_attr(&self.attributes, name)
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        set_attr(&mut self.attributes, name, value);
    }

    /// Append a class name to the `class` attribute
    pub fn add_class(&mut self, class: &str) {
        let classes = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr("class", &classes);
    }
}

/// Owned copy of a rendered node and its subtree
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Element(SnapshotElement),
    Text(String),
    Comment(String),
}

impl Snapshot {
    pub fn as_element(&self) -> Option<&SnapshotElement> {
        match self {
            Snapshot::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut SnapshotElement> {
        match self {
            Snapshot::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Snapshot] {
        self.as_element().map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Concatenated text of this subtree
    pub fn text_content(&self) -> String {
        match self {
            Snapshot::Text(t) => t.clone(),
            Snapshot::Comment(_) => String::new(),
            Snapshot::Element(e) => e.children.iter().map(|c| c.text_content()).collect(),
        }
    }

    /// Turn a snapshot back into a source tree, numbering elements depth-first
    /// from `next_id`. The inline style becomes the `style` attribute.
    pub fn to_source(&self, next_id: &mut usize) -> SourceNode {
        match self {
            Snapshot::Text(t) => SourceNode::Text(t.clone()),
            Snapshot::Comment(c) => SourceNode::Comment(c.clone()),
            Snapshot::Element(e) => {
                let id = NodeId(*next_id);
                *next_id += 1;
                let mut element = Element::new(id, e.tag.clone());
                element.attributes = e.attributes.clone();
                if !e.style.is_empty() {
                    set_attr(&mut element.attributes, "style", &e.style.css_text());
                }
                element.children = e.children.iter().map(|c| c.to_source(next_id)).collect();
                if e.attr("xmlns") == Some(SVG_NS) {
                    SourceNode::Vector(element)
                } else {
                    SourceNode::Element(element)
                }
            }
        }
    }
}

pub(crate) fn get_attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub(crate) fn set_attr(attrs: &mut Vec<(String, String)>, name: &str, value: &str) {
    match attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some((_, v)) => *v = value.to_string(),
        None => attrs.push((name.to_string(), value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_class_appends() {
        let mut e = SnapshotElement::new("div");
        e.add_class("u1");
        assert_eq!(e.attr("class"), Some("u1"));
        e.add_class("u2");
        assert_eq!(e.attr("class"), Some("u1 u2"));
    }

    #[test]
    fn to_source_renumbers_and_keeps_svg_namespace() {
        let mut svg = SnapshotElement::new("svg");
        svg.set_attr("xmlns", SVG_NS);
        let mut root = SnapshotElement::new("div");
        root.style.set("color", "red", false);
        root.children.push(Snapshot::Element(svg));
        root.children.push(Snapshot::Text("hi".into()));

        let mut next = 10;
        let source = Snapshot::Element(root).to_source(&mut next);
        assert_eq!(next, 12);
        let el = source.element().unwrap();
        assert_eq!(el.id, NodeId(10));
        assert_eq!(el.attr("style"), Some("color: red;"));
        assert!(matches!(source.children()[0], SourceNode::Vector(_)));
        assert_eq!(source.text_content(), "hi");
    }
}
