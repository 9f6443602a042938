//! Tree replication: turns a rendered source subtree into an owned [`Snapshot`].
//!
//! Replication is depth-first and strictly ordered. Children are cloned one
//! at a time, left to right, and a child's whole subtree is attached before
//! its next sibling is started. Once a node's children are in place its clone
//! is post-processed in a fixed order:
//!
//! 1. motion media is swapped for a still image of its current frame
//! 2. the computed style is copied onto the clone
//! 3. `::before` / `::after` content is materialized as a `<style>` child
//! 4. live form values are copied
//! 5. SVG elements get an explicit namespace (and `<rect>` sizes move to style)

use crate::dom::{
    Element, MediaElement, SourceNode, Snapshot, SnapshotElement, SurfaceElement, PSEUDO_MARKER_ATTR,
    SVG_NS,
};
use crate::engine::RenderEngine;
use crate::error::Result;
use crate::rendering::{encode, raster};
use crate::style::{parse_px, ComputedStyle, PseudoElement, StyleDeclaration};
use crate::util::{UidGenerator, TRANSPARENT_PIXEL};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Predicate deciding whether a node (and its subtree) is captured
pub type NodeFilter = Arc<dyn Fn(&SourceNode) -> bool + Send + Sync>;

pub struct Replicator<'a> {
    engine: &'a dyn RenderEngine,
    filter: Option<NodeFilter>,
    uids: UidGenerator,
}

impl<'a> Replicator<'a> {
    pub fn new(engine: &'a dyn RenderEngine) -> Self {
        Self {
            engine,
            filter: None,
            uids: UidGenerator::new(),
        }
    }

    pub fn with_filter(mut self, filter: Option<NodeFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Clone `node` and its subtree. Returns `None` when the filter rejects
    /// the node; the filter is never consulted for the root.
    pub fn replicate<'s>(&'s self, node: &'s SourceNode, is_root: bool) -> BoxFuture<'s, Result<Option<Snapshot>>> {
        Box::pin(async move {
            if !is_root {
                if let Some(filter) = &self.filter {
                    if !filter(node) {
                        return Ok(None);
                    }
                }
            }

            let snapshot = match node {
                SourceNode::Text(text) => Snapshot::Text(text.clone()),
                SourceNode::Comment(text) => Snapshot::Comment(text.clone()),
                SourceNode::DrawableSurface(surface) => {
                    let mut image = surface_image(surface)?;
                    self.process_clone(node, &surface.element, &mut image);
                    Snapshot::Element(image)
                }
                SourceNode::Element(element) | SourceNode::Vector(element) => {
                    let mut clone = shallow_clone(element);
                    self.clone_children(element, &mut clone).await?;
                    self.process_clone(node, element, &mut clone);
                    Snapshot::Element(clone)
                }
                SourceNode::MotionMedia(media) => {
                    // children are replicated in order, then dropped along with the video
                    let mut replaced = shallow_clone(&media.element);
                    self.clone_children(&media.element, &mut replaced).await?;
                    let mut image = self.media_image(media);
                    self.process_clone(node, &media.element, &mut image);
                    Snapshot::Element(image)
                }
            };
            Ok(Some(snapshot))
        })
    }

    async fn clone_children(&self, original: &Element, clone: &mut SnapshotElement) -> Result<()> {
        for child in &original.children {
            if let Some(child_clone) = self.replicate(child, false).await? {
                clone.children.push(child_clone);
            }
        }
        Ok(())
    }

    fn process_clone(&self, node: &SourceNode, original: &Element, clone: &mut SnapshotElement) {
        self.engine.computed_style(original).copy_to(&mut clone.style);
        for pseudo in PseudoElement::ALL {
            self.clone_pseudo_element(original, clone, pseudo);
        }
        copy_user_input(original, clone);
        if matches!(node, SourceNode::Vector(_)) {
            fix_svg(clone);
        }
    }

    fn clone_pseudo_element(&self, original: &Element, clone: &mut SnapshotElement, pseudo: PseudoElement) {
        if has_materialized(original, pseudo) {
            return;
        }

        let style = self.engine.pseudo_style(original, pseudo);
        let content = style.get_property_value("content");
        if content.is_empty() || content == "none" {
            return;
        }

        let class_name = self.uids.next();
        clone.add_class(&class_name);

        let mut style_node = SnapshotElement::new("style");
        style_node.set_attr(PSEUDO_MARKER_ATTR, pseudo.as_str());
        style_node
            .children
            .push(Snapshot::Text(format_pseudo_element_style(&class_name, pseudo, &style)));
        clone.children.push(Snapshot::Element(style_node));
    }

    /// Still image of the current frame, letterboxed into the rendered box
    fn media_image(&self, media: &MediaElement) -> SnapshotElement {
        let style = self.engine.computed_style(&media.element);
        let box_width = parse_px(style.get_property_value("width"))
            .map(|w| w.trunc() as u32)
            .unwrap_or(media.intrinsic_width);
        let box_height = parse_px(style.get_property_value("height"))
            .map(|h| h.trunc() as u32)
            .unwrap_or(media.intrinsic_height);

        let src = media
            .frame
            .as_ref()
            .and_then(|frame| raster::letterbox(frame, box_width, box_height))
            .and_then(|canvas| encode::png_data_url(&canvas).ok())
            .unwrap_or_else(|| {
                log::debug!("video frame unavailable, using transparent placeholder");
                TRANSPARENT_PIXEL.to_string()
            });

        let mut image = SnapshotElement::new("img");
        image.set_attr("src", &src);
        image
    }
}

/// Clone `node` without a filter and with no exclusions
pub async fn replicate(node: &SourceNode, engine: &dyn RenderEngine) -> Result<Option<Snapshot>> {
    Replicator::new(engine).replicate(node, true).await
}

fn shallow_clone(element: &Element) -> SnapshotElement {
    let mut clone = SnapshotElement::new(element.tag.clone());
    for (name, value) in &element.attributes {
        if name.eq_ignore_ascii_case("style") {
            clone.style = StyleDeclaration::parse(value);
        } else {
            clone.attributes.push((name.clone(), value.clone()));
        }
    }
    clone
}

fn surface_image(surface: &SurfaceElement) -> Result<SnapshotElement> {
    let mut image = SnapshotElement::new("img");
    image.set_attr("src", &encode::png_data_url(&surface.pixels)?);
    Ok(image)
}

fn has_materialized(original: &Element, pseudo: PseudoElement) -> bool {
    original.children.iter().any(|child| match child {
        SourceNode::Element(e) => e.tag == "style" && e.attr(PSEUDO_MARKER_ATTR) == Some(pseudo.as_str()),
        _ => false,
    })
}

fn format_pseudo_element_style(class_name: &str, pseudo: PseudoElement, style: &ComputedStyle) -> String {
    let selector = format!(".{}:{}", class_name, pseudo.as_str());
    let css_text = match style.css_text.as_deref() {
        Some(text) if !text.is_empty() => {
            format!("{} content: {};", text, style.get_property_value("content"))
        }
        _ => {
            let props = style
                .properties
                .iter()
                .map(|p| {
                    let priority = if p.important { " !important" } else { "" };
                    format!("{}: {}{}", p.name, p.value, priority)
                })
                .collect::<Vec<_>>();
            format!("{};", props.join("; "))
        }
    };
    format!("{}{{{}}}", selector, css_text)
}

fn copy_user_input(original: &Element, clone: &mut SnapshotElement) {
    let Some(value) = &original.value else {
        return;
    };
    match original.tag.as_str() {
        "textarea" => clone.children = vec![Snapshot::Text(value.clone())],
        "input" => clone.set_attr("value", value),
        _ => {}
    }
}

fn fix_svg(clone: &mut SnapshotElement) {
    clone.set_attr("xmlns", SVG_NS);
    if clone.tag != "rect" {
        return;
    }
    for attribute in ["width", "height"] {
        if let Some(value) = clone.attr(attribute).map(str::to_string) {
            if !value.is_empty() {
                clone.style.set(attribute, &value, false);
            }
        }
    }
}
