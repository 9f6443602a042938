//! Document assembler: serializes a snapshot as XHTML and wraps it in an SVG
//! `foreignObject`, producing a percent-encoded `data:image/svg+xml` URI.

use crate::dom::{Snapshot, SnapshotElement, SVG_NS, XHTML_NS};
use crate::error::{Error, Result};

pub const SVG_DATA_URI_PREFIX: &str = "data:image/svg+xml;charset=utf-8,";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track",
    "wbr",
];

/// Vector data URI of `snapshot` on a `width`×`height` canvas
pub fn assemble(snapshot: &Snapshot, width: u32, height: u32) -> Result<String> {
    let document = svg_document(snapshot, width, height)?;
    Ok(format!("{}{}", SVG_DATA_URI_PREFIX, urlencoding::encode(&document)))
}

/// The SVG document itself, before percent-encoding
pub fn svg_document(snapshot: &Snapshot, width: u32, height: u32) -> Result<String> {
    let root = snapshot
        .as_element()
        .ok_or_else(|| Error::InvalidInput("capture root must be an element".into()))?;

    let mut xhtml = String::new();
    write_element(&mut xhtml, root, Some(XHTML_NS));

    Ok(format!(
        "<svg xmlns=\"{}\" width=\"{}\" height=\"{}\"><foreignObject x=\"0\" y=\"0\" width=\"100%\" height=\"100%\">{}</foreignObject></svg>",
        SVG_NS, width, height, xhtml
    ))
}

/// XML serialization of a snapshot subtree
pub fn serialize(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    write_node(&mut out, snapshot);
    out
}

fn write_node(out: &mut String, node: &Snapshot) {
    match node {
        Snapshot::Element(element) => write_element(out, element, None),
        Snapshot::Text(text) => out.push_str(&escape_text(text)),
        Snapshot::Comment(text) => {
            out.push_str("<!--");
            out.push_str(&escape_comment(text));
            out.push_str("-->");
        }
    }
}

fn write_element(out: &mut String, element: &SnapshotElement, xmlns: Option<&str>) {
    out.push('<');
    out.push_str(&element.tag);

    if let Some(ns) = xmlns {
        write_attr(out, "xmlns", ns);
    }
    for (name, value) in &element.attributes {
        if xmlns.is_some() && name.eq_ignore_ascii_case("xmlns") {
            continue;
        }
        write_attr(out, name, value);
    }
    if !element.style.is_empty() {
        write_attr(out, "style", &element.style.css_text());
    }

    if element.children.is_empty() && self_closes(element) {
        out.push_str(" />");
        return;
    }

    out.push('>');
    for child in &element.children {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_attr(value));
    out.push('"');
}

fn self_closes(element: &SnapshotElement) -> bool {
    VOID_ELEMENTS.contains(&element.tag.as_str()) || element.attr("xmlns") == Some(SVG_NS)
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Comment text with no `--` run and no trailing `-`
fn escape_comment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '-' && out.ends_with('-') {
            out.push(' ');
        }
        out.push(c);
    }
    if out.ends_with('-') {
        out.push(' ');
    }
    out
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello() -> Snapshot {
        let mut div = SnapshotElement::new("div");
        div.style.set("color", "red", false);
        div.children.push(Snapshot::Text("Hello".into()));
        div.children.push(Snapshot::Element(SnapshotElement::new("br")));
        Snapshot::Element(div)
    }

    #[test]
    fn serializes_xhtml_with_style_attribute() {
        assert_eq!(serialize(&hello()), r#"<div style="color: red;">Hello<br /></div>"#);
    }

    #[test]
    fn wraps_in_foreign_object() {
        let doc = svg_document(&hello(), 50, 20).unwrap();
        assert_eq!(
            doc,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"50\" height=\"20\">\
             <foreignObject x=\"0\" y=\"0\" width=\"100%\" height=\"100%\">\
             <div xmlns=\"http://www.w3.org/1999/xhtml\" style=\"color: red;\">Hello<br /></div>\
             </foreignObject></svg>"
        );
    }

    #[test]
    fn data_uri_is_percent_encoded() {
        let uri = assemble(&hello(), 10, 10).unwrap();
        assert!(uri.starts_with(SVG_DATA_URI_PREFIX));
        let body = &uri[SVG_DATA_URI_PREFIX.len()..];
        assert!(!body.contains('<') && !body.contains('#') && !body.contains(' '));
        let decoded = urlencoding::decode(body).unwrap();
        assert!(decoded.contains("<foreignObject"));
        assert!(decoded.contains("Hello"));
    }

    #[test]
    fn escapes_text_and_attributes() {
        let mut p = SnapshotElement::new("p");
        p.set_attr("title", "a \"b\" & <c>");
        p.children.push(Snapshot::Text("1 < 2 & 3".into()));
        assert_eq!(
            serialize(&Snapshot::Element(p)),
            r#"<p title="a &quot;b&quot; &amp; &lt;c&gt;">1 &lt; 2 &amp; 3</p>"#
        );
    }

    #[test]
    fn comments_stay_well_formed() {
        let comment = |text: &str| serialize(&Snapshot::Comment(text.into()));
        assert_eq!(comment("summary"), "<!--summary-->");
        assert_eq!(comment("a-"), "<!--a- -->");
        assert_eq!(comment("a---b"), "<!--a- - -b-->");
        assert_eq!(comment("-x"), "<!---x-->");
    }

    #[test]
    fn root_namespace_overrides_existing() {
        let mut svg = SnapshotElement::new("svg");
        svg.set_attr("xmlns", SVG_NS);
        let doc = svg_document(&Snapshot::Element(svg), 1, 1).unwrap();
        assert!(doc.contains(r#"<svg xmlns="http://www.w3.org/1999/xhtml" />"#));
    }

    #[test]
    fn text_root_is_rejected() {
        let res = assemble(&Snapshot::Text("x".into()), 1, 1);
        assert!(matches!(res, Err(Error::InvalidInput(_))));
    }
}
