//! Declaration blocks and computed style records.
//!
//! A [`StyleDeclaration`] is the ordered property list behind an inline
//! `style` attribute. A [`ComputedStyle`] is what the rendering engine reports
//! for one element (or one of its generated pseudo-elements); it may carry a
//! verbatim `cssText` or only the individual properties.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState, QualifiedRuleParser,
    RuleBodyItemParser, RuleBodyParser, Token,
};
use std::fmt;

/// A single `name: value [!important]` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: String,
    pub important: bool,
}

/// Ordered declaration block, as found in a `style` attribute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDeclaration {
    entries: Vec<Property>,
}

impl StyleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a declaration block (`color: red; background: url(a;b)`).
    ///
    /// Semicolons inside strings, functions and `url(...)` do not terminate a
    /// declaration, so data URLs survive intact. Malformed entries are dropped.
    pub fn parse(css_text: &str) -> Self {
        let mut input = ParserInput::new(css_text);
        let mut parser = Parser::new(&mut input);
        parse_declarations(&mut parser)
    }

    /// Replace the whole block, like assigning `style.cssText`
    pub fn set_css_text(&mut self, css_text: &str) {
        *self = Self::parse(css_text);
    }

    /// Serialize back to `name: value;` form
    pub fn css_text(&self) -> String {
        self.entries
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let name = normalize_name(name);
        self.entries
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn is_important(&self, name: &str) -> bool {
        let name = normalize_name(name);
        self.entries.iter().any(|p| p.name == name && p.important)
    }

    /// Set (or overwrite in place) a property. An empty value removes it.
    pub fn set(&mut self, name: &str, value: &str, important: bool) {
        let name = normalize_name(name);
        let value = value.trim();
        if value.is_empty() {
            self.remove(&name);
            return;
        }
        match self.entries.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                existing.value = value.to_string();
                existing.important = important;
            }
            None => self.entries.push(Property {
                name,
                value: value.to_string(),
                important,
            }),
        }
    }

    pub fn remove(&mut self, name: &str) {
        let name = normalize_name(name);
        self.entries.retain(|p| p.name != name);
    }

    /// Append all entries of `other`, later entries overriding earlier ones
    pub fn extend(&mut self, other: &StyleDeclaration) {
        for p in other.iter() {
            self.set(&p.name, &p.value, p.important);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.important {
            write!(f, "{}: {} !important;", self.name, self.value)
        } else {
            write!(f, "{}: {};", self.name, self.value)
        }
    }
}

/// Generated-content pseudo-elements that are materialized into rule text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoElement {
    Before,
    After,
}

impl PseudoElement {
    pub const ALL: [PseudoElement; 2] = [PseudoElement::Before, PseudoElement::After];

    pub fn as_str(&self) -> &'static str {
        match self {
            PseudoElement::Before => "before",
            PseudoElement::After => "after",
        }
    }
}

/// Resolved presentation of one element as reported by the rendering engine.
///
/// `css_text` is the verbatim serialization when the engine offers one;
/// engines that cannot serialize computed styles leave it `None` and the
/// record is copied property by property instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    pub css_text: Option<String>,
    pub properties: StyleDeclaration,
}

impl ComputedStyle {
    pub fn from_properties(properties: StyleDeclaration) -> Self {
        Self {
            css_text: None,
            properties,
        }
    }

    pub fn verbatim(css_text: impl Into<String>) -> Self {
        let css_text = css_text.into();
        let properties = StyleDeclaration::parse(&css_text);
        Self {
            css_text: Some(css_text),
            properties,
        }
    }

    /// Value of `name`, or the empty string when unset
    pub fn get_property_value(&self, name: &str) -> &str {
        self.properties.get(name).unwrap_or("")
    }

    pub fn has_css_text(&self) -> bool {
        self.css_text.as_deref().map(|t| !t.is_empty()).unwrap_or(false)
    }

    /// Copy this record onto an inline declaration block
    pub fn copy_to(&self, target: &mut StyleDeclaration) {
        match self.css_text.as_deref() {
            Some(text) if !text.is_empty() => target.set_css_text(text),
            _ => {
                for p in self.properties.iter() {
                    target.set(&p.name, &p.value, p.important);
                }
            }
        }
    }

    /// Numeric pixel value of a length property (`"12.5px"` → 12.5); 0 when unparseable
    pub fn px(&self, name: &str) -> f64 {
        parse_px(self.get_property_value(name)).unwrap_or(0.0)
    }
}

/// Parse a leading number out of a CSS length such as `"300px"`
pub fn parse_px(value: &str) -> Option<f64> {
    let value = value.trim();
    let value = value.strip_suffix("px").unwrap_or(value).trim();
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn normalize_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// Reads one `name: value [!important]` item of a declaration block
struct PropertyParser;

impl<'i> DeclarationParser<'i> for PropertyParser {
    type Declaration = Property;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _declaration_start: &ParserState,
    ) -> Result<Property, ParseError<'i, ()>> {
        let start = input.position();
        let mut end = start;
        let mut important = false;
        loop {
            let before = input.position();
            match input.next_including_whitespace_and_comments() {
                Err(_) => break,
                Ok(Token::WhiteSpace(_)) | Ok(Token::Comment(_)) => {}
                Ok(Token::Delim('!')) if !important => {
                    if input.try_parse(|p| p.expect_ident_matching("important")).is_ok() {
                        important = true;
                        end = before;
                    } else {
                        end = input.position();
                    }
                }
                Ok(_) if important => {}
                Ok(_) => end = input.position(),
            }
        }

        let value = input.slice(start..end).trim();
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(Property {
            name: normalize_name(&name),
            value: value.to_string(),
            important,
        })
    }
}

impl<'i> AtRuleParser<'i> for PropertyParser {
    type Prelude = ();
    type AtRule = Property;
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for PropertyParser {
    type Prelude = ();
    type QualifiedRule = Property;
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, Property, ()> for PropertyParser {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Read every declaration left in `input`, e.g. the inside of a rule block
pub(crate) fn parse_declarations(input: &mut Parser<'_, '_>) -> StyleDeclaration {
    let mut decl = StyleDeclaration::new();
    for item in RuleBodyParser::new(input, &mut PropertyParser) {
        match item {
            Ok(property) => decl.set(&property.name, &property.value, property.important),
            Err((_, text)) => log::debug!("dropping invalid declaration: {}", text.trim()),
        }
    }
    decl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_order_and_priority() {
        let d = StyleDeclaration::parse("color: red; margin: 0 !important;");
        let names: Vec<_> = d.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["color", "margin"]);
        assert!(d.is_important("margin"));
        assert_eq!(d.css_text(), "color: red; margin: 0 !important;");
    }

    #[test]
    fn data_urls_are_not_split() {
        let d = StyleDeclaration::parse("background: url(data:image/png;base64,QUJD) no-repeat; color: blue");
        assert_eq!(d.get("background"), Some("url(data:image/png;base64,QUJD) no-repeat"));
        assert_eq!(d.get("color"), Some("blue"));
    }

    #[test]
    fn strings_and_comments_are_tokenized() {
        let d = StyleDeclaration::parse(r#"content: "a; /* b"; /* note */ color: red /* x */ !important; broken; width: 1px"#);
        assert_eq!(d.get("content"), Some(r#""a; /* b""#));
        assert_eq!(d.get("color"), Some("red"));
        assert!(d.is_important("color"));
        assert_eq!(d.get("width"), Some("1px"));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn set_overwrites_in_place_and_empty_removes() {
        let mut d = StyleDeclaration::parse("a: 1; b: 2");
        d.set("A", "3", false);
        assert_eq!(d.css_text(), "a: 3; b: 2;");
        d.set("b", "", false);
        assert_eq!(d.css_text(), "a: 3;");
    }

    #[test]
    fn computed_style_copy_prefers_css_text() {
        let mut target = StyleDeclaration::parse("stale: yes");
        ComputedStyle::verbatim("color: red;").copy_to(&mut target);
        assert_eq!(target.css_text(), "color: red;");

        let mut target = StyleDeclaration::parse("kept: yes");
        ComputedStyle::from_properties(StyleDeclaration::parse("color: blue")).copy_to(&mut target);
        assert_eq!(target.css_text(), "kept: yes; color: blue;");
    }

    #[test]
    fn px_parsing() {
        assert_eq!(parse_px("300px"), Some(300.0));
        assert_eq!(parse_px(" 1.5px "), Some(1.5));
        assert_eq!(parse_px("auto"), None);
    }
}
