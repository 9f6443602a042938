//! Style-sheet parsing for the static page engine.
//!
//! Each top-level `prelude { body }` block becomes one [`CssRule`].
//! `@font-face` bodies are parsed as declarations; other at-rules (including
//! nested `@media` blocks) are kept as raw text.

use crate::engine::{CssRule, StyleSheet};
use crate::style;
use cssparser::{AtRuleParser, CowRcStr, ParseError, Parser, ParserInput, ParserState, QualifiedRuleParser, StyleSheetParser, Token};

/// Parse sheet text loaded from `href` (`None` for inline `<style>`)
pub fn parse_stylesheet(text: &str, href: Option<&str>) -> StyleSheet {
    StyleSheet {
        href: href.map(str::to_string),
        rules: parse_rules(text),
    }
}

pub fn parse_rules(text: &str) -> Vec<CssRule> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut rules = Vec::new();
    for rule in StyleSheetParser::new(&mut parser, &mut RuleParser) {
        match rule {
            Ok(rule) => rules.push(rule),
            Err((_, text)) => log::debug!("skipping invalid rule: {}", text.trim()),
        }
    }
    rules
}

/// What an at-rule prelude announced
enum AtPrelude {
    FontFace,
    Other(String),
}

struct RuleParser;

impl<'i> AtRuleParser<'i> for RuleParser {
    type Prelude = AtPrelude;
    type AtRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<AtPrelude, ParseError<'i, ()>> {
        if name.eq_ignore_ascii_case("font-face") {
            consume_text(input);
            return Ok(AtPrelude::FontFace);
        }
        let prelude = collapse_whitespace(&consume_text(input));
        if prelude.is_empty() {
            Ok(AtPrelude::Other(name.to_string()))
        } else {
            Ok(AtPrelude::Other(format!("{} {}", &*name, prelude)))
        }
    }

    fn rule_without_block(&mut self, prelude: AtPrelude, _start: &ParserState) -> Result<CssRule, ()> {
        match prelude {
            AtPrelude::FontFace => Err(()),
            // statement at-rule such as `@import` or `@charset`
            AtPrelude::Other(header) => Ok(CssRule::Other(format!("@{};", header))),
        }
    }

    fn parse_block<'t>(
        &mut self,
        prelude: AtPrelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<CssRule, ParseError<'i, ()>> {
        match prelude {
            AtPrelude::FontFace => Ok(CssRule::FontFace {
                style: style::parse_declarations(input),
            }),
            AtPrelude::Other(header) => Ok(CssRule::Other(format!("@{} {{{}}}", header, consume_text(input)))),
        }
    }
}

impl<'i> QualifiedRuleParser<'i> for RuleParser {
    type Prelude = String;
    type QualifiedRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(&mut self, input: &mut Parser<'i, 't>) -> Result<String, ParseError<'i, ()>> {
        let selector = collapse_whitespace(&consume_text(input));
        if selector.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(selector)
    }

    fn parse_block<'t>(
        &mut self,
        selector: String,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<CssRule, ParseError<'i, ()>> {
        Ok(CssRule::Style {
            selector,
            style: style::parse_declarations(input),
        })
    }
}

/// Source text of the rest of `input` with comments blanked out
fn consume_text(input: &mut Parser<'_, '_>) -> String {
    let mut out = String::new();
    loop {
        let before = input.position();
        let comment = match input.next_including_whitespace_and_comments() {
            Err(_) => {
                // closes a trailing function or block
                out.push_str(input.slice_from(before));
                break;
            }
            Ok(token) => matches!(token, Token::Comment(_)),
        };
        if comment {
            out.push(' ');
        } else {
            out.push_str(input.slice_from(before));
        }
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
