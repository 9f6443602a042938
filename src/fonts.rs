//! Web font discovery and embedding.

use crate::engine::{CssRule, RenderEngine};
use crate::error::Result;
use crate::inliner;
use crate::loader::Loader;

/// A `@font-face` rule with at least one external source
#[derive(Debug, Clone)]
pub struct WebFont {
    rule: CssRule,
    base_url: Option<String>,
}

impl WebFont {
    /// The rule's `src` descriptor
    pub fn src(&self) -> &str {
        self.rule.style().and_then(|s| s.get("src")).unwrap_or("")
    }

    /// Rule text with every external source embedded
    pub async fn resolve(&self, loader: &dyn Loader) -> Result<String> {
        inliner::inline_all(&self.rule.css_text(), self.base_url.as_deref(), loader).await
    }
}

/// Collect eligible font rules from every readable sheet.
///
/// Sources resolve against the sheet URL, or the document URL for inline sheets.
pub fn read_all(engine: &dyn RenderEngine) -> Vec<WebFont> {
    let document_url = engine.base_url().map(str::to_string);
    let mut fonts = Vec::new();
    for sheet in engine.style_sheets() {
        let sheet = match sheet {
            Ok(sheet) => sheet,
            Err(e) => {
                log::warn!("Skipping style sheet: {}", e);
                continue;
            }
        };
        let base_url = sheet.href.or_else(|| document_url.clone());
        for rule in sheet.rules {
            if !rule.is_font_face() {
                continue;
            }
            let font = WebFont {
                rule,
                base_url: base_url.clone(),
            };
            if !inliner::find_references(font.src()).is_empty() {
                fonts.push(font);
            }
        }
    }
    fonts
}

/// Embedded rule text for all web fonts, newline-joined
pub async fn resolve_all(engine: &dyn RenderEngine, loader: &dyn Loader) -> Result<String> {
    let fonts = read_all(engine);
    log::debug!("embedding {} web font rule(s)", fonts.len());
    let resolved = futures::future::join_all(fonts.iter().map(|f| f.resolve(loader))).await;
    let css = resolved.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(css.join("\n"))
}
