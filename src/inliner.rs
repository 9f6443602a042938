//! Rewrites `url(...)` references inside style text into embedded data URLs.

use crate::error::Result;
use crate::loader::Loader;
use crate::util;
use regex::Regex;
use std::sync::OnceLock;

fn url_regex() -> &'static Regex {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    URL_REGEX.get_or_init(|| {
        Regex::new(r#"url\(['"]?([^'"]+?)['"]?\)"#).expect("static url() pattern")
    })
}

/// Whether `text` contains any `url(...)` reference at all
pub fn should_inline(text: &str) -> bool {
    url_regex().is_match(text)
}

/// Non-data URLs referenced by `text`, in first-occurrence order, without duplicates
pub fn find_references(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for caps in url_regex().captures_iter(text) {
        let url = &caps[1];
        if util::is_data_url(url) || urls.iter().any(|u| u == url) {
            continue;
        }
        urls.push(url.to_string());
    }
    urls
}

/// Rewrite relative references in `text` as absolute URLs against `base_url`,
/// leaving data URLs alone
pub fn resolve_references(text: &str, base_url: &str) -> String {
    url_regex()
        .replace_all(text, |caps: &regex::Captures| {
            let url = &caps[1];
            if util::is_data_url(url) {
                return caps[0].to_string();
            }
            splice(caps, &util::resolve_url(url, base_url))
        })
        .into_owned()
}

/// Replace every reference in `text` with its embedded form.
///
/// References are resolved one after another: each replacement's output is
/// the input of the next. A loader error aborts the whole operation.
pub async fn inline_all(text: &str, base_url: Option<&str>, loader: &dyn Loader) -> Result<String> {
    if !should_inline(text) {
        return Ok(text.to_string());
    }

    let mut out = text.to_string();
    for url in find_references(text) {
        out = inline(&out, &url, base_url, loader).await?;
    }
    Ok(out)
}

/// Replace all occurrences of one reference
pub async fn inline(text: &str, url: &str, base_url: Option<&str>, loader: &dyn Loader) -> Result<String> {
    let resolved = match base_url {
        Some(base) => util::resolve_url(url, base),
        None => url.to_string(),
    };
    let data = loader.load(&resolved).await?;
    let data_url = util::data_as_url(&data, util::mime_type(url));

    Ok(url_regex()
        .replace_all(text, |caps: &regex::Captures| {
            if &caps[1] == url {
                splice(caps, &data_url)
            } else {
                caps[0].to_string()
            }
        })
        .into_owned())
}

/// The whole `url(...)` match with its reference swapped for `replacement`
fn splice(caps: &regex::Captures, replacement: &str) -> String {
    let (Some(whole), Some(reference)) = (caps.get(0), caps.get(1)) else {
        return String::new();
    };
    let start = reference.start() - whole.start();
    let end = reference.end() - whole.start();
    let text = whole.as_str();
    format!("{}{}{}", &text[..start], replacement, &text[end..])
}
