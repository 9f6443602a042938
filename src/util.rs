//! Small helpers shared by the loader, inliner and replication engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 1×1 transparent GIF used when a video frame cannot be captured
pub const TRANSPARENT_PIXEL: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAP///wAAACH5BAEAAAAALAAAAAABAAEAAAICRAEAOw==";

/// Extension of the last path segment (`"a/b.PNG"` → `"PNG"`), or `""`
pub fn parse_extension(url: &str) -> &str {
    match url.rfind('.') {
        Some(idx) => {
            let ext = &url[idx + 1..];
            if ext.contains('/') || ext.contains('\\') {
                ""
            } else {
                ext
            }
        }
        None => "",
    }
}

/// MIME type guessed from a URL's extension; `""` when unknown
pub fn mime_type(url: &str) -> &'static str {
    const WOFF: &str = "application/font-woff";
    const JPEG: &str = "image/jpeg";

    match parse_extension(url).to_ascii_lowercase().as_str() {
        "woff" | "woff2" => WOFF,
        "ttf" => "application/font-truetype",
        "eot" => "application/vnd.ms-fontobject",
        "png" => "image/png",
        "jpg" | "jpeg" => JPEG,
        "gif" => "image/gif",
        "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => "",
    }
}

pub fn is_data_url(url: &str) -> bool {
    url.starts_with("data:")
}

/// `data:{mime};base64,{content}`
pub fn data_as_url(content: &str, mime: &str) -> String {
    format!("data:{};base64,{}", mime, content)
}

/// Payload segment of a data URL (everything after the first comma)
pub fn data_url_payload(data_url: &str) -> Option<&str> {
    data_url
        .split_once(',')
        .map(|(_, payload)| payload)
        .filter(|p| !p.is_empty())
}

/// Resolve `url` against `base_url`; unparseable bases leave `url` untouched
pub fn resolve_url(url: &str, base_url: &str) -> String {
    if let Ok(base) = url::Url::parse(base_url) {
        base.join(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
    } else {
        url.to_string()
    }
}

/// Append a timestamp query parameter so caches are bypassed
pub fn cache_bust(url: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, sep, millis)
}

/// Generator of class names for materialized pseudo-elements.
///
/// Each id is `u` + four random base-36 characters + a per-generator counter,
/// so ids never repeat within one generator and rarely collide across them.
#[derive(Debug, Default)]
pub struct UidGenerator {
    counter: AtomicUsize,
}

impl UidGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> String {
        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("u{}{}", four_random_chars(), index)
    }
}

fn four_random_chars() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    (0..4)
        .map(|_| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
        .collect()
}
