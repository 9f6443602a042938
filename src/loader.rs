//! Resource loader: fetch a URL and hand back its base64 payload.
//!
//! The placeholder/cache-bust policy is a plain value carried by each loader
//! instance, built from one capture's options. Two captures never share it.

use crate::error::{Error, Result};
use crate::fetch::ResourceFetcher;
use crate::util;
use base64::Engine as Base64Engine;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

/// Fixed ceiling for one resource fetch
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Per-capture resource policy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadPolicy {
    /// Data URL whose payload replaces resources that fail to load
    pub image_placeholder: Option<String>,
    /// Append a timestamp query parameter to every fetched URL
    pub cache_bust: bool,
    /// Fail instead of degrading to an empty payload when no placeholder is set
    pub strict: bool,
}

impl LoadPolicy {
    fn placeholder_payload(&self) -> Option<&str> {
        self.image_placeholder.as_deref().and_then(util::data_url_payload)
    }
}

/// Anything that can turn a URL into a base64 payload.
///
/// The inliner is written against this trait so callers may substitute
/// their own resolution (caches, fixtures) for [`ResourceLoader`].
pub trait Loader: Send + Sync {
    fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>>;
}

impl<T: Loader + ?Sized> Loader for Arc<T> {
    fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>> {
        (**self).load(url)
    }
}

/// Default loader: fetch with timeout, base64-encode, fall back per policy
pub struct ResourceLoader {
    fetcher: Arc<dyn ResourceFetcher>,
    policy: LoadPolicy,
    timeout: Duration,
}

impl ResourceLoader {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, policy: LoadPolicy) -> Self {
        Self {
            fetcher,
            policy,
            timeout: Duration::from_millis(FETCH_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> &LoadPolicy {
        &self.policy
    }

    /// Fetch `url` and return its base64 payload (no `data:` prefix)
    pub async fn load_url(&self, url: &str) -> Result<String> {
        let url = if self.policy.cache_bust {
            util::cache_bust(url)
        } else {
            url.to_string()
        };

        log::debug!("fetching resource {}", url);
        match tokio::time::timeout(self.timeout, self.fetcher.fetch(&url)).await {
            Ok(Ok(resp)) if resp.status == 200 => {
                Ok(base64::engine::general_purpose::STANDARD.encode(&resp.body))
            }
            Ok(Ok(resp)) => self.fallback(&url, format!("status: {}", resp.status)),
            Ok(Err(Error::Timeout(ms))) => {
                self.fallback(&url, format!("timeout of {}ms occured", ms))
            }
            Ok(Err(e)) => self.fallback(&url, e.to_string()),
            Err(_) => self.fallback(
                &url,
                format!("timeout of {}ms occured", self.timeout.as_millis()),
            ),
        }
    }

    fn fallback(&self, url: &str, reason: String) -> Result<String> {
        if let Some(placeholder) = self.policy.placeholder_payload() {
            log::debug!("using placeholder for {} ({})", url, reason);
            return Ok(placeholder.to_string());
        }

        let err = Error::ResourceFetch {
            url: url.to_string(),
            reason,
        };
        if self.policy.strict {
            return Err(err);
        }
        // Without a placeholder the embed degrades to an empty payload
        log::error!("{}", err);
        Ok(String::new())
    }
}

impl Loader for ResourceLoader {
    fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.load_url(url))
    }
}
