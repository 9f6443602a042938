//! Network fetcher used to pull external resources.

use crate::error::{Error, Result};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Terminal state of a fetch: status code and body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }
}

/// Fetches the raw bytes behind a URL.
///
/// A non-200 response is not an error at this layer; it is returned with
/// its status so the loader can apply its placeholder policy. Errors are
/// reserved for transport failures and timeouts.
pub trait ResourceFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse>>;
}

impl<T: ResourceFetcher + ?Sized> ResourceFetcher for Arc<T> {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse>> {
        (**self).fetch(url)
    }
}

/// reqwest-backed fetcher for `http(s)://` and `file://` URLs
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_ms: u64,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(config: &crate::LoaderConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &config.headers {
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::ConfigError(format!("Invalid header name {}: {}", name, e)))?;
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| Error::ConfigError(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_ms: config.timeout_ms,
        })
    }

    async fn fetch_http(&self, url: &str) -> Result<FetchResponse> {
        let resp = self.client.get(url).send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?.to_vec();
        Ok(FetchResponse { status, body })
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout_ms)
        } else {
            err.into()
        }
    }

    fn fetch_file(&self, url: &str) -> Result<FetchResponse> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        match std::fs::read(path) {
            Ok(body) => Ok(FetchResponse::ok(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FetchResponse::status(404)),
            Err(e) => Err(Error::NetworkError(format!("Failed to read {}: {}", path, e))),
        }
    }
}

#[cfg(feature = "http")]
impl ResourceFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse>> {
        Box::pin(async move {
            if url.starts_with("http://") || url.starts_with("https://") {
                self.fetch_http(url).await
            } else {
                self.fetch_file(url)
            }
        })
    }
}

#[cfg(all(test, feature = "http"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reports_404() {
        let fetcher = HttpFetcher::new(&crate::LoaderConfig::default()).unwrap();
        let resp = fetcher.fetch("file:///definitely/not/here.png").await.unwrap();
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn slow_server_is_a_timeout() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                std::thread::sleep(std::time::Duration::from_millis(500));
                let _ = request.respond(tiny_http::Response::from_string("late"));
            }
        });

        let cfg = crate::LoaderConfig {
            timeout_ms: 50,
            ..Default::default()
        };
        let fetcher = HttpFetcher::new(&cfg).unwrap();
        let res = fetcher.fetch(&format!("http://{}/slow.png", addr)).await;
        assert!(matches!(res, Err(Error::Timeout(50))));
    }

    #[test]
    fn invalid_header_is_a_config_error() {
        let mut cfg = crate::LoaderConfig::default();
        cfg.headers.insert("bad header".into(), "x".into());
        assert!(matches!(HttpFetcher::new(&cfg), Err(Error::ConfigError(_))));
    }
}
