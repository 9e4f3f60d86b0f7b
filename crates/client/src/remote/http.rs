//! HTTP implementation of the remote object store.
//!
//! Conditional requests ride on the standard validator headers:
//! `if-none-match` on reads, `if-match` on writes, with the server's
//! `ETag` response header captured on every success. A send error with no
//! HTTP status is a transport failure and maps to the `Offline` outcome;
//! anything the server actually answered maps to an explicit outcome.

use async_trait::async_trait;
use daybook_core::{Error, QueuedWrite};
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use url::Url;

use super::{DeleteOutcome, GetOutcome, ObjectStore, PutOutcome, ReplayOutcome};

/// Configuration for the HTTP object store.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Base URL resource keys are appended to.
    pub base_url: String,
    /// User agent string (default: "daybook/0.1").
    pub user_agent: String,
    /// Request timeout (default: 20s).
    pub timeout: Duration,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            user_agent: "daybook/0.1".to_string(),
            timeout: Duration::from_millis(20_000),
        }
    }
}

impl From<&daybook_core::config::AppConfig> for HttpStoreConfig {
    fn from(config: &daybook_core::config::AppConfig) -> Self {
        Self {
            base_url: config.remote_base_url.clone(),
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
        }
    }
}

/// Remote object store over HTTP.
pub struct HttpStore {
    http: Client,
    base_url: String,
}

impl HttpStore {
    /// Create a new HTTP store with the given configuration.
    pub fn new(config: HttpStoreConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Http(format!("bad base URL {}: {}", config.base_url, e)))?
            .to_string()
            .trim_end_matches('/')
            .to_string();

        Ok(Self { http, base_url })
    }

    fn tag_from(headers: &header::HeaderMap) -> Option<String> {
        headers
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

/// A send error with no HTTP status means the request never got an answer.
fn is_offline(err: &reqwest::Error) -> bool {
    err.status().is_none()
}

#[async_trait]
impl ObjectStore for HttpStore {
    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }

    async fn get(&self, key: &str, if_none_match: Option<&str>) -> Result<GetOutcome, Error> {
        let url = self.url_for(key);
        let mut request = self.http.get(&url);
        if let Some(tag) = if_none_match {
            request = request.header(header::IF_NONE_MATCH, tag);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if is_offline(&e) => {
                tracing::debug!("GET {} unreachable: {}", url, e);
                return Ok(GetOutcome::Offline);
            }
            Err(e) => return Err(Error::Http(e.to_string())),
        };

        let status = response.status();
        match status {
            s if s.is_success() => {
                let tag = Self::tag_from(response.headers());
                if tag.is_none() {
                    tracing::warn!("GET {} succeeded without an ETag header", url);
                }
                let body = response
                    .text()
                    .await
                    .map_err(|e| Error::Http(format!("failed to read response: {}", e)))?;
                tracing::debug!("GET {} fresh ({} bytes)", url, body.len());
                Ok(GetOutcome::Fresh { body, tag })
            }
            StatusCode::NOT_MODIFIED => Ok(GetOutcome::NotModified),
            StatusCode::NOT_FOUND => Ok(GetOutcome::NotFound),
            s => Ok(GetOutcome::Rejected { status: s.as_u16() }),
        }
    }

    async fn put(&self, key: &str, body: &str, if_match: Option<&str>) -> Result<PutOutcome, Error> {
        let url = self.url_for(key);
        let mut request = self
            .http
            .put(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
        if let Some(tag) = if_match {
            request = request.header(header::IF_MATCH, tag);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if is_offline(&e) => {
                tracing::debug!("PUT {} unreachable: {}", url, e);
                return Ok(PutOutcome::Offline);
            }
            Err(e) => return Err(Error::Http(e.to_string())),
        };

        let status = response.status();
        match status {
            s if s.is_success() => {
                let tag = Self::tag_from(response.headers());
                if tag.is_none() {
                    tracing::warn!("PUT {} succeeded without an ETag header", url);
                }
                Ok(PutOutcome::Stored { tag })
            }
            StatusCode::PRECONDITION_FAILED => Ok(PutOutcome::PreconditionFailed),
            s => Ok(PutOutcome::Rejected { status: s.as_u16() }),
        }
    }

    async fn delete(&self, key: &str) -> Result<DeleteOutcome, Error> {
        let url = self.url_for(key);
        let response = match self.http.delete(&url).send().await {
            Ok(r) => r,
            Err(e) if is_offline(&e) => {
                tracing::debug!("DELETE {} unreachable: {}", url, e);
                return Ok(DeleteOutcome::Offline);
            }
            Err(e) => return Err(Error::Http(e.to_string())),
        };

        let status = response.status();
        match status {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(DeleteOutcome::Deleted),
            s => Ok(DeleteOutcome::Rejected { status: s.as_u16() }),
        }
    }

    async fn replay(&self, write: &QueuedWrite) -> Result<ReplayOutcome, Error> {
        let method = reqwest::Method::from_bytes(write.method.as_bytes())
            .map_err(|_| Error::Http(format!("bad queued method: {}", write.method)))?;

        let mut headers = header::HeaderMap::new();
        for (name, value) in &write.headers {
            let name = match header::HeaderName::from_bytes(name.as_bytes()) {
                Ok(n) => n,
                Err(_) => continue,
            };
            if let Ok(value) = header::HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }

        let mut request = self.http.request(method, &write.url).headers(headers);
        if let Some(body) = &write.body {
            request = request.body(body.clone());
        }

        match request.send().await {
            Ok(response) => {
                tracing::debug!("replayed {} {} -> {}", write.method, write.url, response.status());
                Ok(ReplayOutcome::Delivered)
            }
            Err(e) if is_offline(&e) => Ok(ReplayOutcome::Offline),
            Err(e) => Err(Error::Http(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = HttpStoreConfig::default();
        assert_eq!(config.user_agent, "daybook/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20_000));
    }

    #[test]
    fn test_store_new() {
        let store = HttpStore::new(HttpStoreConfig::default());
        assert!(store.is_ok());
    }

    #[test]
    fn test_url_for_joins_cleanly() {
        let store = HttpStore::new(HttpStoreConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            store.url_for("/u/entries/2024/06/10.json"),
            "http://localhost:9000/u/entries/2024/06/10.json"
        );
    }

    #[test]
    fn test_config_from_app_config() {
        let app = daybook_core::config::AppConfig::default();
        let config = HttpStoreConfig::from(&app);
        assert_eq!(config.base_url, app.remote_base_url);
        assert_eq!(config.timeout, app.timeout());
    }
}
