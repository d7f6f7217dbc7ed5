//! Network fetch boundary.
//!
//! [`Fetcher`] is the one primitive the archive builder and the directory
//! download sink need: URL in, bytes out. It must tolerate concurrent calls;
//! [`HttpFetcher`] shares one pooled `reqwest::Client`.
//!
//! Fetches are never retried; the caller decides what a failure means for
//! its batch.

use crate::config::FetchConfig;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const ERROR_BODY_LIMIT: usize = 300;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to read body: {0}")]
    Body(String),
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

/// `reqwest`-backed fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.into()))?;
        debug!(%url, "fetching");

        let response = self.client.get(parsed).send().await.map_err(|err| {
            warn!(
                %url,
                timeout = err.is_timeout(),
                connect = err.is_connect(),
                "fetch failed: {err}"
            );
            FetchError::Request(err.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = truncate_for_log(&body, ERROR_BODY_LIMIT);
            warn!(%url, status = status.as_u16(), "fetch returned non-success status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        debug!(%url, len = bytes.len(), "fetched");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_is_unchanged() {
        assert_eq!(truncate_for_log("not found", 20), "not found");
    }

    #[test]
    fn truncate_long_marks_truncation() {
        assert_eq!(truncate_for_log("abcdef", 3), "abc... (truncated)");
    }

    #[tokio::test]
    async fn invalid_url_fails_without_request() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(u) if u == "not a url"));
    }
}
