//! HTTP transport for the reachability checker.
//!
//! The checker talks to the network only through [`Fetch`], so tests can
//! substitute an in-memory transport and the CLI can share a single
//! `reqwest::Client` (connection pool, user agent, timeout) across all rows.

use crate::config::CheckConfig;
use crate::error::{CheckError, GeorefError};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// A completed HTTP exchange. Any status code counts as a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Issues a single GET request. No retries; a failure is reported once.
pub trait Fetch: Send + Sync {
    fn get(&self, url: &str) -> impl Future<Output = Result<FetchResponse, CheckError>> + Send;
}

/// [`Fetch`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Build a client honouring the timeout and user agent in `config`.
    pub fn new(config: &CheckConfig) -> Result<Self, GeorefError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| GeorefError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one with custom TLS roots.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetch for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, CheckError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, &e))?;

        debug!("GET {} → {} ({} bytes)", url, status, body.len());
        Ok(FetchResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn transport_error(url: &str, e: &reqwest::Error) -> CheckError {
    let detail = if e.is_timeout() {
        "timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    };
    CheckError::Transport {
        url: url.to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        assert!(ReqwestFetcher::new(&CheckConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn unparseable_url_is_transport_error() {
        let fetcher = ReqwestFetcher::new(&CheckConfig::default()).unwrap();
        let err = fetcher.get("not a url").await.unwrap_err();
        assert!(matches!(err, CheckError::Transport { ref url, .. } if url == "not a url"));
    }
}
