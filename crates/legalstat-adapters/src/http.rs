//! # HTTP Remote Status Source
//!
//! Fetches the office view of a patent from a status gateway:
//!
//! ```text
//! GET {base_url}/patents/{patent_id}/legal-status
//! Authorization: Bearer {token}
//! ```
//!
//! The response body is a JSON [`RemoteStatusRecord`]. The full body is
//! kept as `raw_payload` when the gateway does not supply one.
//!
//! ## Error Mapping
//!
//! | Outcome | `PortError` |
//! |---------|-------------|
//! | 404 | `NotFound` |
//! | 5xx, transport failure, timeout | `Unavailable` |
//! | other 4xx | `Rejected` |
//! | undecodable body | `Serialization` |
//!
//! Transport failures are retried per [`RetryPolicy`]; HTTP responses are
//! not.

use std::time::Duration;

use async_trait::async_trait;
use legalstat_core::{PatentId, PortError, RemoteStatusRecord, RemoteStatusSource};
use thiserror::Error;
use url::Url;

use crate::retry::{retry_send, RetryPolicy};

/// Maximum number of response-body bytes quoted in error messages.
const BODY_EXCERPT: usize = 256;

/// Errors raised while building the HTTP source.
#[derive(Error, Debug)]
pub enum HttpSourceError {
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("base URL {0:?} cannot carry path segments")]
    OpaqueBaseUrl(String),

    #[error("bearer token contains characters not allowed in a header")]
    InvalidToken,

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Connection settings of [`HttpRemoteStatusSource`].
#[derive(Debug, Clone)]
pub struct HttpRemoteConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl HttpRemoteConfig {
    /// Defaults: no token, 30s timeout, default retry policy.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// `RemoteStatusSource` over an HTTP status gateway.
#[derive(Debug, Clone)]
pub struct HttpRemoteStatusSource {
    client: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl HttpRemoteStatusSource {
    pub fn new(config: HttpRemoteConfig) -> Result<Self, HttpSourceError> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|source| {
            HttpSourceError::InvalidBaseUrl {
                url: config.base_url.clone(),
                source,
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(HttpSourceError::OpaqueBaseUrl(config.base_url));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        if let Some(token) = &config.token {
            let mut value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| HttpSourceError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url,
            retry: config.retry,
        })
    }

    /// `{base}/patents/{id}/legal-status`, with the ID percent-encoded as a
    /// single path segment.
    pub fn status_url(&self, patent_id: &PatentId) -> Result<Url, PortError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PortError::Rejected(format!("base URL {} is opaque", self.base_url)))?
            .pop_if_empty()
            .extend(["patents", patent_id.as_str(), "legal-status"]);
        Ok(url)
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((cut, _)) => &body[..cut],
        None => body,
    }
}

#[async_trait]
impl RemoteStatusSource for HttpRemoteStatusSource {
    async fn fetch_remote_status(
        &self,
        patent_id: &PatentId,
    ) -> Result<RemoteStatusRecord, PortError> {
        let url = self.status_url(patent_id)?;
        let response = retry_send(self.retry, || self.client.get(url.clone()).send())
            .await
            .map_err(|e| PortError::Unavailable(format!("GET {url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Unavailable(format!("reading body of GET {url}: {e}")))?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PortError::NotFound(format!("no office record for {patent_id}")));
        }
        if status.is_server_error() {
            return Err(PortError::Unavailable(format!(
                "GET {url} returned {status}: {}",
                excerpt(&body)
            )));
        }
        if !status.is_success() {
            return Err(PortError::Rejected(format!(
                "GET {url} returned {status}: {}",
                excerpt(&body)
            )));
        }

        let payload: serde_json::Value = serde_json::from_str(&body)?;
        let mut record: RemoteStatusRecord = serde_json::from_value(payload.clone())?;
        if record.raw_payload.is_null() {
            record.raw_payload = payload;
        }
        tracing::debug!(patent_id = %patent_id, status = %record.status, "fetched office status");
        Ok(record)
    }

    fn source_name(&self) -> &str {
        "http"
    }
}
