#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Datastore API fetcher for the HDB resale datasets.
//!
//! The resale transaction history is split across four datastore
//! resources on data.gov.sg, each covering a distinct period. This crate
//! fetches them through the `datastore_search` endpoint using a two-phase
//! pattern: a probe request for the reported record total, then a single
//! request for exactly that many records.
//!
//! The HTTP transport sits behind the [`Datastore`] trait so the
//! two-phase protocol in [`fetch`] can be exercised against a scripted
//! fake in tests.

pub mod fetch;
pub mod registry;
pub mod resource_def;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

/// Base URL of the data.gov.sg API.
pub const DATASTORE_BASE_URL: &str = "https://data.gov.sg/api";

/// Browser-like User-Agent; the datastore rejects anonymous clients.
const DATASTORE_USER_AGENT: &str = "Mozilla/5.0";

/// Per-request timeout. The full-page request for the largest resource
/// returns a couple hundred thousand records in one response.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors that can occur during datastore operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Response envelope returned by `datastore_search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEnvelope {
    /// Whether the API reports the call as successful. A `false` flag is
    /// an empty contribution, not an error.
    pub success: bool,
    /// The search result; absent when `success` is `false`.
    #[serde(default)]
    pub result: Option<SearchResult>,
}

/// Payload of a successful `datastore_search` call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    /// Total records available for the resource, regardless of `limit`.
    pub total: u64,
    /// The records returned for this call.
    #[serde(default)]
    pub records: Vec<serde_json::Value>,
}

/// A `datastore_search` transport.
///
/// Implemented by [`HttpDatastore`] for real fetches and by scripted
/// fakes in tests, so the two-phase pagination protocol is testable
/// without network access.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Performs one `datastore_search` call for `limit` records.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request or envelope decode fails.
    async fn search(&self, resource_id: &str, limit: u64) -> Result<SearchEnvelope, SourceError>;
}

/// HTTP transport against the data.gov.sg datastore.
pub struct HttpDatastore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDatastore {
    /// Builds a transport against [`DATASTORE_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(DATASTORE_BASE_URL)
    }

    /// Builds a transport against a custom base URL (e.g., a local
    /// staging mirror).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(DATASTORE_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Datastore for HttpDatastore {
    async fn search(&self, resource_id: &str, limit: u64) -> Result<SearchEnvelope, SourceError> {
        let url = format!("{}/action/datastore_search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("resource_id", resource_id), ("limit", &limit.to_string())])
            .send()
            .await?;
        Ok(response.json().await?)
    }
}
