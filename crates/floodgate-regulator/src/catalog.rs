//! Client for the upstream catalog service.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use floodgate_types::Source;

/// Failures fetching or decoding the source listing. Every variant means
/// "skip this tick"; the regulator retries on its own cadence.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("catalog returned status {0}")]
    Status(u16),

    #[error("catalog payload malformed: {0}")]
    Malformed(String),
}

/// HTTP client for `GET /v1/sources`.
pub struct CatalogClient {
    http: reqwest::Client,
    endpoint: String,
}

impl CatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("floodgate/", env!("CARGO_PKG_VERSION")))
            .use_rustls_tls()
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/v1/sources", base_url.trim_end_matches('/')),
        })
    }

    /// Fetches the current source listing.
    ///
    /// Non-2xx responses and undecodable payloads are errors; no partial
    /// source list is ever returned.
    pub async fn fetch_sources(&self) -> Result<Vec<Source>, CatalogError> {
        let response = self.http.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        let sources: Vec<Source> =
            serde_json::from_str(&body).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        debug!(count = sources.len(), "fetched source listing");
        Ok(sources)
    }
}
