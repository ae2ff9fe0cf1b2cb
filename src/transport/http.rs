use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::model::ManuscriptPageMetadata;

use super::dzi::parse_dzi_descriptor;
use super::listing::parse_page_list;
use super::TileTransport;

/// Default manuscript viewer base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.bl.uk/manuscripts";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Retry Policy
// =============================================================================

/// Exponential backoff for retryable failures.
///
/// Attempt `n` (1-based) that fails is followed by a pause of
/// `backoff * 2^(n-1)`. Only failures for which
/// [`TransportError::is_retryable`] holds are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Base backoff delay
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Pause after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1u32 << exponent)
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL the viewer and proxy paths are appended to
    pub base_url: String,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Retry policy for the page listing
    pub listing_retry: RetryPolicy,

    /// Retry policy for page descriptors
    pub descriptor_retry: RetryPolicy,

    /// Retry policy for tiles
    pub tile_retry: RetryPolicy,
}

impl HttpTransportConfig {
    /// Default attempt counts with the given base backoff.
    pub fn with_backoff(backoff: Duration) -> Self {
        Self {
            listing_retry: RetryPolicy::new(3, backoff / 2),
            descriptor_retry: RetryPolicy::new(5, backoff),
            tile_retry: RetryPolicy::new(8, backoff),
            ..Self::default()
        }
    }
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("manuscript-fetch/{}", env!("CARGO_PKG_VERSION")),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            listing_retry: RetryPolicy::new(3, Duration::from_millis(100)),
            descriptor_retry: RetryPolicy::new(5, Duration::from_millis(200)),
            tile_retry: RetryPolicy::new(8, Duration::from_millis(200)),
        }
    }
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// [`TileTransport`] backed by the manuscript viewer's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Build a transport with its own connection pool.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Viewer page listing every page of the manuscript.
    pub fn viewer_url(&self, page_id: &str) -> String {
        format!("{}/Viewer.aspx?ref={}", self.base(), page_id)
    }

    /// DZI descriptor of one page.
    pub fn descriptor_url(&self, page_id: &str) -> String {
        format!("{}/Proxy.ashx?view={}.xml", self.base(), page_id)
    }

    /// One tile of one page at one zoom level.
    pub fn tile_url(&self, page_id: &str, zoom: u32, x: u32, y: u32) -> String {
        format!(
            "{}/Proxy.ashx?view={}_files/{}/{}_{}.jpg",
            self.base(),
            page_id,
            zoom,
            x,
            y
        )
    }

    async fn get(&self, url: &str, retry: RetryPolicy) -> Result<Bytes, TransportError> {
        let mut attempt = 1;
        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_retryable() && attempt < retry.max_attempts => {
                    let delay = retry.delay_for(attempt);
                    warn!(url, attempt, ?delay, error = %err, "Request failed, retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_once(&self, url: &str) -> Result<Bytes, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.bytes().await.map_err(|e| classify(url, e))
    }

    async fn get_text(&self, url: &str, retry: RetryPolicy) -> Result<String, TransportError> {
        let body = self.get(url, retry).await?;
        String::from_utf8(body.to_vec()).map_err(|e| TransportError::InvalidResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Map a reqwest failure onto the transport taxonomy.
fn classify(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(format!("{}: {}", url, err))
    } else if err.is_connect() || err.is_request() {
        TransportError::Connection(format!("{}: {}", url, err))
    } else if let Some(status) = err.status() {
        TransportError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        }
    } else if err.is_body() || err.is_decode() {
        TransportError::InvalidResponse {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else {
        TransportError::Connection(format!("{}: {}", url, err))
    }
}

#[async_trait]
impl TileTransport for HttpTransport {
    async fn fetch_page_list(&self, page_id: &str) -> Result<Vec<String>, TransportError> {
        let url = self.viewer_url(page_id);
        debug!(url = %url, "GET page list");

        let html = self.get_text(&url, self.config.listing_retry).await?;
        parse_page_list(&html).map_err(|message| TransportError::InvalidResponse { url, message })
    }

    async fn fetch_page_info(
        &self,
        page_id: &str,
    ) -> Result<ManuscriptPageMetadata, TransportError> {
        let url = self.descriptor_url(page_id);
        debug!(url = %url, "GET page info");

        let xml = self.get_text(&url, self.config.descriptor_retry).await?;
        parse_dzi_descriptor(page_id, &xml)
            .map_err(|message| TransportError::InvalidResponse { url, message })
    }

    async fn fetch_tile(
        &self,
        page_id: &str,
        zoom: u32,
        x: u32,
        y: u32,
    ) -> Result<Bytes, TransportError> {
        let url = self.tile_url(page_id, zoom, x, y);
        debug!(url = %url, "GET page tile");

        self.get(&url, self.config.tile_retry).await
    }
}
