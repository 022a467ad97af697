//! Single-tile fetching with retry.
//!
//! [`TileFetcher`] substitutes a tile index into a service URL template,
//! issues the request through an [`AsyncHttpClient`], and checks that the
//! body decodes as an image before handing it back. Retryable failures are
//! retried with exponential backoff; permanent ones fail on the first attempt.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::http::AsyncHttpClient;
use super::types::ProviderError;
use crate::coord::TileIndex;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts per tile.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the second attempt.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;

/// Retry and timeout settings for tile fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Timeout for one HTTP attempt
    pub timeout: Duration,
    /// Total attempts per tile, including the first (at least 1)
    pub max_retries: u32,
    /// Backoff before attempt `n + 1` is `retry_base_delay * 2^(n - 1)`
    pub retry_base_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Backoff to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.retry_base_delay.saturating_mul(1u32 << shift)
    }
}

/// Substitutes a tile index into a URL template.
///
/// Recognised placeholders are `{z}` (or `{zoom}`), `{x}` and `{y}`.
pub fn tile_url(template: &str, tile: TileIndex) -> String {
    template
        .replace("{zoom}", &tile.zoom.to_string())
        .replace("{z}", &tile.zoom.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
}

/// Fetches individual tiles from a slippy-map service.
pub struct TileFetcher<C> {
    client: Arc<C>,
    config: FetchConfig,
}

impl<C> Clone for TileFetcher<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
        }
    }
}

impl<C: AsyncHttpClient> TileFetcher<C> {
    pub fn new(client: C, config: FetchConfig) -> Self {
        Self::from_arc(Arc::new(client), config)
    }

    pub fn from_arc(client: Arc<C>, config: FetchConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches one tile, returning the raw encoded image bytes.
    ///
    /// `access_header` is sent as the `User-Agent` header when present.
    ///
    /// # Errors
    ///
    /// Returns the last [`ProviderError`] once attempts are exhausted, or the
    /// first permanent error.
    pub async fn fetch(
        &self,
        template: &str,
        tile: TileIndex,
        access_header: Option<&str>,
    ) -> Result<Vec<u8>, ProviderError> {
        let url = tile_url(template, tile);
        let attempts = self.config.max_retries.max(1);
        let mut last_error = ProviderError::HttpError("no attempt made".to_string());

        for attempt in 1..=attempts {
            debug!(tile = %tile, url = %url, attempt = attempt, "Tile fetch attempt");

            match self.fetch_once(&url, access_header).await {
                Ok(data) => {
                    trace!(tile = %tile, bytes = data.len(), attempt = attempt, "Tile fetched");
                    return Ok(data);
                }
                Err(e) => {
                    let retryable = e.is_retryable();
                    warn!(
                        tile = %tile,
                        attempt = attempt,
                        error = %e,
                        retryable = retryable,
                        "Tile fetch error"
                    );
                    last_error = e;
                    if !retryable {
                        break;
                    }
                }
            }

            if attempt < attempts {
                let backoff = self.config.backoff_for(attempt);
                trace!(backoff_ms = backoff.as_millis() as u64, "Backoff before retry");
                tokio::time::sleep(backoff).await;
            }
        }

        Err(last_error)
    }

    async fn fetch_once(
        &self,
        url: &str,
        access_header: Option<&str>,
    ) -> Result<Vec<u8>, ProviderError> {
        let request = async {
            match access_header {
                Some(value) => {
                    self.client
                        .get_with_headers(url, &[("User-Agent", value)])
                        .await
                }
                None => self.client.get(url).await,
            }
        };

        let data = tokio::time::timeout(self.config.timeout, request)
            .await
            .map_err(|_| ProviderError::Timeout {
                url: url.to_string(),
                secs: self.config.timeout.as_secs(),
            })??;

        validate_image(data).await
    }
}

/// Checks that a response body decodes as an image, handing the bytes back.
///
/// The format sniff rejects error pages cheaply; the full decode runs on the
/// blocking pool.
async fn validate_image(data: Vec<u8>) -> Result<Vec<u8>, ProviderError> {
    if data.is_empty() {
        return Err(ProviderError::InvalidResponse("empty body".to_string()));
    }
    image::guess_format(&data).map_err(|e| {
        ProviderError::InvalidResponse(format!("unrecognised image format: {}", e))
    })?;

    tokio::task::spawn_blocking(move || match image::load_from_memory(&data) {
        Ok(_) => Ok(data),
        Err(e) => Err(ProviderError::InvalidResponse(format!(
            "not a decodable image: {}",
            e
        ))),
    })
    .await
    .map_err(|e| ProviderError::InvalidResponse(format!("decode task failed: {}", e)))?
}
