use super::{parse_feature_collection, GeocodeError, GeocodeFeature, Geocoder};
use crate::config::GeocoderConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum spacing between outgoing requests
struct RateLimit {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl RateLimit {
    fn new(min_interval: Duration) -> Self {
        RateLimit {
            last_request: None,
            min_interval,
        }
    }

    /// Time still to wait before the next request may go out
    fn remaining(&self) -> Duration {
        match self.last_request {
            Some(last) => self.min_interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }
}

/// Nominatim client for free-text place search
///
/// # Request
/// `GET {base_url}/search?q=..&format=geojson&countrycodes=in,np&addressdetails=1`
///
/// # Rate Limiting
/// - Requests are spaced by `min_interval_ms` (1s by default, per the public
///   Nominatim usage policy)
/// - The limiter sits behind an async mutex, so overlapping lookups queue up
///   instead of bursting
///
/// # Error Handling
/// - Timeout: `NetworkTimeout`
/// - HTTP 429: `RateLimited` (no retry; the caller degrades to no results)
/// - Other non-2xx: `Http(status)`
/// - Body not a FeatureCollection: `Parse`
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    country_codes: Vec<String>,
    rate_limit: Mutex<RateLimit>,
}

impl NominatimClient {
    /// Client against the public Nominatim instance with default settings
    pub fn new() -> Self {
        Self::from_config(&GeocoderConfig::default())
    }

    pub fn from_config(config: &GeocoderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        NominatimClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            country_codes: config.country_codes.clone(),
            rate_limit: Mutex::new(RateLimit::new(Duration::from_millis(config.min_interval_ms))),
        }
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }

    /// Query string parameters for a lookup of `query`
    fn build_query(&self, query: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("format", "geojson".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        if !self.country_codes.is_empty() {
            params.push(("countrycodes", self.country_codes.join(",")));
        }
        params
    }

    /// Sleep until the rate limit allows another request, then claim the slot
    async fn respect_rate_limit(&self) {
        let mut limit = self.rate_limit.lock().await;
        let wait = limit.remaining();
        if !wait.is_zero() {
            log::debug!("Geocoder rate limit: waiting {} ms", wait.as_millis());
            tokio::time::sleep(wait).await;
        }
        limit.last_request = Some(Instant::now());
    }
}

impl Default for NominatimClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Geocoder for NominatimClient {
    async fn lookup(&self, query: &str) -> Result<Vec<GeocodeFeature>, GeocodeError> {
        self.respect_rate_limit().await;

        let response = self
            .client
            .get(self.search_url())
            .query(&self.build_query(query))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::NetworkTimeout
                } else {
                    GeocodeError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(GeocodeError::RateLimited);
        } else if !status.is_success() {
            return Err(GeocodeError::Http(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GeocodeError::Request(format!("Failed to read response: {}", e)))?;

        let features = parse_feature_collection(&body)?;
        log::debug!("Geocoder returned {} features for {:?}", features.len(), query);
        Ok(features)
    }
}
