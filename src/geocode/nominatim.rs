use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Coordinates, GeocodeOutcome, Geocoder, RateLimiter};
use crate::fetch::{HttpClient, fetch_bytes};

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Nominatim returns coordinates as strings.
#[derive(Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim `/search` endpoint.
///
/// Requests are spaced by the rate limiter and each one is bounded by `timeout`;
/// the public instance allows one request per second.
pub struct NominatimGeocoder<C> {
    client: C,
    base_url: String,
    limiter: RateLimiter,
    timeout: Duration,
}

impl<C: HttpClient> NominatimGeocoder<C> {
    pub fn new(client: C, base_url: &str, min_interval: Duration, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(min_interval),
            timeout,
        }
    }

    fn search_url(&self, query: &str) -> Result<reqwest::Url> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("q", query), ("format", "json"), ("limit", "1")],
        )?;
        Ok(url)
    }

    /// Asks the provider for the best match. `Ok(None)` means "no such place".
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Option<Coordinates>> {
        let url = self.search_url(query)?;
        let body = fetch_bytes(&self.client, url).await?;
        debug!(bytes = body.len(), "Geocoding response received");
        parse_search_response(&body)
    }
}

/// Reads the first result of a Nominatim JSON search response.
pub fn parse_search_response(body: &[u8]) -> Result<Option<Coordinates>> {
    let places: Vec<Place> =
        serde_json::from_slice(body).context("unexpected geocoding response shape")?;

    places
        .into_iter()
        .next()
        .map(|place| {
            Ok(Coordinates {
                latitude: place
                    .lat
                    .parse()
                    .with_context(|| format!("invalid latitude '{}'", place.lat))?,
                longitude: place
                    .lon
                    .parse()
                    .with_context(|| format!("invalid longitude '{}'", place.lon))?,
            })
        })
        .transpose()
}

#[async_trait]
impl<C: HttpClient> Geocoder for NominatimGeocoder<C> {
    async fn geocode(&self, query: &str) -> GeocodeOutcome {
        self.limiter.wait().await;

        match tokio::time::timeout(self.timeout, self.search(query)).await {
            Ok(Ok(Some(coordinates))) => GeocodeOutcome::Found(coordinates),
            Ok(Ok(None)) => GeocodeOutcome::NotFound,
            Ok(Err(e)) => {
                warn!(query, error = %e, "Geocoding failed");
                GeocodeOutcome::Unavailable
            }
            Err(_) => {
                warn!(
                    query,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Geocoding timed out"
                );
                GeocodeOutcome::Unavailable
            }
        }
    }
}
