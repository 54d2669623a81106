//! Station name → coordinates, for the map views.
//!
//! A lookup never fails a page: every problem (no match, timeout, HTTP error)
//! ends in a [`GeocodeOutcome`] and the caller leaves the marker out.

mod cached;
mod nominatim;
mod rate_limit;
mod station_table;

pub use cached::CachedGeocoder;
pub use nominatim::{DEFAULT_BASE_URL, NominatimGeocoder, parse_search_response};
pub use rate_limit::RateLimiter;
pub use station_table::StationTable;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Marker that distinguishes a station name from a neighbourhood of the same name.
const STATION_SUFFIX: char = '역';

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeocodeOutcome {
    Found(Coordinates),
    /// The provider answered and had no match.
    NotFound,
    /// The provider could not be asked (timeout, transport or HTTP error).
    Unavailable,
}

impl GeocodeOutcome {
    pub fn coordinates(self) -> Option<Coordinates> {
        match self {
            GeocodeOutcome::Found(c) => Some(c),
            GeocodeOutcome::NotFound | GeocodeOutcome::Unavailable => None,
        }
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> GeocodeOutcome;
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for Arc<G> {
    async fn geocode(&self, query: &str) -> GeocodeOutcome {
        self.as_ref().geocode(query).await
    }
}

/// Stands in for a remote provider when running offline: nothing is ever found.
pub struct NoProvider;

#[async_trait]
impl Geocoder for NoProvider {
    async fn geocode(&self, _query: &str) -> GeocodeOutcome {
        GeocodeOutcome::Unavailable
    }
}

/// Tries `first`, falling back to `second` when it has no coordinates.
pub struct Chained<A, B> {
    pub first: A,
    pub second: B,
}

#[async_trait]
impl<A: Geocoder, B: Geocoder> Geocoder for Chained<A, B> {
    async fn geocode(&self, query: &str) -> GeocodeOutcome {
        match self.first.geocode(query).await {
            found @ GeocodeOutcome::Found(_) => found,
            _ => self.second.geocode(query).await,
        }
    }
}

/// Search text for a station: the dataset stores "강남", geocoders know "강남역".
pub fn station_query(station: &str) -> String {
    let station = station.trim();
    if station.ends_with(STATION_SUFFIX) {
        station.to_string()
    } else {
        format!("{station}{STATION_SUFFIX}")
    }
}

/// Key under which a station name is matched and cached: trimmed, without the trailing `역`.
pub fn normalize_station(name: &str) -> &str {
    let name = name.trim();
    name.strip_suffix(STATION_SUFFIX).unwrap_or(name)
}
