use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

use super::{GeocodeOutcome, Geocoder, normalize_station};
use crate::cache::TtlCache;

/// Remembers answers for `ttl`. Only definite answers are kept;
/// `Unavailable` is retried on the next lookup.
pub struct CachedGeocoder<G> {
    inner: G,
    key: fn(&str) -> &str,
    cache: Mutex<TtlCache<String, GeocodeOutcome>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    /// Caches per trimmed query text.
    pub fn new(inner: G, ttl: Duration) -> Self {
        Self::with_key(inner, ttl, str::trim)
    }

    /// Caches per station: "강남" and "강남역" share one entry.
    pub fn for_stations(inner: G, ttl: Duration) -> Self {
        Self::with_key(inner, ttl, normalize_station)
    }

    fn with_key(inner: G, ttl: Duration, key: fn(&str) -> &str) -> Self {
        Self {
            inner,
            key,
            cache: Mutex::new(TtlCache::new(ttl)),
        }
    }

    fn cache(&self) -> MutexGuard<'_, TtlCache<String, GeocodeOutcome>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn geocode(&self, query: &str) -> GeocodeOutcome {
        let key = (self.key)(query).to_string();

        let cached = self.cache().get(&key);
        if let Some(outcome) = cached {
            debug!(query, "Geocoding cache hit");
            return outcome;
        }

        let outcome = self.inner.geocode(query).await;
        if outcome != GeocodeOutcome::Unavailable {
            self.cache().insert(key, outcome);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::Coordinates;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        outcome: GeocodeOutcome,
    }

    impl Counting {
        fn new(outcome: GeocodeOutcome) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome,
            }
        }
    }

    #[async_trait]
    impl Geocoder for Counting {
        async fn geocode(&self, _query: &str) -> GeocodeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
        }
    }

    #[tokio::test]
    async fn test_found_is_cached_across_name_variants() {
        let found = GeocodeOutcome::Found(Coordinates {
            latitude: 37.5,
            longitude: 127.0,
        });
        let geocoder =
            CachedGeocoder::for_stations(Counting::new(found), Duration::from_secs(60));

        assert_eq!(geocoder.geocode("강남").await, found);
        assert_eq!(geocoder.geocode("강남역").await, found);
        assert_eq!(geocoder.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_place_queries_keep_their_own_entries() {
        let found = GeocodeOutcome::Found(Coordinates {
            latitude: 37.5,
            longitude: 127.0,
        });
        let geocoder = CachedGeocoder::new(Counting::new(found), Duration::from_secs(60));

        geocoder.geocode("서울").await;
        geocoder.geocode(" 서울 ").await;
        assert_eq!(geocoder.inner.calls.load(Ordering::SeqCst), 1);

        geocoder.geocode("서울역").await;
        assert_eq!(geocoder.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_cached() {
        let geocoder = CachedGeocoder::new(
            Counting::new(GeocodeOutcome::NotFound),
            Duration::from_secs(60),
        );
        geocoder.geocode("없는역").await;
        geocoder.geocode("없는역").await;
        assert_eq!(geocoder.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_is_retried() {
        let geocoder = CachedGeocoder::new(
            Counting::new(GeocodeOutcome::Unavailable),
            Duration::from_secs(60),
        );
        geocoder.geocode("강남").await;
        geocoder.geocode("강남").await;
        assert_eq!(geocoder.inner.calls.load(Ordering::SeqCst), 2);
    }
}
