//! Runtime settings read from the environment (and `.env`, loaded by the binary).

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::geocode::DEFAULT_BASE_URL;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `CONGESTION_DATA_PATH`
    pub data_path: PathBuf,
    /// `CACHE_TTL_SECS`, applied to both the dataset and geocoding caches.
    pub cache_ttl: Duration,
    /// `GEOCODER_BASE_URL`
    pub geocoder_base_url: String,
    /// `GEOCODER_USER_AGENT`
    pub geocoder_user_agent: String,
    /// `GEOCODER_MIN_INTERVAL_MS`
    pub geocoder_min_interval: Duration,
    /// `GEOCODER_TIMEOUT_SECS`
    pub geocoder_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("subway_congestion.csv"),
            cache_ttl: Duration::from_secs(3600),
            geocoder_base_url: DEFAULT_BASE_URL.to_string(),
            geocoder_user_agent: concat!("subway_congestion/", env!("CARGO_PKG_VERSION"))
                .to_string(),
            geocoder_min_interval: Duration::from_millis(1000),
            geocoder_timeout: Duration::from_secs(10),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            data_path: lookup("CONGESTION_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            cache_ttl: parse_or(&lookup, "CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            geocoder_base_url: lookup("GEOCODER_BASE_URL").unwrap_or(defaults.geocoder_base_url),
            geocoder_user_agent: lookup("GEOCODER_USER_AGENT")
                .unwrap_or(defaults.geocoder_user_agent),
            geocoder_min_interval: parse_or(&lookup, "GEOCODER_MIN_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.geocoder_min_interval),
            geocoder_timeout: parse_or(&lookup, "GEOCODER_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.geocoder_timeout),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} has invalid value '{raw}'"))
        })
        .transpose()
}
