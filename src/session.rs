//! A dashboard session: settings, the cached dataset and geocoders, and the
//! request dispatch shared by the CLI subcommands and the `serve` loop.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::aggregator::{HourlySeries, Selection, series_for};
use crate::cache::DatasetCache;
use crate::config::Settings;
use crate::dataset::{Dataset, Dimensions};
use crate::fetch::{BasicClient, UserAgent};
use crate::geocode::{
    CachedGeocoder, Chained, Geocoder, NoProvider, NominatimGeocoder, StationTable,
};
use crate::view::{
    self, ComparisonRequest, ComparisonView, FilterView, MapView, PlaceView, SelectionOptions,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    Options {
        #[serde(default)]
        line: Option<String>,
    },
    Filter {
        #[serde(default)]
        dimensions: Dimensions,
    },
    Hourly(Selection),
    Compare(ComparisonRequest),
    Map(ComparisonRequest),
    Geocode {
        place: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    Options(SelectionOptions),
    Filter(FilterView),
    Hourly(HourlySeries),
    Compare(ComparisonView),
    Map(MapView),
    Geocode(PlaceView),
    /// `fatal` errors come from loading the dataset; the session answers no
    /// further data queries after one.
    Error { message: String, fatal: bool },
}

impl Response {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Response::Error { fatal: true, .. })
    }
}

pub struct Session {
    settings: Settings,
    datasets: DatasetCache,
    /// Places picked stations on the comparison map.
    stations: Box<dyn Geocoder>,
    /// Answers free-text place lookups.
    places: Box<dyn Geocoder>,
    halted: Option<String>,
}

impl Session {
    pub fn new(
        settings: Settings,
        stations: Box<dyn Geocoder>,
        places: Box<dyn Geocoder>,
    ) -> Self {
        Self {
            datasets: DatasetCache::new(settings.cache_ttl),
            settings,
            stations,
            places,
            halted: None,
        }
    }

    /// Stations are geocoded through the fixed table, then Nominatim; place
    /// lookups go to Nominatim only. Both share one rate-limited client. With
    /// `offline` only the table is used and place lookups find nothing.
    pub fn from_settings(settings: Settings, offline: bool) -> Result<Self> {
        let ttl = settings.cache_ttl;
        if offline {
            return Ok(Self::new(
                settings,
                Box::new(CachedGeocoder::for_stations(StationTable::seoul(), ttl)),
                Box::new(NoProvider),
            ));
        }

        let client = UserAgent::new(
            BasicClient::with_timeout(settings.geocoder_timeout)?,
            &settings.geocoder_user_agent,
        )?;
        let remote = Arc::new(NominatimGeocoder::new(
            client,
            &settings.geocoder_base_url,
            settings.geocoder_min_interval,
            settings.geocoder_timeout,
        ));
        let stations = CachedGeocoder::for_stations(
            Chained {
                first: StationTable::seoul(),
                second: Arc::clone(&remote),
            },
            ttl,
        );
        let places = CachedGeocoder::new(remote, ttl);
        Ok(Self::new(settings, Box::new(stations), Box::new(places)))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs `answer` against the loaded dataset. A load failure halts every
    /// later data query with the same fatal error.
    fn with_dataset(&mut self, answer: impl FnOnce(&Dataset) -> Response) -> Response {
        if let Some(message) = &self.halted {
            return Response::Error {
                message: message.clone(),
                fatal: true,
            };
        }

        match self.datasets.get_or_load(&self.settings.data_path) {
            Ok(dataset) => answer(dataset.as_ref()),
            Err(e) => {
                error!(error = %e, "Dataset load failed, halting data queries");
                let message = e.to_string();
                self.halted = Some(message.clone());
                Response::Error {
                    message,
                    fatal: true,
                }
            }
        }
    }

    /// Answers one request. Never fails: problems become [`Response::Error`].
    #[tracing::instrument(skip(self))]
    pub async fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Options { line } => self.with_dataset(|dataset| {
                Response::Options(view::options(dataset, line.as_deref()))
            }),
            Request::Filter { dimensions } => self.with_dataset(|dataset| {
                Response::Filter(view::filter_view(dataset, &dimensions))
            }),
            Request::Hourly(selection) => self.with_dataset(|dataset| {
                let series = series_for(dataset, &selection);
                if !series.has_data {
                    warn!(station = %selection.station, "No congestion data for selection");
                } else if let Some(peak) = series.peak() {
                    info!(station = %selection.station, peak_hour = %peak.label, peak = peak.average, "Hourly series computed");
                }
                Response::Hourly(series)
            }),
            Request::Compare(request) => self.with_dataset(|dataset| {
                Response::Compare(view::comparison_view(dataset, &request))
            }),
            Request::Map(request) => {
                Response::Map(view::map_view(self.stations.as_ref(), &request).await)
            }
            Request::Geocode { place } => {
                Response::Geocode(view::place_view(self.places.as_ref(), &place).await)
            }
        }
    }

    /// Parses one JSON request line and answers it.
    pub async fn handle_line(&mut self, line: &str) -> Response {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => Response::Error {
                message: format!("invalid request: {e}"),
                fatal: false,
            },
        }
    }
}
