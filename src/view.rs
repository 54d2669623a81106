//! Request → view-model handlers for the dashboard pages.
//!
//! Each handler takes the user's current selection and returns a serializable
//! view-model; nothing is kept between calls except the caches behind the
//! dataset and geocoder.

use serde::{Deserialize, Serialize};

use crate::aggregator::{HourlySeries, Selection, series_for};
use crate::dataset::{CongestionRecord, Dataset, Dimension, Dimensions, LongRow};
use crate::geocode::{Coordinates, Geocoder, station_query};

pub const FIRST_COLOR: &str = "red";
pub const SECOND_COLOR: &str = "blue";

/// Initial map view: central Seoul.
pub const SEOUL_CENTER: Coordinates = Coordinates {
    latitude: 37.55,
    longitude: 126.98,
};
pub const MAP_ZOOM: u8 = 12;

/// Values for the selection widgets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionOptions {
    pub lines: Vec<String>,
    /// Stations on the requested line, or on every line when none was given.
    pub stations: Vec<String>,
    pub day_types: Vec<String>,
    pub directions: Vec<String>,
}

pub fn options(dataset: &Dataset, line: Option<&str>) -> SelectionOptions {
    let everything = Dimensions::new();
    let on_line = Dimensions::new().with_opt(Dimension::Line, line);
    SelectionOptions {
        lines: dataset.distinct(Dimension::Line, &everything),
        stations: dataset.distinct(Dimension::Station, &on_line),
        day_types: dataset.distinct(Dimension::DayType, &everything),
        directions: dataset.distinct(Dimension::Direction, &everything),
    }
}

/// Raw rows for a table view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterView {
    pub bucket_labels: Vec<String>,
    pub records: Vec<CongestionRecord>,
    pub warning: Option<String>,
}

pub fn filter_view(dataset: &Dataset, dimensions: &Dimensions) -> FilterView {
    let records: Vec<CongestionRecord> =
        dataset.filter(dimensions).into_iter().cloned().collect();
    let warning = records
        .is_empty()
        .then(|| "no rows match the selected filters".to_string());
    FilterView {
        bucket_labels: dataset.bucket_labels().to_vec(),
        records,
        warning,
    }
}

/// One side of a comparison: a line and, once picked, a station on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationPick {
    pub line: String,
    #[serde(default)]
    pub station: Option<String>,
}

/// Two stations compared under a shared day type and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub first: StationPick,
    pub second: StationPick,
    pub day_type: String,
    pub direction: String,
}

impl ComparisonRequest {
    /// The picks with a station chosen, paired with their chart colour.
    fn picked(&self) -> Vec<(&StationPick, &'static str)> {
        [(&self.first, FIRST_COLOR), (&self.second, SECOND_COLOR)]
            .into_iter()
            .filter(|(pick, _)| pick.station.is_some())
            .collect()
    }

    fn selection(&self, pick: &StationPick) -> Option<Selection> {
        let station = pick.station.as_deref()?;
        Some(Selection::new(station, &self.day_type, &self.direction).on_line(&pick.line))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationPanel {
    pub title: String,
    pub color: &'static str,
    pub selection: Selection,
    pub series: HourlySeries,
    /// The 30-minute buckets behind the series, in long form.
    pub buckets: Vec<LongRow>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonView {
    pub title: String,
    pub panels: Vec<StationPanel>,
    pub warning: Option<String>,
}

pub fn comparison_view(dataset: &Dataset, request: &ComparisonRequest) -> ComparisonView {
    let (Some(first), Some(second)) = (
        request.selection(&request.first),
        request.selection(&request.second),
    ) else {
        return ComparisonView {
            title: String::new(),
            panels: Vec::new(),
            warning: Some("select a departure station on each line".to_string()),
        };
    };

    let title = format!(
        "{} ({}) vs {} ({})",
        first.station, FIRST_COLOR, second.station, SECOND_COLOR
    );
    let panels = vec![
        station_panel(dataset, first, FIRST_COLOR),
        station_panel(dataset, second, SECOND_COLOR),
    ];

    ComparisonView {
        title,
        panels,
        warning: None,
    }
}

fn station_panel(dataset: &Dataset, selection: Selection, color: &'static str) -> StationPanel {
    let series = series_for(dataset, &selection);
    let buckets = dataset.melt(dataset.filter(&selection.dimensions()));
    let warning = (!series.has_data).then(|| {
        format!(
            "no congestion data for {} ({}, {})",
            selection.station, selection.day_type, selection.direction
        )
    });

    StationPanel {
        title: format!("{} congestion", selection.station),
        color,
        selection,
        series,
        buckets,
        warning,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub station: String,
    pub line: String,
    pub popup: String,
    pub color: &'static str,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: Coordinates,
    pub zoom: u8,
    pub markers: Vec<Marker>,
    /// Picked stations that could not be placed on the map.
    pub unlocated: Vec<String>,
}

/// Places a marker for every picked station the geocoder can locate.
pub async fn map_view<G: Geocoder + ?Sized>(
    geocoder: &G,
    request: &ComparisonRequest,
) -> MapView {
    let mut markers = Vec::new();
    let mut unlocated = Vec::new();

    for (pick, color) in request.picked() {
        let Some(station) = pick.station.as_deref() else {
            continue;
        };
        match geocoder.geocode(&station_query(station)).await.coordinates() {
            Some(coordinates) => markers.push(Marker {
                station: station.to_string(),
                line: pick.line.clone(),
                popup: format!("{} ({}호선)", station, pick.line),
                color,
                coordinates,
            }),
            None => unlocated.push(station.to_string()),
        }
    }

    MapView {
        center: SEOUL_CENTER,
        zoom: MAP_ZOOM,
        markers,
        unlocated,
    }
}

/// Free-text place lookup centred on the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceView {
    pub place: String,
    pub coordinates: Option<Coordinates>,
    pub zoom: u8,
    pub message: String,
}

pub async fn place_view<G: Geocoder + ?Sized>(geocoder: &G, place: &str) -> PlaceView {
    let coordinates = geocoder.geocode(place).await.coordinates();
    let message = match coordinates {
        Some(c) => format!("{}: {}, {}", place, c.latitude, c.longitude),
        None => format!("location not found: {place}"),
    };

    PlaceView {
        place: place.to_string(),
        coordinates,
        zoom: MAP_ZOOM,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::StationTable;

    fn dataset() -> Dataset {
        Dataset::from_reader(
            "호선,출발역,요일구분,상하구분,5시30분,6시00분\n\
             2,강남,평일,상선,10,30\n\
             8,잠실,평일,상선,50,70\n\
             2,잠실,평일,상선,90,90\n"
                .as_bytes(),
        )
        .unwrap()
    }

    fn request(first: Option<&str>, second: Option<&str>) -> ComparisonRequest {
        ComparisonRequest {
            first: StationPick {
                line: "2".into(),
                station: first.map(str::to_string),
            },
            second: StationPick {
                line: "8".into(),
                station: second.map(str::to_string),
            },
            day_type: "평일".into(),
            direction: "상선".into(),
        }
    }

    #[test]
    fn test_options_scope_stations_to_line() {
        let opts = options(&dataset(), Some("8"));
        assert_eq!(opts.lines, ["2", "8"]);
        assert_eq!(opts.stations, ["잠실"]);
        assert_eq!(opts.directions, ["상선"]);
    }

    #[test]
    fn test_filter_view_warns_on_empty() {
        let view = filter_view(&dataset(), &Dimensions::new().with(Dimension::Line, "9"));
        assert!(view.records.is_empty());
        assert!(view.warning.is_some());
    }

    #[test]
    fn test_comparison_uses_line_of_each_pick() {
        let view = comparison_view(&dataset(), &request(Some("강남"), Some("잠실")));
        assert!(view.warning.is_none());
        assert_eq!(view.panels.len(), 2);
        assert_eq!(view.panels[0].series.averages(), vec![20.0]);
        // only the line 8 row for 잠실
        assert_eq!(view.panels[1].series.averages(), vec![60.0]);
        assert_eq!(view.panels[1].color, SECOND_COLOR);
        assert_eq!(view.panels[1].buckets.len(), 2);
    }

    #[test]
    fn test_comparison_requires_both_stations() {
        let view = comparison_view(&dataset(), &request(Some("강남"), None));
        assert!(view.panels.is_empty());
        assert!(view.warning.is_some());
    }

    #[test]
    fn test_panel_without_data_carries_warning() {
        let view = comparison_view(&dataset(), &request(Some("강남"), Some("강남")));
        assert!(view.panels[0].warning.is_none());
        assert!(!view.panels[1].series.has_data);
        assert!(view.panels[1].warning.is_some());
    }

    #[tokio::test]
    async fn test_map_view_skips_unlocated_stations() {
        let view = map_view(
            &StationTable::seoul(),
            &request(Some("강남"), Some("모란")),
        )
        .await;
        assert_eq!(view.markers.len(), 1);
        assert_eq!(view.markers[0].popup, "강남 (2호선)");
        assert_eq!(view.markers[0].color, FIRST_COLOR);
        assert_eq!(view.unlocated, ["모란"]);
        assert_eq!(view.center, SEOUL_CENTER);
    }

    #[tokio::test]
    async fn test_place_view_not_found() {
        let view = place_view(&StationTable::seoul(), "부산").await;
        assert!(view.coordinates.is_none());
        assert!(view.message.contains("not found"));
    }
}
