//! Data types used by the hourly aggregation.

use serde::{Deserialize, Serialize};

use crate::dataset::{Dimension, Dimensions};

/// One station series request. `line` is optional because the same station
/// name can appear on several lines; leaving it out averages across them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub line: Option<String>,
    pub station: String,
    pub day_type: String,
    pub direction: String,
}

impl Selection {
    pub fn new(
        station: impl Into<String>,
        day_type: impl Into<String>,
        direction: impl Into<String>,
    ) -> Self {
        Self {
            line: None,
            station: station.into(),
            day_type: day_type.into(),
            direction: direction.into(),
        }
    }

    pub fn on_line(mut self, line: impl Into<String>) -> Self {
        self.line = Some(line.into());
        self
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new()
            .with_opt(Dimension::Line, self.line.as_deref())
            .with(Dimension::Station, self.station.as_str())
            .with(Dimension::DayType, self.day_type.as_str())
            .with(Dimension::Direction, self.direction.as_str())
    }
}

/// Average congestion over one hour (two consecutive 30-minute buckets).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyPoint {
    pub label: String,
    pub average: f64,
}

/// Hourly averages in chronological order.
///
/// `has_data` is false when no record matched the selection; every average is
/// then the zero sentinel, which callers must not read as real zero congestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlySeries {
    pub points: Vec<HourlyPoint>,
    pub has_data: bool,
}

impl HourlySeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn averages(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.average).collect()
    }

    /// The busiest hour, or `None` without data.
    pub fn peak(&self) -> Option<&HourlyPoint> {
        if !self.has_data {
            return None;
        }
        self.points
            .iter()
            .max_by(|a, b| a.average.total_cmp(&b.average))
    }
}
