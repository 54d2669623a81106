use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::record::CongestionRecord;

/// Categorical columns a selection can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Line,
    Station,
    DayType,
    Direction,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Line,
        Dimension::Station,
        Dimension::DayType,
        Dimension::Direction,
    ];

    /// Header of the source column holding this dimension.
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Line => "호선",
            Dimension::Station => "출발역",
            Dimension::DayType => "요일구분",
            Dimension::Direction => "상하구분",
        }
    }

    pub fn value_of(self, record: &CongestionRecord) -> &str {
        match self {
            Dimension::Line => &record.line,
            Dimension::Station => &record.station,
            Dimension::DayType => &record.day_type,
            Dimension::Direction => &record.direction,
        }
    }
}

/// Exact-match constraints keyed by dimension. Dimensions not present are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dimensions(BTreeMap<Dimension, String>);

impl Dimensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        self.0.insert(dimension, value.into());
        self
    }

    /// Adds the constraint only when a value is given.
    pub fn with_opt(self, dimension: Dimension, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.with(dimension, v),
            None => self,
        }
    }

    pub fn get(&self, dimension: Dimension) -> Option<&str> {
        self.0.get(&dimension).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-sensitive string equality on every constrained dimension.
    pub fn matches(&self, record: &CongestionRecord) -> bool {
        self.0
            .iter()
            .all(|(dimension, wanted)| dimension.value_of(record) == wanted)
    }
}
