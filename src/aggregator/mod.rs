//! Hourly congestion aggregation.
//!
//! Collapses the dataset's 30-minute buckets into hourly averages for a
//! station selection, tolerating duplicate rows and absent cells.

pub mod hourly;
pub mod types;
pub mod utility;

pub use hourly::{NO_DATA, compare, hour_label, hourly_series, series_for};
pub use types::{HourlyPoint, HourlySeries, Selection};
