//! Output formatting and persistence for view-models and hourly series.
//!
//! Supports pretty-printing, JSON lines, and CSV append.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::aggregator::{HourlySeries, Selection};

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Writes a value as a single JSON line.
pub fn write_json<W: Write, T: Serialize>(mut writer: W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// One exported hour of a series.
#[derive(Debug, Serialize)]
struct SeriesRow<'a> {
    exported_at: DateTime<Utc>,
    line: Option<&'a str>,
    station: &'a str,
    day_type: &'a str,
    direction: &'a str,
    hour: &'a str,
    average: f64,
    has_data: bool,
}

/// Appends every hour of `series` as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_series(path: &str, selection: &Selection, series: &HourlySeries) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = series.len(), "Appending series to CSV");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    let exported_at = Utc::now();
    for point in &series.points {
        writer.serialize(SeriesRow {
            exported_at,
            line: selection.line.as_deref(),
            station: &selection.station,
            day_type: &selection.day_type,
            direction: &selection.direction,
            hour: &point.label,
            average: point.average,
            has_data: series.has_data,
        })?;
    }
    writer.flush()?;

    Ok(())
}
