//! Loading and querying the wide congestion table.
//!
//! The source CSV has one row per (line, station, day type, direction) and one
//! column per 30-minute bucket. A [`Dataset`] is built once and never mutated;
//! every query borrows from it.

mod dimensions;
mod record;

pub use dimensions::{Dimension, Dimensions};
pub use record::{CongestionRecord, LongRow};

use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::read::GzDecoder;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{CongestionError, SchemaError};

/// Every time bucket header contains this character ("5시30분", "06시00분", ...).
pub const HOUR_MARKER: char = '시';

/// Immutable congestion table with a single bucket schema shared by all records.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    bucket_labels: Vec<String>,
    records: Vec<CongestionRecord>,
}

/// Column positions resolved from the header row.
struct ColumnLayout {
    line: usize,
    station: usize,
    day_type: usize,
    direction: usize,
    buckets: Vec<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> Result<(Self, Vec<String>), SchemaError> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();

        let position = |dimension: Dimension| {
            names
                .iter()
                .position(|n| *n == dimension.column())
                .ok_or(SchemaError::MissingColumn(dimension.column()))
        };

        let line = position(Dimension::Line)?;
        let station = position(Dimension::Station)?;
        let day_type = position(Dimension::DayType)?;
        let direction = position(Dimension::Direction)?;
        let categorical = [line, station, day_type, direction];

        let (buckets, labels): (Vec<usize>, Vec<String>) = names
            .iter()
            .enumerate()
            .filter(|(i, n)| !categorical.contains(i) && n.contains(HOUR_MARKER))
            .map(|(i, n)| (i, n.to_string()))
            .unzip();

        if buckets.is_empty() {
            return Err(SchemaError::NoTimeBuckets(HOUR_MARKER));
        }

        Ok((
            Self {
                line,
                station,
                day_type,
                direction,
                buckets,
            },
            labels,
        ))
    }

    fn record(&self, row: &StringRecord) -> CongestionRecord {
        let cell = |i: usize| row.get(i).unwrap_or_default().to_string();
        CongestionRecord {
            line: cell(self.line),
            station: cell(self.station),
            day_type: cell(self.day_type),
            direction: cell(self.direction),
            values: self
                .buckets
                .iter()
                .map(|&i| parse_value(row.get(i).unwrap_or_default()))
                .collect(),
        }
    }
}

/// Empty, non-numeric and non-finite cells are absent, not zero.
fn parse_value(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl Dataset {
    /// Reads a congestion CSV from disk. Files ending in `.gz` are decompressed on the fly.
    ///
    /// # Errors
    ///
    /// [`CongestionError::DataUnavailable`] if the file cannot be opened or read,
    /// [`CongestionError::Schema`] if the header or a row does not fit the expected layout.
    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CongestionError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let file = File::open(path).map_err(|e| CongestionError::unavailable(&origin, e))?;

        let dataset = if path.extension().is_some_and(|ext| ext == "gz") {
            debug!("Decompressing gzip input");
            Self::read(GzDecoder::new(file), &origin)?
        } else {
            Self::read(file, &origin)?
        };

        info!(
            records = dataset.records.len(),
            buckets = dataset.bucket_labels.len(),
            "Congestion dataset loaded"
        );
        Ok(dataset)
    }

    /// Reads a congestion CSV from any byte stream.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CongestionError> {
        Self::read(reader, "<stream>")
    }

    fn read<R: Read>(reader: R, origin: &str) -> Result<Self, CongestionError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| CongestionError::from_csv(origin, e))?
            .clone();
        let (layout, bucket_labels) = ColumnLayout::from_headers(&headers)?;

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row.map_err(|e| CongestionError::from_csv(origin, e))?;
            records.push(layout.record(&row));
        }

        Ok(Self {
            bucket_labels,
            records,
        })
    }

    pub fn bucket_labels(&self) -> &[String] {
        &self.bucket_labels
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_labels.len()
    }

    pub fn records(&self) -> &[CongestionRecord] {
        &self.records
    }

    /// All records matching every given dimension, in file order. May be empty.
    pub fn filter(&self, dimensions: &Dimensions) -> Vec<&CongestionRecord> {
        self.records
            .iter()
            .filter(|r| dimensions.matches(r))
            .collect()
    }

    /// Unpivots records into one row per bucket.
    pub fn melt<'a, I>(&self, records: I) -> Vec<LongRow>
    where
        I: IntoIterator<Item = &'a CongestionRecord>,
    {
        records
            .into_iter()
            .flat_map(|r| {
                self.bucket_labels
                    .iter()
                    .enumerate()
                    .map(move |(i, label)| LongRow {
                        line: r.line.clone(),
                        station: r.station.clone(),
                        bucket: label.clone(),
                        value: r.value(i),
                    })
            })
            .collect()
    }

    /// Sorted distinct values of `dimension` among records matching `within`.
    pub fn distinct(&self, dimension: Dimension, within: &Dimensions) -> Vec<String> {
        let values: BTreeSet<&str> = self
            .records
            .iter()
            .filter(|r| within.matches(r))
            .map(|r| dimension.value_of(r))
            .collect();

        let mut values: Vec<String> = values.into_iter().map(str::to_string).collect();
        values.sort_by_key(|v| natural_key(v));
        values
    }
}

/// Integers first in numeric order ("2" before "10"), then everything else lexically.
fn natural_key(value: &str) -> (bool, i64, String) {
    match value.parse::<i64>() {
        Ok(n) => (false, n, String::new()),
        Err(_) => (true, 0, value.to_string()),
    }
}
