use serde::Serialize;

/// One row of the congestion table.
///
/// `values` is aligned with [`Dataset::bucket_labels`](super::Dataset::bucket_labels);
/// a `None` is a cell that was empty or not a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionRecord {
    pub line: String,
    pub station: String,
    pub day_type: String,
    pub direction: String,
    pub values: Vec<Option<f64>>,
}

impl CongestionRecord {
    pub fn value(&self, bucket: usize) -> Option<f64> {
        self.values.get(bucket).copied().flatten()
    }
}

/// A single (record, bucket) cell in long form, the shape bar charts consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRow {
    pub line: String,
    pub station: String,
    pub bucket: String,
    pub value: Option<f64>,
}
