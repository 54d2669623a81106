use tracing::debug;

use crate::aggregator::types::{HourlyPoint, HourlySeries, Selection};
use crate::aggregator::utility::mean_present;
use crate::dataset::{CongestionRecord, Dataset, Dimension, Dimensions, HOUR_MARKER};

/// Average reported for an hour with nothing to average.
pub const NO_DATA: f64 = 0.0;

/// Hourly congestion for one station, day type and direction, across every line
/// that has a matching row.
pub fn hourly_series(
    dataset: &Dataset,
    station: &str,
    day_type: &str,
    direction: &str,
) -> HourlySeries {
    let dimensions = Dimensions::new()
        .with(Dimension::Station, station)
        .with(Dimension::DayType, day_type)
        .with(Dimension::Direction, direction);
    series_matching(dataset, &dimensions)
}

/// Like [`hourly_series`], additionally restricted to `selection.line` when set.
pub fn series_for(dataset: &Dataset, selection: &Selection) -> HourlySeries {
    series_matching(dataset, &selection.dimensions())
}

/// Two independent selections, side by side.
pub fn compare(dataset: &Dataset, a: &Selection, b: &Selection) -> (HourlySeries, HourlySeries) {
    (series_for(dataset, a), series_for(dataset, b))
}

/// Collapses the matching rows into hourly averages.
///
/// Rows are averaged bucket by bucket first, so duplicate rows for a station
/// never resolve to an arbitrary one. Buckets are then paired (0,1), (2,3), ...
/// and a trailing odd bucket is dropped.
fn series_matching(dataset: &Dataset, dimensions: &Dimensions) -> HourlySeries {
    let matching = dataset.filter(dimensions);
    if matching.len() > 1 {
        debug!(
            rows = matching.len(),
            "Averaging duplicate rows for selection"
        );
    }

    let buckets = bucket_means(dataset.bucket_count(), &matching);
    let points = dataset
        .bucket_labels()
        .chunks_exact(2)
        .zip(buckets.chunks_exact(2))
        .map(|(labels, values)| HourlyPoint {
            label: hour_label(&labels[0]),
            average: mean_present(values.iter().copied()).unwrap_or(NO_DATA),
        })
        .collect();

    HourlySeries {
        points,
        has_data: !matching.is_empty(),
    }
}

fn bucket_means(bucket_count: usize, records: &[&CongestionRecord]) -> Vec<Option<f64>> {
    (0..bucket_count)
        .map(|i| mean_present(records.iter().map(|r| r.value(i))))
        .collect()
}

/// Cuts a bucket label just after the first hour marker: "5시30분" becomes "5시".
/// Labels without the marker are returned unchanged.
pub fn hour_label(bucket_label: &str) -> String {
    match bucket_label.find(HOUR_MARKER) {
        Some(idx) => bucket_label[..idx + HOUR_MARKER.len_utf8()].to_string(),
        None => bucket_label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(csv: &str) -> Dataset {
        Dataset::from_reader(csv.as_bytes()).unwrap()
    }

    fn single_station() -> Dataset {
        dataset(
            "호선,출발역,요일구분,상하구분,5시30분,6시00분,6시30분,7시00분\n\
             2,A,weekday,up,10,20,30,40\n",
        )
    }

    #[test]
    fn test_single_record_pairs_buckets() {
        let series = hourly_series(&single_station(), "A", "weekday", "up");
        assert!(series.has_data);
        assert_eq!(
            series.points,
            vec![
                HourlyPoint {
                    label: "5시".into(),
                    average: 15.0
                },
                HourlyPoint {
                    label: "6시".into(),
                    average: 35.0
                },
            ]
        );
    }

    #[test]
    fn test_absent_station_yields_sentinel_and_flag() {
        let series = hourly_series(&single_station(), "B", "weekday", "up");
        assert!(!series.has_data);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points[0].label, "5시");
        assert_eq!(series.points[1].label, "6시");
        assert!(series.points.iter().all(|p| p.average == NO_DATA));
        assert!(series.peak().is_none());
    }

    #[test]
    fn test_duplicate_rows_are_averaged() {
        let ds = dataset(
            "호선,출발역,요일구분,상하구분,5시30분,6시00분\n\
             2,A,weekday,up,10,20\n\
             7,A,weekday,up,30,60\n",
        );
        let series = hourly_series(&ds, "A", "weekday", "up");
        // bucket means are 20 and 40
        assert_eq!(series.averages(), vec![30.0]);
    }

    #[test]
    fn test_odd_bucket_count_drops_last_bucket() {
        let ds = dataset(
            "호선,출발역,요일구분,상하구분,5시30분,6시00분,6시30분,7시00분,7시30분\n\
             2,A,weekday,up,1,3,5,7,1000\n",
        );
        let series = hourly_series(&ds, "A", "weekday", "up");
        assert_eq!(series.averages(), vec![2.0, 6.0]);
    }

    #[test]
    fn test_absent_cells_are_skipped_within_pair() {
        let ds = dataset(
            "호선,출발역,요일구분,상하구분,5시30분,6시00분,6시30분,7시00분\n\
             2,A,weekday,up,,20,,\n",
        );
        let series = hourly_series(&ds, "A", "weekday", "up");
        assert!(series.has_data);
        assert_eq!(series.averages(), vec![20.0, NO_DATA]);
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let ds = single_station();
        let first = hourly_series(&ds, "A", "weekday", "up");
        let second = hourly_series(&ds, "A", "weekday", "up");
        assert_eq!(first, second);
    }

    #[test]
    fn test_length_is_half_bucket_count_regardless_of_data() {
        let ds = single_station();
        for station in ["A", "B"] {
            let series = hourly_series(&ds, station, "weekday", "up");
            assert_eq!(series.len(), ds.bucket_count() / 2);
        }
    }

    #[test]
    fn test_series_for_respects_line() {
        let ds = dataset(
            "호선,출발역,요일구분,상하구분,5시30분,6시00분\n\
             2,A,weekday,up,10,10\n\
             7,A,weekday,up,50,50\n",
        );
        let on_seven = Selection::new("A", "weekday", "up").on_line("7");
        assert_eq!(series_for(&ds, &on_seven).averages(), vec![50.0]);

        let any_line = Selection::new("A", "weekday", "up");
        assert_eq!(series_for(&ds, &any_line).averages(), vec![30.0]);
    }

    #[test]
    fn test_compare_uses_independent_selections() {
        let ds = dataset(
            "호선,출발역,요일구분,상하구분,5시30분,6시00분\n\
             2,A,weekday,up,10,10\n\
             3,B,sunday,down,70,90\n",
        );
        let (a, b) = compare(
            &ds,
            &Selection::new("A", "weekday", "up"),
            &Selection::new("B", "sunday", "down"),
        );
        assert_eq!(a.averages(), vec![10.0]);
        assert_eq!(b.averages(), vec![80.0]);
    }

    #[test]
    fn test_hour_label_truncates_at_first_marker() {
        assert_eq!(hour_label("5시30분"), "5시");
        assert_eq!(hour_label("05시00분시"), "05시");
        assert_eq!(hour_label("0530"), "0530");
    }

    #[test]
    fn test_peak_picks_busiest_hour() {
        let series = hourly_series(&single_station(), "A", "weekday", "up");
        assert_eq!(series.peak().map(|p| p.label.as_str()), Some("6시"));
    }
}
