// Deviation series assembler - Turn raw deviation rows into plot-ready series
use crate::application::segment_resolver::filter_by_segment;
use crate::domain::deviation::{CoordinatePair, DeviationPoint, DeviationRecord, SegmentKeyed};
use crate::domain::trajectory::TrajectoryTimes;
use serde::Serialize;

/// Parallel time (seconds) and distance vectors
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviationSeries {
    pub time: Vec<f64>,
    pub value: Vec<f64>,
}

impl DeviationSeries {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Series plus what a plot needs around it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssembledDeviation {
    pub series: DeviationSeries,
    /// Times where the segment id changes, for background shading
    pub transitions: Vec<f64>,
    pub pairs: Vec<CoordinatePair>,
}

/// Stable sort by `points_order`
pub fn sort_by_points_order<T: DeviationPoint>(records: &mut [T]) {
    records.sort_by_key(|r| r.points_order());
}

/// Time axis for `n` evenly spaced points.
///
/// Rows carry only an ordinal, so points are spread uniformly over the known
/// trajectory duration. Without both start and end times the index is used.
pub fn time_axis(n: usize, times: Option<&TrajectoryTimes>) -> Vec<f64> {
    let duration_ms = times.and_then(TrajectoryTimes::duration_ms);

    match duration_ms {
        None => (0..n).map(|i| i as f64).collect(),
        Some(_) if n <= 1 => vec![0.0; n],
        Some(duration_ms) => {
            let last = (n - 1) as f64;
            (0..n)
                .map(|i| (i as f64 / last) * duration_ms as f64 / 1000.0)
                .collect()
        }
    }
}

fn resolve_sorted<T: DeviationPoint + Clone>(raw: &[T], selector: &str) -> Vec<T> {
    let mut records = filter_by_segment(raw, selector);
    sort_by_points_order(&mut records);
    records
}

fn series_from_sorted<T: DeviationPoint>(
    sorted: &[T],
    times: Option<&TrajectoryTimes>,
) -> DeviationSeries {
    DeviationSeries {
        time: time_axis(sorted.len(), times),
        value: sorted.iter().map(DeviationPoint::distance).collect(),
    }
}

/// Filter by selector, order by `points_order` and attach a time axis
pub fn assemble<T: DeviationPoint + Clone>(
    raw: &[T],
    selector: &str,
    times: Option<&TrajectoryTimes>,
) -> DeviationSeries {
    let sorted = resolve_sorted(raw, selector);
    series_from_sorted(&sorted, times)
}

/// `time[i]` wherever the segment id differs from the previous record's
pub fn find_segment_transitions<T: SegmentKeyed>(sorted: &[T], time: &[f64]) -> Vec<f64> {
    sorted
        .windows(2)
        .zip(time.iter().skip(1))
        .filter(|(pair, _)| pair[0].segment_id() != pair[1].segment_id())
        .map(|(_, t)| *t)
        .collect()
}

/// Soll/ist coordinates in series order
pub fn assemble_pairs(sorted: &[DeviationRecord]) -> Vec<CoordinatePair> {
    sorted.iter().map(DeviationRecord::coordinates).collect()
}

/// Everything a deviation plot for one metric needs
pub fn assemble_plot(
    raw: &[DeviationRecord],
    selector: &str,
    times: Option<&TrajectoryTimes>,
) -> AssembledDeviation {
    let sorted = resolve_sorted(raw, selector);
    let series = series_from_sorted(&sorted, times);
    let transitions = find_segment_transitions(&sorted, &series.time);
    let pairs = assemble_pairs(&sorted);

    AssembledDeviation {
        series,
        transitions,
        pairs,
    }
}
