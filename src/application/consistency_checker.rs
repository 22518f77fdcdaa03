// Consistency checker - Sampling regularity of each stream within the event window
use crate::domain::error::{AnalysisError, AnalysisResult};
use crate::domain::signal::{NanoTimestamp, Timestamped};
use crate::domain::trajectory::TimeWindow;
use serde::Serialize;
use std::collections::BTreeMap;

/// Sampling statistics of one stream, intervals in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamConsistency {
    pub data_points: usize,
    pub avg_interval: f64,
    pub std_dev_interval: f64,
    pub max_gap: f64,
    /// Percent. Reported as 0 when the mean interval is 0.
    pub coefficient_of_variation: f64,
}

/// First and last event timestamp, by full scan
pub fn event_window<T: Timestamped>(events: &[T]) -> AnalysisResult<TimeWindow> {
    if events.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "not enough events to define a range ({} found, 2 required)",
            events.len()
        )));
    }

    let first = events.iter().map(Timestamped::timestamp).min();
    let last = events.iter().map(Timestamped::timestamp).max();
    match (first, last) {
        (Some(start), Some(end)) => Ok(TimeWindow::new(start, end)),
        _ => Err(AnalysisError::InsufficientData(
            "not enough events to define a range".to_string(),
        )),
    }
}

/// Statistics for a set of timestamps already restricted to the window
pub fn interval_statistics(timestamps: &[NanoTimestamp]) -> StreamConsistency {
    let data_points = timestamps.len();
    if data_points < 2 {
        return StreamConsistency {
            data_points,
            ..Default::default()
        };
    }

    let intervals: Vec<f64> = timestamps
        .windows(2)
        .map(|pair| pair[1].seconds_since(pair[0]))
        .collect();
    let count = intervals.len() as f64;

    let avg_interval = intervals.iter().sum::<f64>() / count;
    let variance = intervals
        .iter()
        .map(|i| (i - avg_interval).powi(2))
        .sum::<f64>()
        / count;
    let std_dev_interval = variance.sqrt();
    let max_gap = intervals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let coefficient_of_variation = if avg_interval > 0.0 {
        100.0 * std_dev_interval / avg_interval
    } else {
        0.0
    };

    StreamConsistency {
        data_points,
        avg_interval,
        std_dev_interval,
        max_gap,
        coefficient_of_variation,
    }
}

/// Check every named stream between the first and last event (inclusive).
///
/// Fails with `InsufficientData` when fewer than two events are given.
pub fn check_consistency<K, T, E>(
    streams: &BTreeMap<K, Vec<T>>,
    events: &[E],
) -> AnalysisResult<BTreeMap<K, StreamConsistency>>
where
    K: Ord + Clone,
    T: Timestamped,
    E: Timestamped,
{
    let window = event_window(events)?;

    let report = streams
        .iter()
        .map(|(name, points)| {
            let mut in_range: Vec<NanoTimestamp> = points
                .iter()
                .map(Timestamped::timestamp)
                .filter(|ts| window.contains(*ts))
                .collect();
            in_range.sort_unstable();
            (name.clone(), interval_statistics(&in_range))
        })
        .collect();

    Ok(report)
}
