// Time normalizer - Put independently sampled streams on one relative axis
use crate::domain::signal::{NanoTimestamp, Timestamped};

/// Earliest timestamp over every point of every stream. `None` if all are empty.
pub fn global_start<T: Timestamped>(streams: &[&[T]]) -> Option<NanoTimestamp> {
    streams
        .iter()
        .flat_map(|stream| stream.iter().map(Timestamped::timestamp))
        .min()
}

/// Seconds since the earliest sample across all supplied streams.
///
/// Output order follows input order; sort streams first if a monotonic axis is
/// needed. If every stream is empty the result is one empty vector per stream.
pub fn normalize<T: Timestamped>(streams: &[&[T]]) -> Vec<Vec<f64>> {
    let Some(origin) = global_start(streams) else {
        return vec![Vec::new(); streams.len()];
    };

    streams
        .iter()
        .map(|stream| {
            stream
                .iter()
                .map(|point| point.timestamp().seconds_since(origin))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ts(values: &[i64]) -> Vec<NanoTimestamp> {
        values.iter().copied().map(NanoTimestamp).collect()
    }

    #[test]
    fn test_three_streams_share_one_origin() {
        let a = ts(&[5_000_000_000, 6_000_000_000]);
        let b = ts(&[7_000_000_000]);
        let c = ts(&[5_500_000_000, 8_000_000_000]);

        let relative = normalize(&[a.as_slice(), b.as_slice(), c.as_slice()]);
        assert_eq!(relative, vec![vec![0.0, 1.0], vec![2.0], vec![0.5, 3.0]]);
    }

    #[test]
    fn test_empty_streams_are_skipped_for_origin() {
        let empty: Vec<NanoTimestamp> = Vec::new();
        let a = ts(&[2_000_000_000, 3_000_000_000]);

        let relative = normalize(&[empty.as_slice(), a.as_slice()]);
        assert_eq!(relative, vec![vec![], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_all_empty_yields_empty_outputs() {
        let empty: Vec<NanoTimestamp> = Vec::new();
        assert_eq!(normalize(&[empty.as_slice(), empty.as_slice()]), vec![Vec::<f64>::new(), Vec::new()]);
        assert_eq!(global_start(&[empty.as_slice()]), None);
    }

    #[test]
    fn test_real_epoch_values_keep_precision() {
        let a = ts(&[1_718_000_000_000_000_123, 1_718_000_000_000_001_123]);
        let relative = normalize(&[a.as_slice()]);
        assert_eq!(relative[0][0], 0.0);
        assert!((relative[0][1] - 1e-6).abs() < 1e-15);
    }

    #[test]
    fn test_unsorted_input_is_not_sorted() {
        let a = ts(&[3_000_000_000, 1_000_000_000]);
        assert_eq!(normalize(&[a.as_slice()]), vec![vec![2.0, 0.0]]);
    }

    proptest! {
        #[test]
        fn prop_origin_is_zero_and_nothing_is_negative(
            streams in prop::collection::vec(
                prop::collection::vec(1_600_000_000_000_000_000i64..1_900_000_000_000_000_000i64, 0..20),
                1..5,
            )
        ) {
            let owned: Vec<Vec<NanoTimestamp>> = streams
                .iter()
                .map(|s| s.iter().copied().map(NanoTimestamp).collect())
                .collect();
            let refs: Vec<&[NanoTimestamp]> = owned.iter().map(|s| s.as_slice()).collect();
            let relative = normalize(&refs);

            let all: Vec<f64> = relative.iter().flatten().copied().collect();
            prop_assume!(!all.is_empty());
            prop_assert!(all.iter().all(|v| *v >= 0.0));
            let min = all.iter().copied().fold(f64::INFINITY, f64::min);
            prop_assert_eq!(min, 0.0);
        }
    }
}
