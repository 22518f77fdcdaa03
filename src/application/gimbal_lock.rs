// Gimbal-lock corrector - Remove ±360° wraparound jumps from Euler sequences
use crate::domain::signal::Quaternion;

/// Consecutive differences above this many degrees count as wraparound jumps
const JUMP_DEGREES: f64 = 180.0;

/// Upper bound for the boundary band around ±180°
const MAX_THRESHOLD_DEGREES: f64 = 30.0;

/// Correct each axis of a roll/pitch/yaw sequence (degrees) independently.
///
/// Axes without a jump larger than 180° are returned untouched. On an axis
/// with jumps, negative samples within `min(mean_jump / 2, 30)` degrees of
/// ±180° are shifted by +360°. This is a boundary nudge, not a phase unwrap.
pub fn fix_discontinuities(euler: &[[f64; 3]]) -> Vec<[f64; 3]> {
    let mut corrected = euler.to_vec();

    for axis in 0..3 {
        let angles: Vec<f64> = euler.iter().map(|e| e[axis]).collect();
        let Some(threshold) = axis_threshold(&angles) else {
            continue;
        };

        tracing::debug!(axis, threshold, "Correcting Euler wraparound");

        for sample in corrected.iter_mut() {
            let angle = sample[axis];
            if (angle.abs() - 180.0).abs() < threshold && angle < 0.0 {
                sample[axis] = angle + 360.0;
            }
        }
    }

    corrected
}

/// Boundary band for one axis, or `None` when the axis has no jump
fn axis_threshold(angles: &[f64]) -> Option<f64> {
    let jumps: Vec<f64> = angles
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .filter(|jump| *jump > JUMP_DEGREES)
        .collect();

    if jumps.is_empty() {
        return None;
    }

    let avg_jump = jumps.iter().sum::<f64>() / jumps.len() as f64;
    Some((avg_jump / 2.0).min(MAX_THRESHOLD_DEGREES))
}

/// Convert quaternions to Euler degrees and remove the wraparound jumps
pub fn quaternions_to_continuous_euler(quaternions: &[Quaternion]) -> Vec<[f64; 3]> {
    let euler: Vec<[f64; 3]> = quaternions.iter().map(Quaternion::to_euler_degrees).collect();
    fix_discontinuities(&euler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roll_only(values: &[f64]) -> Vec<[f64; 3]> {
        values.iter().map(|r| [*r, 0.0, 0.0]).collect()
    }

    #[test]
    fn test_roll_crossing_boundary() {
        let corrected = fix_discontinuities(&roll_only(&[170.0, 175.0, -178.0, -170.0]));
        let roll: Vec<f64> = corrected.iter().map(|e| e[0]).collect();
        assert_eq!(roll, vec![170.0, 175.0, 182.0, 190.0]);
    }

    #[test]
    fn test_no_jump_is_identity() {
        let input = vec![[10.0, -20.0, 170.0], [12.0, -25.0, 179.0], [15.0, -30.0, 178.0]];
        assert_eq!(fix_discontinuities(&input), input);
    }

    #[test]
    fn test_axes_are_independent() {
        let input = vec![[0.0, 175.0, -179.0], [1.0, -179.0, -178.0], [2.0, -175.0, -177.0]];
        let corrected = fix_discontinuities(&input);
        // pitch had a jump and is pulled up, yaw had none and keeps its negatives
        assert_eq!(
            corrected.iter().map(|e| e[1]).collect::<Vec<_>>(),
            vec![175.0, 181.0, 185.0]
        );
        assert_eq!(
            corrected.iter().map(|e| e[2]).collect::<Vec<_>>(),
            vec![-179.0, -178.0, -177.0]
        );
    }

    #[test]
    fn test_samples_far_from_boundary_are_kept() {
        let corrected = fix_discontinuities(&roll_only(&[179.0, -179.0, -90.0]));
        let roll: Vec<f64> = corrected.iter().map(|e| e[0]).collect();
        assert_eq!(roll, vec![179.0, 181.0, -90.0]);
    }

    #[test]
    fn test_outlier_jump_widens_band_up_to_cap() {
        // one 358° jump -> threshold capped at 30, so -155 (25 from boundary) moves
        let corrected = fix_discontinuities(&roll_only(&[179.0, -179.0, -155.0, -140.0]));
        let roll: Vec<f64> = corrected.iter().map(|e| e[0]).collect();
        assert_eq!(roll, vec![179.0, 181.0, 205.0, -140.0]);
    }

    #[test]
    fn test_empty_and_single_samples() {
        assert!(fix_discontinuities(&[]).is_empty());
        assert_eq!(fix_discontinuities(&[[-179.0, 0.0, 0.0]]), vec![[-179.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_quaternion_sequence_around_half_turn() {
        let angles_deg = [170.0_f64, 178.0, -178.0, -170.0];
        let quaternions: Vec<Quaternion> = angles_deg
            .iter()
            .map(|deg| {
                let half = deg.to_radians() / 2.0;
                Quaternion::new(half.sin(), 0.0, 0.0, half.cos())
            })
            .collect();

        let continuous = quaternions_to_continuous_euler(&quaternions);
        for pair in continuous.windows(2) {
            assert!((pair[1][0] - pair[0][0]).abs() < 180.0);
        }
    }

    proptest! {
        #[test]
        fn prop_single_crossing_is_idempotent(
            before in prop::collection::vec(150.0f64..180.0, 1..10),
            after in prop::collection::vec(-180.0f64..-150.0, 1..10),
        ) {
            let mut roll = before.clone();
            roll.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let mut tail = after.clone();
            tail.sort_by(|a, b| a.partial_cmp(b).unwrap());
            roll.extend(tail);
            prop_assume!((roll[before.len()] - roll[before.len() - 1]).abs() > 300.0);

            let once = fix_discontinuities(&roll_only(&roll));
            let twice = fix_discontinuities(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
