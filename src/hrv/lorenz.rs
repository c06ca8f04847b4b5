use std::f64::consts::SQRT_2;

use rolling_stats::Stats;
use serde::{Deserialize, Serialize};

use crate::signal::LorenzPoint;

/// Pair every RR interval with its successor
///
/// Point `i` is `(rri[i], rri[i + 1])`, so `n` intervals give `n - 1`
/// points and fewer than two give none.
pub fn project(rri: &[f64]) -> Vec<LorenzPoint> {
    rri.windows(2)
        .map(|pair| LorenzPoint {
            x: pair[0],
            y: pair[1],
        })
        .collect()
}

/// Spread of a Lorenz plot across and along the identity line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoincareDescriptors {
    /// Short-term variability, perpendicular to the identity line
    pub sd1: f64,
    /// Long-term variability, along the identity line
    pub sd2: f64,
}

/// SD1 and SD2 of a Lorenz plot
///
/// Sample standard deviations of the points rotated by 45 degrees. Needs at
/// least two points.
pub fn descriptors(points: &[LorenzPoint]) -> Option<PoincareDescriptors> {
    if points.len() < 2 {
        return None;
    }

    let mut across: Stats<f64> = Stats::new();
    let mut along: Stats<f64> = Stats::new();
    for p in points {
        across.update((p.y - p.x) / SQRT_2);
        along.update((p.y + p.x) / SQRT_2);
    }

    Some(PoincareDescriptors {
        sd1: across.std_dev,
        sd2: along.std_dev,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_project_pairs_successors() {
        let points = project(&[0.8, 0.9, 1.0]);
        assert_eq!(
            points,
            vec![
                LorenzPoint { x: 0.8, y: 0.9 },
                LorenzPoint { x: 0.9, y: 1.0 },
            ]
        );
    }

    #[test]
    fn test_project_short_input() {
        assert!(project(&[]).is_empty());
        assert!(project(&[1.0]).is_empty());
    }

    #[test]
    fn test_constant_rhythm_sits_on_identity() {
        let points = project(&[1.0; 10]);
        assert_eq!(points.len(), 9);
        assert!(points.iter().all(|p| p.x == p.y));

        let d = descriptors(&points).unwrap();
        assert_relative_eq!(d.sd1, 0.0);
        assert_relative_eq!(d.sd2, 0.0);
    }

    #[test]
    fn test_alternating_rhythm_spreads_across_identity() {
        let points = project(&[0.8, 1.0, 0.8, 1.0, 0.8, 1.0]);
        let d = descriptors(&points).unwrap();
        assert!(d.sd1 > 0.1);
        assert_relative_eq!(d.sd2, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_descriptors_need_two_points() {
        assert!(descriptors(&[]).is_none());
        assert!(descriptors(&[LorenzPoint { x: 1.0, y: 1.0 }]).is_none());
    }

    #[test]
    fn test_descriptors_known_values() {
        // Across-identity offsets of +-0.1/sqrt(2) with a fixed along component
        let points = [
            LorenzPoint { x: 1.0, y: 1.1 },
            LorenzPoint { x: 1.1, y: 1.0 },
        ];
        let d = descriptors(&points).unwrap();
        assert_relative_eq!(d.sd1, 0.1, epsilon = 1e-12);
        assert_relative_eq!(d.sd2, 0.0, epsilon = 1e-12);
    }
}
