use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::math;
use crate::TrackPoint;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub coverage: f64,
    pub gap_count: u32,
    pub longest_gap_ms: u64,
    pub distance: f32,
    pub jitter: f32,
}

/// Summary motion metrics over a finished (possibly interpolated) track.
///
/// `distance` and `jitter` only look at consecutive valid points after dropping lost
/// ones, so motion across a residual lost stretch is not counted.
pub fn compute_derived_metrics(points: &[TrackPoint]) -> DerivedMetrics {
    if points.is_empty() {
        return DerivedMetrics::default();
    }

    let covered = points.iter().filter(|p| p.quality.is_valid()).count();
    let coverage = covered as f64 / points.len() as f64;

    let mut gap_count = 0;
    let mut longest_gap_ms = 0;
    let mut gap_start: Option<u64> = None;

    for point in points {
        match (point.is_lost(), gap_start) {
            (true, None) => gap_start = Some(point.t_ms),
            (false, Some(start)) => {
                gap_count += 1;
                longest_gap_ms = longest_gap_ms.max(point.t_ms.saturating_sub(start));
                gap_start = None;
            }
            _ => {}
        }
    }

    if let (Some(start), Some(last)) = (gap_start, points.last()) {
        gap_count += 1;
        longest_gap_ms = longest_gap_ms.max(last.t_ms.saturating_sub(start));
    }

    let valid: Vec<na::Point2<f32>> = points
        .iter()
        .filter(|p| p.quality.is_valid())
        .map(TrackPoint::center)
        .collect();

    let steps: Vec<f32> = valid
        .windows(2)
        .map(|w| na::distance(&w[0], &w[1]))
        .collect();

    DerivedMetrics {
        coverage,
        gap_count,
        longest_gap_ms,
        distance: steps.iter().sum(),
        jitter: math::std_dev(&steps),
    }
}
