use crate::math;
use crate::{Quality, TrackPoint};

/// Fills interior runs of lost points no longer than `max_gap_frames` with positions
/// linearly interpolated between the measured points on either side.
///
/// Runs touching either end of the sequence, runs longer than the limit, and runs not
/// bounded by measured points on both sides stay lost. `t_ms` and `track_id` never change.
pub fn interpolate_short_gaps(points: &[TrackPoint], max_gap_frames: i32) -> Vec<TrackPoint> {
    let mut result = points.to_vec();
    if max_gap_frames <= 0 || result.len() < 3 {
        return result;
    }

    let max_gap = max_gap_frames as usize;
    let mut idx = 0;

    while idx < result.len() {
        if !result[idx].is_lost() {
            idx += 1;
            continue;
        }

        let mut end = idx;
        while end < result.len() && result[end].is_lost() {
            end += 1;
        }

        if idx > 0 && end < result.len() && end - idx <= max_gap {
            let (start_pt, end_pt) = (result[idx - 1], result[end]);

            if start_pt.quality == Quality::Measured && end_pt.quality == Quality::Measured {
                let span = (end - (idx - 1)) as f32;

                for (offset, point) in result[idx..end].iter_mut().enumerate() {
                    let alpha = (offset + 1) as f32 / span;
                    let center = math::lerp(start_pt.center(), end_pt.center(), alpha);

                    point.cx = center.x;
                    point.cy = center.y;
                    point.quality = Quality::Interpolated;
                }
            }
        }

        idx = end;
    }

    result
}
