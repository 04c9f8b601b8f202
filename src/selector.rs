use crate::bbox::BBox;
use crate::config::ProcessingConfig;
use crate::Detection;

fn passes_size_and_shape(bbox: &BBox, config: &ProcessingConfig) -> bool {
    let area = bbox.area();
    if area < config.min_area_ratio || area > config.max_area_ratio {
        return false;
    }

    let aspect_ratio = match bbox.aspect_ratio() {
        Some(ar) => ar,
        None => return false,
    };

    if matches!(config.min_aspect_ratio, Some(min) if aspect_ratio < min) {
        return false;
    }

    if matches!(config.max_aspect_ratio, Some(max) if aspect_ratio > max) {
        return false;
    }

    true
}

#[inline]
fn is_candidate(det: &Detection, config: &ProcessingConfig) -> bool {
    det.is_person() && det.conf >= config.min_conf && passes_size_and_shape(&det.bbox, config)
}

/// Picks at most one detection as the instructor for the current frame.
///
/// Without a previous box the most confident candidate wins. Otherwise candidates are
/// scored by `iou_weight * IoU(prev) + conf_weight * conf`, and a best match whose IoU is
/// below `low_iou_reject_threshold` is refused until the tracker has been lost for
/// `low_iou_reject_patience` frames. Ties keep the first candidate in detector order.
pub fn select_detection(
    detections: &[Detection],
    prev_bbox: Option<&BBox>,
    lost_count: u32,
    config: &ProcessingConfig,
) -> Option<Detection> {
    let mut candidates = detections.iter().filter(|d| is_candidate(d, config));

    let prev = match prev_bbox {
        Some(prev) => prev,
        None => {
            let first = candidates.next()?;

            return Some(*candidates.fold(first, |best, det| {
                if det.conf > best.conf {
                    det
                } else {
                    best
                }
            }));
        }
    };

    let mut best: Option<(&Detection, f32, f32)> = None;
    for det in candidates {
        let iou = det.bbox.iou(prev);
        let score = config.iou_weight * iou + config.conf_weight * det.conf;

        match best {
            Some((_, best_score, _)) if score <= best_score => {}
            _ => best = Some((det, score, iou)),
        }
    }

    let (det, _, best_iou) = best?;

    // don't jump to another person during a short occlusion
    if best_iou < config.low_iou_reject_threshold && lost_count < config.low_iou_reject_patience {
        return None;
    }

    Some(*det)
}
