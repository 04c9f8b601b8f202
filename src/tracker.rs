use std::fmt;
use std::str::FromStr;

use nalgebra as na;

use crate::bbox::BBox;
use crate::error::Error;
use crate::{FrameDetection, Quality, TrackPoint, Tracking};

/// Centroid reported while lost before anything was ever measured.
const UNSEEN_CENTER: (f32, f32) = (0.5, 0.5);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackerKind {
    SingleTargetIou,
}

impl TrackerKind {
    pub const SUPPORTED: &'static str = "single-target-iou";

    #[inline]
    pub fn canonical_name(&self) -> &'static str {
        match self {
            TrackerKind::SingleTargetIou => "single-target-iou",
        }
    }

    pub fn create(&self) -> Box<dyn Tracking> {
        match self {
            TrackerKind::SingleTargetIou => Box::new(SingleTargetTracker::new(1)),
        }
    }
}

impl FromStr for TrackerKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "single-target-iou" | "single_target_iou" | "iou-single" => {
                Ok(TrackerKind::SingleTargetIou)
            }
            _ => Err(Error::UnsupportedTracker {
                name: name.to_string(),
                supported: Self::SUPPORTED.to_string(),
            }),
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Follows one person. State is just the last accepted box and how many frames ago it was.
#[derive(Debug, Clone)]
pub struct SingleTargetTracker {
    track_id: u32,
    prev_bbox: Option<BBox>,
    lost_count: u32,
}

impl SingleTargetTracker {
    pub fn new(track_id: u32) -> Self {
        Self {
            track_id,
            prev_bbox: None,
            lost_count: 0,
        }
    }
}

impl Tracking for SingleTargetTracker {
    #[inline]
    fn track_id(&self) -> u32 {
        self.track_id
    }

    #[inline]
    fn prev_bbox(&self) -> Option<&BBox> {
        self.prev_bbox.as_ref()
    }

    #[inline]
    fn lost_count(&self) -> u32 {
        self.lost_count
    }

    fn update(
        &mut self,
        t_ms: u64,
        bbox: Option<BBox>,
        conf: Option<f32>,
    ) -> (FrameDetection, TrackPoint) {
        if let Some(bbox) = bbox {
            self.prev_bbox = Some(bbox);
            self.lost_count = 0;

            let det = FrameDetection {
                t_ms,
                bbox: Some(bbox),
                conf,
            };

            return (
                det,
                TrackPoint::new(t_ms, self.track_id, bbox.centroid(), Quality::Measured),
            );
        }

        self.lost_count += 1;

        let center = match &self.prev_bbox {
            Some(prev) => prev.centroid(),
            None => na::Point2::new(UNSEEN_CENTER.0, UNSEEN_CENTER.1),
        };

        let det = FrameDetection {
            t_ms,
            bbox: None,
            conf: None,
        };

        (
            det,
            TrackPoint::new(t_ms, self.track_id, center, Quality::Lost),
        )
    }
}
