use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Provenance of a track point.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Measured,
    Interpolated,
    Lost,
}

impl Quality {
    /// Measured or interpolated, i.e. the point carries a usable position.
    #[inline(always)]
    pub fn is_valid(self) -> bool {
        !matches!(self, Quality::Lost)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    pub t_ms: u64,
    pub track_id: u32,
    pub cx: f32,
    pub cy: f32,
    pub quality: Quality,
}

impl TrackPoint {
    #[inline]
    pub fn new(t_ms: u64, track_id: u32, center: na::Point2<f32>, quality: Quality) -> Self {
        Self {
            t_ms,
            track_id,
            cx: center.x,
            cy: center.y,
            quality,
        }
    }

    #[inline(always)]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new(self.cx, self.cy)
    }

    #[inline(always)]
    pub fn is_lost(&self) -> bool {
        self.quality == Quality::Lost
    }
}
