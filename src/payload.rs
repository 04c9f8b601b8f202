use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::config::ProcessingConfig;
use crate::error::Error;
use crate::metrics::DerivedMetrics;
use crate::{FrameDetection, TrackPoint};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSystem {
    Normalized,
    Pixels,
}

impl FromStr for CoordinateSystem {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "normalized" => Ok(CoordinateSystem::Normalized),
            "pixels" => Ok(CoordinateSystem::Pixels),
            _ => Err(Error::UnsupportedCoordinateSystem(name.to_string())),
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CoordinateSystem::Normalized => "normalized",
            CoordinateSystem::Pixels => "pixels",
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackerParams {
    pub track_id: u32,
    pub max_gap_frames: i32,
    pub interpolate_gaps: bool,
    pub process_fps: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CleaningParams {
    pub min_conf: f32,
    pub min_area_ratio: f32,
    pub max_area_ratio: f32,
    pub min_aspect_ratio: Option<f32>,
    pub max_aspect_ratio: Option<f32>,
    pub iou_weight: f32,
    pub conf_weight: f32,
    pub low_iou_reject_threshold: f32,
    pub low_iou_reject_patience: u32,
}

impl From<&ProcessingConfig> for CleaningParams {
    fn from(cfg: &ProcessingConfig) -> Self {
        Self {
            min_conf: cfg.min_conf,
            min_area_ratio: cfg.min_area_ratio,
            max_area_ratio: cfg.max_area_ratio,
            min_aspect_ratio: cfg.min_aspect_ratio,
            max_aspect_ratio: cfg.max_aspect_ratio,
            iou_weight: cfg.iou_weight,
            conf_weight: cfg.conf_weight,
            low_iou_reject_threshold: cfg.low_iou_reject_threshold,
            low_iou_reject_patience: cfg.low_iou_reject_patience,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMeta {
    pub detector: String,
    pub detector_runtime: String,
    pub detector_version: Option<String>,
    pub model_source: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detector_model: Option<String>,
    pub tracker: String,
    pub tracker_params: TrackerParams,
    pub cleaning: CleaningParams,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub coordinate_system: CoordinateSystem,
    pub video: VideoInfo,
    pub processing_meta: ProcessingMeta,
    pub frame_detections: Vec<FrameDetection>,
    pub track_points: Vec<TrackPoint>,
    pub derived_metrics: DerivedMetrics,
}

impl Payload {
    /// Rescales every box and centroid from normalized units to video pixels.
    ///
    /// Derived metrics stay in normalized units. Without known positive video dimensions
    /// the payload is left normalized.
    pub fn into_pixels(mut self) -> Self {
        if self.coordinate_system == CoordinateSystem::Pixels {
            return self;
        }

        if self.video.width == 0 || self.video.height == 0 {
            tracing::warn!(
                width = self.video.width,
                height = self.video.height,
                "unknown video dimensions, keeping normalized coordinates"
            );
            return self;
        }

        let (sx, sy) = (self.video.width as f32, self.video.height as f32);

        for det in &mut self.frame_detections {
            if let Some(bbox) = det.bbox.as_mut() {
                *bbox = bbox.scaled(sx, sy);
            }
        }

        for point in &mut self.track_points {
            point.cx *= sx;
            point.cy *= sy;
        }

        self.coordinate_system = CoordinateSystem::Pixels;
        self
    }
}
