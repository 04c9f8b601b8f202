use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Error;

/// All thresholds for one pipeline run. Built once, never mutated while a run is in progress.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProcessingConfig {
    /// `normalized` or `pixels`.
    pub coordinate_system: String,
    pub process_fps: f64,

    // candidate filtering
    pub min_conf: f32,
    pub min_area_ratio: f32,
    pub max_area_ratio: f32,
    pub min_aspect_ratio: Option<f32>,
    pub max_aspect_ratio: Option<f32>,

    // association
    pub iou_weight: f32,
    pub conf_weight: f32,
    pub low_iou_reject_threshold: f32,
    pub low_iou_reject_patience: u32,

    pub max_gap_frames: i32,
    pub interpolate_gaps: bool,

    pub detector_type: String,
    pub detector_model: String,
    pub detector_device: String,
    pub detector_imgsz: u32,
    pub tracker_type: String,

    pub processing_timeout_seconds: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            coordinate_system: "normalized".to_string(),
            process_fps: 10.0,
            min_conf: 0.4,
            min_area_ratio: 0.005,
            max_area_ratio: 0.60,
            min_aspect_ratio: Some(0.15),
            max_aspect_ratio: Some(4.0),
            iou_weight: 0.7,
            conf_weight: 0.3,
            low_iou_reject_threshold: 0.05,
            low_iou_reject_patience: 6,
            max_gap_frames: 5,
            interpolate_gaps: true,
            detector_type: "yolov8n".to_string(),
            detector_model: "yolov8n.onnx".to_string(),
            detector_device: "cpu".to_string(),
            detector_imgsz: 640,
            tracker_type: "single-target-iou".to_string(),
            processing_timeout_seconds: 1800,
        }
    }
}

impl ProcessingConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, Error> {
        Ok(toml::from_str(src)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let src = std::fs::read_to_string(path)?;

        Self::from_toml_str(&src)
    }
}
