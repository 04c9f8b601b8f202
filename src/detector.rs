use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ndarray::prelude::*;

use crate::bbox::BBox;
use crate::config::ProcessingConfig;
use crate::error::Error;
use crate::frame::Frame;
use crate::{Detection, PERSON_CLASS};

pub const DEFAULT_MODEL_SOURCE: &str = "ultralytics";

const BOX_OFFSET: usize = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DetectorKind {
    Yolov8n,
    Replay,
}

impl DetectorKind {
    pub const SUPPORTED: &'static str = "yolov8n, replay";

    #[inline]
    pub fn canonical_name(&self) -> &'static str {
        match self {
            DetectorKind::Yolov8n => "yolov8n",
            DetectorKind::Replay => "replay",
        }
    }
}

impl FromStr for DetectorKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "yolov8n" | "yolov8" | "yolo-v8n" | "yolo_v8n" => Ok(DetectorKind::Yolov8n),
            "replay" | "recorded" => Ok(DetectorKind::Replay),
            _ => Err(Error::UnsupportedDetector {
                name: name.to_string(),
                supported: Self::SUPPORTED.to_string(),
            }),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Turns a frame into person detections with normalized `[0, 1]` boxes.
pub trait Detector {
    fn kind(&self) -> DetectorKind;
    fn detect_frame(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error>;

    fn version(&self) -> Option<String> {
        None
    }

    fn model_source(&self) -> &str {
        DEFAULT_MODEL_SOURCE
    }

    /// Weights the detector was built from, if any.
    fn model_name(&self) -> Option<&str> {
        None
    }
}

/// The model runtime behind a [`YoloDetector`]: NCHW `f32` input in, raw prediction tensor out.
pub trait InferenceModel {
    fn run(&mut self, input: ArrayView4<'_, f32>) -> Result<ArrayD<f32>, Error>;

    fn version(&self) -> Option<String> {
        None
    }

    fn source(&self) -> &str {
        DEFAULT_MODEL_SOURCE
    }
}

#[derive(Debug, Clone)]
pub struct YoloDetectorConfig {
    pub imgsz: usize,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub classes: Vec<i32>,
}

impl YoloDetectorConfig {
    pub fn new(imgsz: usize) -> Self {
        Self {
            imgsz,
            confidence_threshold: 0.25,
            iou_threshold: 0.5,
            classes: vec![PERSON_CLASS],
        }
    }
}

pub struct YoloDetector<M: InferenceModel> {
    model: M,
    config: YoloDetectorConfig,
    model_name: Option<String>,
}

impl<M: InferenceModel> YoloDetector<M> {
    pub fn new(model: M, config: YoloDetectorConfig) -> Result<Self, Error> {
        if config.imgsz == 0 {
            return Err(Error::Config("detector_imgsz must be positive".to_string()));
        }

        Ok(Self {
            model,
            config,
            model_name: None,
        })
    }

    /// Builds the detector for a run: input size from `detector_imgsz`, and `model` is
    /// expected to be the weights named by `detector_model`.
    pub fn from_config(model: M, config: &ProcessingConfig) -> Result<Self, Error> {
        let model_name = config.detector_model.trim();
        if model_name.is_empty() {
            return Err(Error::Config("detector_model must not be empty".to_string()));
        }

        let imgsz = config.detector_imgsz as usize;
        let mut detector = Self::new(model, YoloDetectorConfig::new(imgsz))?;
        detector.model_name = Some(model_name.to_string());

        tracing::debug!(
            model = model_name,
            imgsz = config.detector_imgsz,
            device = %config.detector_device,
            "yolo detector configured"
        );

        Ok(detector)
    }

    /// Nearest-neighbour resize to a square `imgsz` input, scaled to `[0, 1]`.
    fn preprocess(&self, image: ArrayView3<'_, u8>) -> Array4<f32> {
        let size = self.config.imgsz;
        let (h, w, _) = image.dim();
        let mut input = Array4::zeros([1, 3, size, size]);

        for y in 0..size {
            let sy = (y * h / size).min(h - 1);
            for x in 0..size {
                let sx = (x * w / size).min(w - 1);
                for c in 0..3 {
                    input[[0, c, y, x]] = image[[sy, sx, c]] as f32 / 255.0;
                }
            }
        }

        input
    }

    fn postprocess(&self, output: ArrayD<f32>) -> Result<Vec<Detection>, Error> {
        let preds = output.into_dimensionality::<Ix3>()?;
        let shape = preds.shape();
        if shape[0] == 0 || shape[1] <= BOX_OFFSET {
            return Err(Error::Inference(format!(
                "unexpected prediction shape {:?}",
                shape
            )));
        }

        let size = self.config.imgsz as f32;
        let batch = preds.index_axis(Axis(0), 0);

        // grouped by class so suppression never crosses classes
        let mut bboxes: BTreeMap<i32, Vec<Detection>> = BTreeMap::new();

        for pred in batch.axis_iter(Axis(1)) {
            let (cx, cy, w, h) = (pred[0], pred[1], pred[2], pred[3]);

            let mut class_index = -1;
            let mut confidence = 0.0;

            for (idx, val) in pred.iter().skip(BOX_OFFSET).copied().enumerate() {
                if val > confidence {
                    class_index = idx as i32;
                    confidence = val;
                }
            }

            if class_index < 0 || confidence < self.config.confidence_threshold {
                continue;
            }

            if !self.config.classes.contains(&class_index) {
                continue;
            }

            let left = ((cx - w / 2.0) / size).clamp(0.0, 1.0);
            let top = ((cy - h / 2.0) / size).clamp(0.0, 1.0);
            let right = ((cx + w / 2.0) / size).clamp(0.0, 1.0);
            let bottom = ((cy + h / 2.0) / size).clamp(0.0, 1.0);

            let bbox = BBox::ltrb(left, top, right, bottom);
            if bbox.w <= 0.0 || bbox.h <= 0.0 {
                continue;
            }

            bboxes
                .entry(class_index)
                .or_insert_with(Vec::new)
                .push(Detection::new(bbox, confidence, class_index));
        }

        let mut results = Vec::new();
        for (_, mut dets) in bboxes {
            non_maximum_suppression(&mut dets, self.config.iou_threshold);
            results.append(&mut dets);
        }

        Ok(results)
    }
}

impl<M: InferenceModel> Detector for YoloDetector<M> {
    #[inline]
    fn kind(&self) -> DetectorKind {
        DetectorKind::Yolov8n
    }

    fn detect_frame(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let (_, _, channels) = frame.image.dim();
        if channels != 3 {
            return Err(Error::Detector(format!(
                "expected an RGB frame, got {} channels",
                channels
            )));
        }

        let input = self.preprocess(frame.image.view());
        let output = self.model.run(input.view())?;

        self.postprocess(output)
    }

    fn version(&self) -> Option<String> {
        self.model.version()
    }

    fn model_source(&self) -> &str {
        self.model.source()
    }

    fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }
}

/// Greedy suppression: keeps the most confident box and drops every later box overlapping
/// a kept one by more than `iou_threshold`. Leaves `dets` sorted by confidence.
pub fn non_maximum_suppression(dets: &mut Vec<Detection>, iou_threshold: f32) {
    dets.sort_by(|a, b| b.conf.total_cmp(&a.conf));

    let mut keep = vec![true; dets.len()];
    for idx in 0..dets.len() {
        if !keep[idx] {
            continue;
        }

        for other in idx + 1..dets.len() {
            if keep[other] && dets[idx].bbox.iou(&dets[other].bbox) > iou_threshold {
                keep[other] = false;
            }
        }
    }

    let mut flags = keep.into_iter();
    dets.retain(|_| flags.next().unwrap_or(false));
}
