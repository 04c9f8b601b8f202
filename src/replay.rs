//! Offline replay of recorded detections.
//!
//! A detections log has one line per frame, `<frame_index>: <json array of detections>`,
//! e.g. `12: [{"bbox":{"x":0.1,"y":0.2,"w":0.1,"h":0.3},"p":0.9,"c":0}]`. Frames missing
//! from the log have no detections. Blank lines are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use crate::detector::{Detector, DetectorKind};
use crate::error::Error;
use crate::frame::{Frame, VideoMeta, VideoSource};
use crate::Detection;

const MODEL_SOURCE: &str = "recorded";

#[derive(Debug, Clone, Default)]
pub struct DetectionLog {
    frames: BTreeMap<u64, Vec<Detection>>,
}

impl DetectionLog {
    pub fn parse(src: &str) -> Result<Self, Error> {
        let mut frames = BTreeMap::new();

        for (idx, line) in src.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (index, vector) = line.split_once(':').ok_or_else(|| Error::Replay {
                line: idx + 1,
                reason: "expected `:`".to_string(),
            })?;

            let index: u64 = index.trim().parse().map_err(|_| Error::Replay {
                line: idx + 1,
                reason: format!("bad frame index {:?}", index.trim()),
            })?;

            let dets: Vec<Detection> =
                serde_json::from_str(vector.trim()).map_err(|err| Error::Replay {
                    line: idx + 1,
                    reason: err.to_string(),
                })?;

            frames.insert(index, dets);
        }

        Ok(Self { frames })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|err| {
            tracing::debug!(?path, %err, "failed to read detections log");
            Error::VideoOpen {
                path: path.to_path_buf(),
            }
        })?;

        Self::parse(&src)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// One past the highest logged frame index.
    #[inline]
    pub fn frame_span(&self) -> u64 {
        self.frames.keys().next_back().map_or(0, |last| last + 1)
    }

    pub fn detector(&self) -> ReplayDetector {
        ReplayDetector {
            frames: self.frames.clone(),
        }
    }

    /// Frames `0..meta.frame_count`, or up to the last logged frame if the count is unknown.
    pub fn source(&self, meta: VideoMeta) -> ReplaySource {
        let frame_count = if meta.frame_count > 0 {
            meta.frame_count
        } else {
            self.frame_span()
        };

        ReplaySource {
            meta: VideoMeta { frame_count, ..meta },
            next_index: 0,
        }
    }
}

pub struct ReplaySource {
    meta: VideoMeta,
    next_index: u64,
}

impl VideoSource for ReplaySource {
    #[inline]
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
        if self.next_index >= self.meta.frame_count {
            return Ok(None);
        }

        let frame = Frame::empty(self.next_index);
        self.next_index += 1;

        Ok(Some(frame))
    }
}

pub struct ReplayDetector {
    frames: BTreeMap<u64, Vec<Detection>>,
}

impl Detector for ReplayDetector {
    #[inline]
    fn kind(&self) -> DetectorKind {
        DetectorKind::Replay
    }

    fn detect_frame(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error> {
        Ok(self.frames.get(&frame.index).cloned().unwrap_or_default())
    }

    fn model_source(&self) -> &str {
        MODEL_SOURCE
    }
}
