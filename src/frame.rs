use ndarray::prelude::*;
use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

/// One decoded RGB frame (HWC) and its index in the source video.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: Array3<u8>,
}

impl Frame {
    #[inline]
    pub fn new(index: u64, image: Array3<u8>) -> Self {
        Self { index, image }
    }

    /// A frame carrying no pixels, for sources that only replay recorded detections.
    #[inline]
    pub fn empty(index: u64) -> Self {
        Self::new(index, Array3::zeros((0, 0, 3)))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: u64,
}

/// Decoded frames in playback order. `Ok(None)` marks the end of the video.
pub trait VideoSource {
    fn meta(&self) -> VideoMeta;
    fn next_frame(&mut self) -> Result<Option<Frame>, Error>;
}
