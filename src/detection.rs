use serde_derive::{Deserialize, Serialize};

use crate::bbox::BBox;

/// Class id the detector assigns to people.
pub const PERSON_CLASS: i32 = 0;

/// Raw detector output for one box, in normalized frame coordinates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BBox,
    #[serde(rename = "p")]
    pub conf: f32,
    #[serde(rename = "c")]
    pub cls: i32,
}

impl Detection {
    #[inline]
    pub fn new(bbox: BBox, conf: f32, cls: i32) -> Self {
        Self { bbox, conf, cls }
    }

    #[inline]
    pub fn person(bbox: BBox, conf: f32) -> Self {
        Self::new(bbox, conf, PERSON_CLASS)
    }

    #[inline(always)]
    pub fn is_person(&self) -> bool {
        self.cls == PERSON_CLASS
    }
}

/// Per processed frame record of what (if anything) was accepted.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameDetection {
    pub t_ms: u64,
    pub bbox: Option<BBox>,
    pub conf: Option<f32>,
}

impl FrameDetection {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bbox.is_none()
    }
}
