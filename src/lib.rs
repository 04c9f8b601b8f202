pub mod bbox;
pub mod config;
pub mod detection;
pub mod detector;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod interpolate;
pub mod metrics;
pub mod payload;
pub mod pipeline;
pub mod replay;
pub mod selector;
pub mod tracker;

#[cfg(feature = "opencv")]
pub mod video;

mod math;
mod track;

pub use bbox::BBox;
pub use config::ProcessingConfig;
pub use detection::{Detection, FrameDetection, PERSON_CLASS};
pub use error::{Error, ErrorKind};
pub use frame::{Frame, VideoMeta, VideoSource};
pub use pipeline::{run_pipeline, Pipeline};
pub use track::{Quality, TrackPoint};

/// Per-frame single target state machine driven by the pipeline.
pub trait Tracking {
    fn track_id(&self) -> u32;
    fn prev_bbox(&self) -> Option<&BBox>;
    fn lost_count(&self) -> u32;

    /// Consumes the accepted box for one processed frame (or its absence) and emits the
    /// frame record plus track point for it.
    fn update(
        &mut self,
        t_ms: u64,
        bbox: Option<BBox>,
        conf: Option<f32>,
    ) -> (FrameDetection, TrackPoint);
}
