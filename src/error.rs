use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used by callers to decide whether a run may be retried.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Io,
    Timeout,
    Runtime,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported detector_type '{name}'. Supported detector types: {supported}.")]
    UnsupportedDetector { name: String, supported: String },

    #[error("Unsupported tracker_type '{name}'. Supported tracker types: {supported}.")]
    UnsupportedTracker { name: String, supported: String },

    #[error("Unsupported coordinate system: {0}")]
    UnsupportedCoordinateSystem(String),

    #[error("Detector mismatch: configured '{configured}', got '{actual}'")]
    DetectorMismatch {
        configured: &'static str,
        actual: &'static str,
    },

    #[error("Config Error: {0}")]
    Config(String),

    #[error("Unable to open video: {path:?}")]
    VideoOpen { path: PathBuf },

    #[error("processing timeout after {timeout_seconds}s (read={frames_read}, processed={frames_processed})")]
    Timeout {
        timeout_seconds: u64,
        frames_read: u64,
        frames_processed: u64,
    },

    #[error("Detector Error: {0}")]
    Detector(String),

    #[error("Inference Error: {0}")]
    Inference(String),

    #[error("Replay Error: line {line}: {reason}")]
    Replay { line: usize, reason: String },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Toml Error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Shape Error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[cfg(feature = "opencv")]
    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedDetector { .. }
            | Error::UnsupportedTracker { .. }
            | Error::UnsupportedCoordinateSystem(_)
            | Error::DetectorMismatch { .. }
            | Error::Config(_)
            | Error::Toml(_) => ErrorKind::Configuration,
            Error::VideoOpen { .. } | Error::Io(_) => ErrorKind::Io,
            Error::Timeout { .. } => ErrorKind::Timeout,
            _ => ErrorKind::Runtime,
        }
    }
}
