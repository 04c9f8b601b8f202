use std::time::{Duration, Instant};

use crate::config::ProcessingConfig;
use crate::detector::{Detector, DetectorKind};
use crate::diagnostics::{Diagnostics, DiagnosticsGuard, DiagnosticsSink};
use crate::error::Error;
use crate::frame::VideoSource;
use crate::interpolate::interpolate_short_gaps;
use crate::metrics::compute_derived_metrics;
use crate::payload::{
    CleaningParams, CoordinateSystem, Payload, ProcessingMeta, TrackerParams, VideoInfo,
};
use crate::selector::select_detection;
use crate::tracker::TrackerKind;
use crate::Quality;

/// Assumed when the source cannot report its frame rate.
pub const DEFAULT_SOURCE_FPS: f64 = 30.0;

/// Number of decoded frames per processed frame.
pub fn frame_stride(source_fps: f64, process_fps: f64) -> u64 {
    if source_fps <= 0.0 || process_fps <= 0.0 || process_fps >= source_fps {
        return 1;
    }

    ((source_fps / process_fps).round_ties_even() as u64).max(1)
}

/// Presentation time of a decoded frame, from its index in the source video.
#[inline]
pub fn frame_time_ms(frame_index: u64, source_fps: f64) -> u64 {
    (frame_index as f64 / source_fps.max(1.0) * 1000.0) as u64
}

/// One configured run. Detector, tracker and coordinate system are resolved up front so a
/// bad name fails before any frame is read.
#[derive(Debug)]
pub struct Pipeline {
    config: ProcessingConfig,
    detector_kind: DetectorKind,
    tracker_kind: TrackerKind,
    coordinate_system: CoordinateSystem,
}

impl Pipeline {
    pub fn new(config: ProcessingConfig) -> Result<Self, Error> {
        let detector_kind = config.detector_type.parse()?;
        let tracker_kind = config.tracker_type.parse()?;
        let coordinate_system = config.coordinate_system.parse()?;

        tracing::debug!(%detector_kind, %tracker_kind, %coordinate_system, "pipeline configured");

        Ok(Self {
            config,
            detector_kind,
            tracker_kind,
            coordinate_system,
        })
    }

    #[inline]
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    #[inline]
    pub fn detector_kind(&self) -> DetectorKind {
        self.detector_kind
    }

    /// Processes the whole video. Diagnostics reach `sink` on every exit path.
    pub fn run<S, D>(
        &self,
        source: &mut S,
        detector: &mut D,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<(Payload, Diagnostics), Error>
    where
        S: VideoSource + ?Sized,
        D: Detector + ?Sized,
    {
        let mut guard = DiagnosticsGuard::new(sink, Diagnostics::new(&self.config));
        let result = self.process(source, detector, &mut guard);

        guard.finish(result)
    }

    fn process<S, D>(
        &self,
        source: &mut S,
        detector: &mut D,
        diag: &mut Diagnostics,
    ) -> Result<Payload, Error>
    where
        S: VideoSource + ?Sized,
        D: Detector + ?Sized,
    {
        let cfg = &self.config;

        if detector.kind() != self.detector_kind {
            return Err(Error::DetectorMismatch {
                configured: self.detector_kind.canonical_name(),
                actual: detector.kind().canonical_name(),
            });
        }

        let mut tracker = self.tracker_kind.create();

        let meta = source.meta();
        let source_fps = if meta.fps > 0.0 {
            meta.fps
        } else {
            DEFAULT_SOURCE_FPS
        };
        let stride = frame_stride(source_fps, cfg.process_fps);
        let timeout = Duration::from_secs(cfg.processing_timeout_seconds);

        tracing::info!(
            width = meta.width,
            height = meta.height,
            source_fps,
            stride,
            frame_count = meta.frame_count,
            "processing video"
        );

        let start = Instant::now();
        let mut frame_detections = Vec::new();
        let mut track_points = Vec::new();

        while let Some(frame) = source.next_frame()? {
            diag.total_frames_read += 1;

            if frame.index % stride != 0 {
                continue;
            }

            if start.elapsed() > timeout {
                tracing::warn!(
                    frames_read = diag.total_frames_read,
                    frames_processed = diag.processed_frames,
                    "processing timeout"
                );

                return Err(Error::Timeout {
                    timeout_seconds: cfg.processing_timeout_seconds,
                    frames_read: diag.total_frames_read,
                    frames_processed: diag.processed_frames,
                });
            }

            let t_ms = frame_time_ms(frame.index, source_fps);
            let detections = detector.detect_frame(&frame)?;
            let selected = select_detection(
                &detections,
                tracker.prev_bbox(),
                tracker.lost_count(),
                cfg,
            );

            let (frame_det, point) = tracker.update(
                t_ms,
                selected.map(|d| d.bbox),
                selected.map(|d| d.conf),
            );

            if point.quality == Quality::Lost {
                diag.lost_frames += 1;
            }

            frame_detections.push(frame_det);
            track_points.push(point);
            diag.processed_frames += 1;
        }

        let track_points = if cfg.interpolate_gaps {
            let points = interpolate_short_gaps(&track_points, cfg.max_gap_frames);
            diag.interpolated_frames = points
                .iter()
                .filter(|p| p.quality == Quality::Interpolated)
                .count() as u64;
            points
        } else {
            track_points
        };

        let derived_metrics = compute_derived_metrics(&track_points);

        tracing::info!(
            processed = diag.processed_frames,
            read = diag.total_frames_read,
            lost = diag.lost_frames,
            interpolated = diag.interpolated_frames,
            coverage = derived_metrics.coverage,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "processing finished"
        );

        let payload = Payload {
            coordinate_system: CoordinateSystem::Normalized,
            video: VideoInfo {
                width: meta.width,
                height: meta.height,
                fps: meta.fps,
            },
            processing_meta: ProcessingMeta {
                detector: self.detector_kind.canonical_name().to_string(),
                detector_runtime: cfg.detector_device.clone(),
                detector_version: detector.version(),
                model_source: detector.model_source().to_string(),
                detector_model: detector.model_name().map(str::to_string),
                tracker: self.tracker_kind.canonical_name().to_string(),
                tracker_params: TrackerParams {
                    track_id: tracker.track_id(),
                    max_gap_frames: cfg.max_gap_frames,
                    interpolate_gaps: cfg.interpolate_gaps,
                    process_fps: cfg.process_fps,
                },
                cleaning: CleaningParams::from(cfg),
            },
            frame_detections,
            track_points,
            derived_metrics,
        };

        Ok(match self.coordinate_system {
            CoordinateSystem::Normalized => payload,
            CoordinateSystem::Pixels => payload.into_pixels(),
        })
    }
}

/// Builds the pipeline and runs it. Setup errors are recorded in the diagnostics too.
pub fn run_pipeline<S, D>(
    config: ProcessingConfig,
    source: &mut S,
    detector: &mut D,
    sink: &mut dyn DiagnosticsSink,
) -> Result<(Payload, Diagnostics), Error>
where
    S: VideoSource + ?Sized,
    D: Detector + ?Sized,
{
    let mut guard = DiagnosticsGuard::new(sink, Diagnostics::new(&config));
    let result = Pipeline::new(config)
        .and_then(|pipeline| pipeline.process(source, detector, &mut guard));

    guard.finish(result)
}
