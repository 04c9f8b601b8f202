use std::time::Duration;

use ndarray::{Array3, ArrayD, ArrayView4};

use instructor_track::detector::{Detector, DetectorKind, InferenceModel, YoloDetector};
use instructor_track::diagnostics::{JsonFileSink, MemorySink};
use instructor_track::payload::CoordinateSystem;
use instructor_track::replay::DetectionLog;
use instructor_track::{
    run_pipeline, BBox, Detection, Error, ErrorKind, Frame, Pipeline, ProcessingConfig, Quality,
    VideoMeta, VideoSource,
};

struct FakeVideo {
    meta: VideoMeta,
    next: u64,
}

impl FakeVideo {
    fn new(frames: u64, fps: f64) -> Self {
        Self {
            meta: VideoMeta {
                width: 1280,
                height: 720,
                fps,
                frame_count: frames,
            },
            next: 0,
        }
    }
}

impl VideoSource for FakeVideo {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
        if self.next >= self.meta.frame_count {
            return Ok(None);
        }
        self.next += 1;
        Ok(Some(Frame::empty(self.next - 1)))
    }
}

/// Solid grey RGB frames.
struct RgbVideo {
    inner: FakeVideo,
}

impl VideoSource for RgbVideo {
    fn meta(&self) -> VideoMeta {
        self.inner.meta()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
        Ok(self
            .inner
            .next_frame()?
            .map(|f| Frame::new(f.index, Array3::from_elem((36, 64, 3), 128u8))))
    }
}

/// Always predicts one person in the middle of a 64px input.
struct CenteredPersonModel;

impl InferenceModel for CenteredPersonModel {
    fn run(&mut self, input: ArrayView4<'_, f32>) -> Result<ArrayD<f32>, Error> {
        assert_eq!(input.shape(), &[1, 3, 64, 64]);

        let mut out = Array3::<f32>::zeros((1, 5, 1));
        out[[0, 0, 0]] = 32.0;
        out[[0, 1, 0]] = 32.0;
        out[[0, 2, 0]] = 8.0;
        out[[0, 3, 0]] = 24.0;
        out[[0, 4, 0]] = 0.9;

        Ok(out.into_dyn())
    }

    fn version(&self) -> Option<String> {
        Some("8.2.0".to_string())
    }
}

/// Returns scripted detections per frame index, optionally slowly or failing.
struct ScriptedDetector {
    frames: Vec<Vec<Detection>>,
    delay: Option<Duration>,
    fail_at: Option<u64>,
    calls: usize,
}

impl ScriptedDetector {
    fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            frames,
            delay: None,
            fail_at: None,
            calls: 0,
        }
    }
}

impl Detector for ScriptedDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Replay
    }

    fn detect_frame(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error> {
        self.calls += 1;

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if self.fail_at == Some(frame.index) {
            return Err(Error::Detector("model crashed".to_string()));
        }

        Ok(self
            .frames
            .get(frame.index as usize)
            .cloned()
            .unwrap_or_default())
    }

    fn version(&self) -> Option<String> {
        Some("test-1".to_string())
    }
}

fn config() -> ProcessingConfig {
    ProcessingConfig {
        detector_type: "replay".to_string(),
        ..Default::default()
    }
}

fn walker(idx: usize) -> Detection {
    Detection::person(BBox::ltwh(0.1 + idx as f32 * 0.01, 0.2, 0.1, 0.3), 0.9)
}

/// Ten frames, person visible on 0-3 and 6-9.
fn gap_script() -> Vec<Vec<Detection>> {
    (0..10)
        .map(|i| if (4..6).contains(&i) { vec![] } else { vec![walker(i)] })
        .collect()
}

#[test]
fn short_gap_is_interpolated_end_to_end() {
    let cfg = ProcessingConfig {
        process_fps: 10.0,
        ..config()
    };
    let mut source = FakeVideo::new(10, 10.0);
    let mut detector = ScriptedDetector::new(gap_script());
    let mut sink = MemorySink::default();

    let (payload, diag) = run_pipeline(cfg, &mut source, &mut detector, &mut sink).unwrap();

    assert_eq!(payload.coordinate_system, CoordinateSystem::Normalized);
    assert_eq!(payload.frame_detections.len(), 10);
    assert_eq!(payload.track_points.len(), 10);
    assert_eq!(payload.derived_metrics.coverage, 1.0);
    assert_eq!(payload.derived_metrics.gap_count, 0);

    let qualities: Vec<Quality> = payload.track_points.iter().map(|p| p.quality).collect();
    for (i, q) in qualities.iter().enumerate() {
        let expected = if (4..6).contains(&i) {
            Quality::Interpolated
        } else {
            Quality::Measured
        };
        assert_eq!(*q, expected, "frame {}", i);
    }

    // the raw frame records still show nothing was accepted on the gap
    assert!(payload.frame_detections[4].bbox.is_none());
    assert!(payload.frame_detections[5].bbox.is_none());

    // interpolated between frame 3 (x=0.13) and frame 6 (x=0.16), centroid offset 0.05
    assert!((payload.track_points[4].cx - 0.19).abs() < 1e-5);
    assert!((payload.track_points[5].cx - 0.20).abs() < 1e-5);

    let times: Vec<u64> = payload.track_points.iter().map(|p| p.t_ms).collect();
    assert_eq!(times, (0..10).map(|i| i * 100).collect::<Vec<u64>>());

    assert_eq!(diag.processed_frames, 10);
    assert_eq!(diag.total_frames_read, 10);
    assert_eq!(diag.lost_frames, 2);
    assert_eq!(diag.interpolated_frames, 2);
    assert_eq!(diag.error, None);
    assert_eq!(sink.last, Some(diag));

    let meta = &payload.processing_meta;
    assert_eq!(meta.detector, "replay");
    assert_eq!(meta.detector_version.as_deref(), Some("test-1"));
    assert_eq!(meta.tracker, "single-target-iou");
    assert_eq!(meta.tracker_params.track_id, 1);
}

#[test]
fn yolo_detector_built_from_config() {
    let cfg = ProcessingConfig {
        process_fps: 10.0,
        detector_imgsz: 64,
        ..ProcessingConfig::default()
    };
    let mut source = RgbVideo {
        inner: FakeVideo::new(5, 10.0),
    };
    let mut detector = YoloDetector::from_config(CenteredPersonModel, &cfg).unwrap();

    let (payload, diag) = run_pipeline(cfg, &mut source, &mut detector, &mut ()).unwrap();

    assert_eq!(diag.processed_frames, 5);
    assert_eq!(diag.lost_frames, 0);
    assert_eq!(payload.derived_metrics.coverage, 1.0);

    let bbox = payload.frame_detections[0].bbox.unwrap();
    assert!((bbox.x - 0.4375).abs() < 1e-5);
    assert!((bbox.h - 0.375).abs() < 1e-5);

    let meta = &payload.processing_meta;
    assert_eq!(meta.detector, "yolov8n");
    assert_eq!(meta.detector_runtime, "cpu");
    assert_eq!(meta.detector_version.as_deref(), Some("8.2.0"));
    assert_eq!(meta.model_source, "ultralytics");
    assert_eq!(meta.detector_model.as_deref(), Some("yolov8n.onnx"));

    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["processingMeta"]["detectorModel"], "yolov8n.onnx");
}

#[test]
fn interpolation_can_be_disabled() {
    let cfg = ProcessingConfig {
        process_fps: 10.0,
        interpolate_gaps: false,
        ..config()
    };
    let mut detector = ScriptedDetector::new(gap_script());

    let (payload, diag) =
        run_pipeline(cfg, &mut FakeVideo::new(10, 10.0), &mut detector, &mut ()).unwrap();

    assert_eq!(diag.interpolated_frames, 0);
    assert_eq!(payload.derived_metrics.gap_count, 1);
    assert_eq!(payload.derived_metrics.longest_gap_ms, 200);
    assert!((payload.derived_metrics.coverage - 0.8).abs() < 1e-9);
    assert!(payload.track_points[4].quality == Quality::Lost);
}

#[test]
fn downsampling_keeps_playback_time() {
    let cfg = ProcessingConfig {
        process_fps: 10.0,
        ..config()
    };
    let script = (0..30).map(|i| vec![walker(i)]).collect();
    let mut detector = ScriptedDetector::new(script);

    let (payload, diag) =
        run_pipeline(cfg, &mut FakeVideo::new(30, 30.0), &mut detector, &mut ()).unwrap();

    assert_eq!(diag.total_frames_read, 30);
    assert_eq!(diag.processed_frames, 10);
    assert_eq!(detector.calls, 10);

    let times: Vec<u64> = payload.frame_detections.iter().map(|d| d.t_ms).collect();
    assert_eq!(times, (0..10).map(|i| i * 100).collect::<Vec<u64>>());
}

#[test]
fn pixel_output_scales_by_video_size() {
    let cfg = ProcessingConfig {
        process_fps: 10.0,
        coordinate_system: "pixels".to_string(),
        ..config()
    };
    let mut detector = ScriptedDetector::new(gap_script());

    let (payload, _) =
        run_pipeline(cfg, &mut FakeVideo::new(10, 10.0), &mut detector, &mut ()).unwrap();

    assert_eq!(payload.coordinate_system, CoordinateSystem::Pixels);

    let bbox = payload.frame_detections[0].bbox.unwrap();
    assert!((bbox.x - 128.0).abs() < 1e-3);
    assert!((bbox.h - 216.0).abs() < 1e-3);

    let point = payload.track_points[0];
    assert!((point.cx - 192.0).abs() < 1e-3);
    assert!((point.cy - 252.0).abs() < 1e-3);

    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["coordinateSystem"], "pixels");
}

#[test]
fn occlusion_does_not_switch_to_bystander() {
    let instructor = Detection::person(BBox::ltwh(0.1, 0.2, 0.1, 0.3), 0.8);
    let bystander = Detection::person(BBox::ltwh(0.7, 0.2, 0.1, 0.3), 0.95);

    // instructor for 3 frames, then only the bystander is visible
    let script: Vec<Vec<Detection>> = (0..12)
        .map(|i| if i < 3 { vec![instructor] } else { vec![bystander] })
        .collect();

    let cfg = ProcessingConfig {
        process_fps: 10.0,
        max_gap_frames: 0,
        ..config()
    };
    let mut detector = ScriptedDetector::new(script);

    let (payload, diag) =
        run_pipeline(cfg, &mut FakeVideo::new(12, 10.0), &mut detector, &mut ()).unwrap();

    let accepted: Vec<Option<f32>> = payload.frame_detections.iter().map(|d| d.conf).collect();

    // frames 3..=8 are rejected while the patience of 6 lost frames runs out
    assert_eq!(&accepted[..3], &[Some(0.8); 3]);
    assert!(accepted[3..9].iter().all(Option::is_none));
    assert!(accepted[9..].iter().all(|c| *c == Some(0.95)));
    assert_eq!(diag.lost_frames, 6);
}

#[test]
fn timeout_aborts_and_keeps_counters() {
    let cfg = ProcessingConfig {
        process_fps: 10.0,
        processing_timeout_seconds: 0,
        ..config()
    };
    let mut detector = ScriptedDetector::new(gap_script());
    detector.delay = Some(Duration::from_millis(5));
    let mut sink = MemorySink::default();

    let err = run_pipeline(cfg, &mut FakeVideo::new(10, 10.0), &mut detector, &mut sink)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);

    let diag = sink.last.unwrap();
    assert!(diag.error.unwrap().starts_with("processing timeout"));
    assert!(diag.processed_frames <= 1);
    assert_eq!(diag.total_frames_read, diag.processed_frames + 1);
}

#[test]
fn detector_failure_is_fatal() {
    let cfg = ProcessingConfig {
        process_fps: 10.0,
        ..config()
    };
    let mut detector = ScriptedDetector::new(gap_script());
    detector.fail_at = Some(2);
    let mut sink = MemorySink::default();

    let err = run_pipeline(cfg, &mut FakeVideo::new(10, 10.0), &mut detector, &mut sink)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert_eq!(detector.calls, 3);

    let diag = sink.last.unwrap();
    assert_eq!(diag.processed_frames, 2);
    assert_eq!(diag.total_frames_read, 3);
    assert_eq!(diag.error.as_deref(), Some("Detector Error: model crashed"));
}

#[test]
fn configuration_errors_fail_before_reading() {
    let mut source = FakeVideo::new(10, 10.0);
    let mut detector = ScriptedDetector::new(gap_script());
    let mut sink = MemorySink::default();

    let cfg = ProcessingConfig {
        tracker_type: "deepsort".to_string(),
        ..config()
    };
    let err = run_pipeline(cfg, &mut source, &mut detector, &mut sink).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let diag = sink.last.take().unwrap();
    assert_eq!(diag.total_frames_read, 0);
    assert!(diag.error.unwrap().contains("deepsort"));
    assert_eq!(diag.config.tracker_type, "deepsort");

    // configured for a model, handed a replay detector
    let pipeline = Pipeline::new(ProcessingConfig::default()).unwrap();
    let err = pipeline
        .run(&mut source, &mut detector, &mut sink)
        .unwrap_err();
    assert!(matches!(err, Error::DetectorMismatch { .. }));
    assert_eq!(sink.last.unwrap().total_frames_read, 0);
    assert_eq!(source.next, 0);
    assert_eq!(detector.calls, 0);
}

#[test]
fn empty_video_produces_empty_payload() {
    let mut detector = ScriptedDetector::new(vec![]);

    let (payload, diag) =
        run_pipeline(config(), &mut FakeVideo::new(0, 25.0), &mut detector, &mut ()).unwrap();

    assert!(payload.track_points.is_empty());
    assert_eq!(payload.derived_metrics.coverage, 0.0);
    assert_eq!(payload.derived_metrics.distance, 0.0);
    assert_eq!(diag.processed_frames, 0);
}

#[test]
fn replayed_log_writes_diagnostics_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("session.dets");
    let diag_path = dir.path().join("results").join("processing-diagnostics.json");

    std::fs::write(
        &log_path,
        concat!(
            "0: [{\"bbox\":{\"x\":0.1,\"y\":0.2,\"w\":0.1,\"h\":0.3},\"p\":0.9,\"c\":0}]\n",
            "1: []\n",
            "2: [{\"bbox\":{\"x\":0.12,\"y\":0.2,\"w\":0.1,\"h\":0.3},\"p\":0.8,\"c\":0}]\n",
        ),
    )
    .unwrap();

    let log = DetectionLog::load(&log_path).unwrap();
    let meta = VideoMeta {
        width: 640,
        height: 480,
        fps: 25.0,
        frame_count: 0,
    };
    let cfg = ProcessingConfig {
        process_fps: 25.0,
        ..config()
    };

    let (payload, _) = run_pipeline(
        cfg,
        &mut log.source(meta),
        &mut log.detector(),
        &mut JsonFileSink::new(&diag_path),
    )
    .unwrap();

    assert_eq!(payload.track_points.len(), 3);
    assert_eq!(payload.track_points[1].quality, Quality::Interpolated);
    assert_eq!(payload.track_points[2].t_ms, 80);
    assert_eq!(payload.processing_meta.model_source, "recorded");

    let diag: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&diag_path).unwrap()).unwrap();
    assert_eq!(diag["processedFrames"], 3);
    assert_eq!(diag["lostFrames"], 1);
    assert_eq!(diag["interpolatedFrames"], 1);
    assert_eq!(diag["config"]["detector_type"], "replay");
}
