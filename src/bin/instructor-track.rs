use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use instructor_track::diagnostics::{Diagnostics, DiagnosticsGuard, DiagnosticsSink, JsonFileSink};
use instructor_track::replay::DetectionLog;
use instructor_track::{run_pipeline, Error, ProcessingConfig, VideoMeta};

/// Replays a recorded detections log through the instructor tracking core.
#[derive(Parser, Debug)]
#[command(name = "instructor-track")]
struct Args {
    /// Detections log, one `<frame_index>: <json>` line per frame.
    #[arg(long)]
    detections: PathBuf,

    #[arg(long, env = "INSTRUCTOR_TRACK_WIDTH")]
    width: u32,

    #[arg(long, env = "INSTRUCTOR_TRACK_HEIGHT")]
    height: u32,

    #[arg(long, env = "INSTRUCTOR_TRACK_FPS")]
    fps: f64,

    /// Number of decoded frames; defaults to the last logged frame.
    #[arg(long, default_value_t = 0)]
    frame_count: u64,

    /// TOML processing config; unspecified fields keep their defaults.
    #[arg(long, env = "INSTRUCTOR_TRACK_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "INSTRUCTOR_TRACK_PROCESS_FPS")]
    process_fps: Option<f64>,

    #[arg(long, env = "INSTRUCTOR_TRACK_MIN_CONF")]
    min_conf: Option<f32>,

    #[arg(long, env = "INSTRUCTOR_TRACK_MAX_GAP_FRAMES")]
    max_gap_frames: Option<i32>,

    #[arg(long, env = "INSTRUCTOR_TRACK_COORDINATE_SYSTEM")]
    coordinate_system: Option<String>,

    #[arg(long, env = "INSTRUCTOR_TRACK_TIMEOUT_SECONDS")]
    timeout_seconds: Option<u64>,

    /// Payload output file, stdout when absent.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Diagnostics output file.
    #[arg(long)]
    diagnostics: Option<PathBuf>,
}

impl Args {
    fn processing_config(&self) -> Result<ProcessingConfig, Error> {
        let mut cfg = match &self.config {
            Some(path) => ProcessingConfig::load(path)?,
            None => ProcessingConfig::default(),
        };

        // replayed logs never go through a model
        cfg.detector_type = "replay".to_string();

        if let Some(v) = self.process_fps {
            cfg.process_fps = v;
        }
        if let Some(v) = self.min_conf {
            cfg.min_conf = v;
        }
        if let Some(v) = self.max_gap_frames {
            cfg.max_gap_frames = v;
        }
        if let Some(v) = &self.coordinate_system {
            cfg.coordinate_system = v.clone();
        }
        if let Some(v) = self.timeout_seconds {
            cfg.processing_timeout_seconds = v;
        }

        Ok(cfg)
    }

    fn diagnostics_sink(&self) -> Box<dyn DiagnosticsSink> {
        match &self.diagnostics {
            Some(path) => Box::new(JsonFileSink::new(path)),
            None => Box::new(()),
        }
    }

    fn meta(&self) -> VideoMeta {
        VideoMeta {
            width: self.width,
            height: self.height,
            fps: self.fps,
            frame_count: self.frame_count,
        }
    }
}

/// Records a failure that happened before the pipeline started.
fn setup_failed(sink: &mut dyn DiagnosticsSink, config: &ProcessingConfig, err: Error) -> Error {
    DiagnosticsGuard::new(sink, Diagnostics::new(config)).fail(err)
}

fn run(args: &Args) -> Result<(), Error> {
    let mut sink = args.diagnostics_sink();

    let config = match args.processing_config() {
        Ok(config) => config,
        Err(err) => {
            let fallback = ProcessingConfig {
                detector_type: "replay".to_string(),
                ..Default::default()
            };
            return Err(setup_failed(sink.as_mut(), &fallback, err));
        }
    };

    let log = match DetectionLog::load(&args.detections) {
        Ok(log) => log,
        Err(err) => return Err(setup_failed(sink.as_mut(), &config, err)),
    };
    tracing::info!(path = ?args.detections, frames = log.len(), "detections loaded");

    let mut source = log.source(args.meta());
    let mut detector = log.detector();

    let (payload, _) = run_pipeline(config, &mut source, &mut detector, sink.as_mut())?;
    let json = serde_json::to_string_pretty(&payload)?;

    match &args.output {
        Some(path) => std::fs::write(path, json)?,
        None => writeln!(std::io::stdout().lock(), "{}", json)?,
    }

    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, kind = ?err.kind(), "processing failed");
            ExitCode::FAILURE
        }
    }
}
