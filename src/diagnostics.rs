use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

use serde_derive::{Deserialize, Serialize};

use crate::config::ProcessingConfig;
use crate::error::Error;

/// Run-level counters, written once when the run ends.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub processed_frames: u64,
    pub total_frames_read: u64,
    pub lost_frames: u64,
    pub interpolated_frames: u64,
    pub config: ProcessingConfig,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl Diagnostics {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            config: config.clone(),
            ..Default::default()
        }
    }
}

pub trait DiagnosticsSink {
    fn flush(&mut self, diagnostics: &Diagnostics);
}

/// Writes pretty-printed JSON, creating parent directories as needed.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    fn write(&self, diagnostics: &Diagnostics) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.path, serde_json::to_string_pretty(diagnostics)?)?;

        Ok(())
    }
}

impl DiagnosticsSink for JsonFileSink {
    fn flush(&mut self, diagnostics: &Diagnostics) {
        if let Err(err) = self.write(diagnostics) {
            tracing::error!(path = ?self.path, %err, "failed to write diagnostics");
        }
    }
}

/// Keeps the last flushed diagnostics in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub last: Option<Diagnostics>,
}

impl DiagnosticsSink for MemorySink {
    fn flush(&mut self, diagnostics: &Diagnostics) {
        self.last = Some(diagnostics.clone());
    }
}

impl DiagnosticsSink for () {
    fn flush(&mut self, _diagnostics: &Diagnostics) {}
}

/// Owns the counters for one run and hands them to the sink when dropped, whatever the
/// exit path.
pub struct DiagnosticsGuard<'a> {
    sink: &'a mut dyn DiagnosticsSink,
    diagnostics: Diagnostics,
}

impl<'a> DiagnosticsGuard<'a> {
    pub fn new(sink: &'a mut dyn DiagnosticsSink, diagnostics: Diagnostics) -> Self {
        Self { sink, diagnostics }
    }

    /// Records the error (if any) and returns the result paired with a snapshot of the
    /// counters. The sink is flushed when the guard goes out of scope.
    pub fn finish<T>(mut self, result: Result<T, Error>) -> Result<(T, Diagnostics), Error> {
        match result {
            Ok(value) => Ok((value, self.diagnostics.clone())),
            Err(err) => {
                self.diagnostics.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Records `err` and hands it back; the sink is flushed as the guard is consumed.
    pub fn fail(mut self, err: Error) -> Error {
        self.diagnostics.error = Some(err.to_string());
        err
    }
}

impl Deref for DiagnosticsGuard<'_> {
    type Target = Diagnostics;

    fn deref(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl DerefMut for DiagnosticsGuard<'_> {
    fn deref_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }
}

impl Drop for DiagnosticsGuard<'_> {
    fn drop(&mut self) {
        self.sink.flush(&self.diagnostics);
    }
}
