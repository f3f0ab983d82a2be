//! The execution record of a single run.

use crate::errors::ExecutionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Description of one job run.
///
/// The outcome fields (`duration`, `failed`, `skipped`, `error`) are written
/// exactly once by [`ExecutionRecord::finish`]; every later call is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique run identifier.
    id: Uuid,
    /// Wall-clock start time.
    started_at: Option<Timestamp>,
    /// Monotonic start used to measure the duration.
    #[serde(skip)]
    started: Option<Instant>,
    /// Run duration, set at completion.
    duration: Duration,
    /// Whether the run is in flight.
    running: bool,
    /// Whether the run failed.
    failed: bool,
    /// Whether the run was skipped.
    skipped: bool,
    /// The authoritative error, if any.
    error: Option<ExecutionError>,
    /// Captured job output.
    output: Option<String>,
    /// Whether the outcome has been written.
    finished: bool,
}

impl ExecutionRecord {
    /// Creates a new, not yet started record.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: None,
            started: None,
            duration: Duration::ZERO,
            running: false,
            failed: false,
            skipped: false,
            error: None,
            output: None,
            finished: false,
        }
    }

    /// Marks the run as started.
    pub fn start(&mut self) {
        if self.started.is_some() || self.finished {
            return;
        }
        self.started_at = Some(Utc::now());
        self.started = Some(Instant::now());
        self.running = true;
    }

    /// Writes the outcome of the run.
    ///
    /// Returns `false` if the outcome was already written, in which case the
    /// record is left untouched.
    pub fn finish(&mut self, error: Option<ExecutionError>) -> bool {
        if self.finished {
            return false;
        }

        self.finished = true;
        self.running = false;
        self.duration = self.started.map_or(Duration::ZERO, |s| s.elapsed());

        match error {
            Some(err) if err.is_skipped() => {
                self.skipped = true;
                self.error = Some(err);
            }
            Some(err) => {
                self.failed = true;
                self.error = Some(err);
            }
            None => {}
        }
        true
    }

    /// Appends captured output.
    pub fn append_output(&mut self, text: &str) {
        self.output.get_or_insert_with(String::new).push_str(text);
    }

    /// Returns the run ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the wall-clock start time.
    #[must_use]
    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    /// Returns the run duration (zero until finished).
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns true while the run is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns true if the run failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Returns true if the run was skipped.
    #[must_use]
    pub fn skipped(&self) -> bool {
        self.skipped
    }

    /// Returns true once the outcome has been written.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the authoritative error.
    #[must_use]
    pub fn error(&self) -> Option<&ExecutionError> {
        self.error.as_ref()
    }

    /// Returns the captured output.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Overrides the start instant so the duration can be controlled.
    #[cfg(test)]
    pub(crate) fn backdate(&mut self, elapsed: Duration) {
        if let Some(started) = Instant::now().checked_sub(elapsed) {
            self.started = Some(started);
        }
    }

    /// Converts to a JSON summary suitable for logs and events.
    #[must_use]
    pub fn to_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.to_string(),
            "started_at": self.started_at.map(|t| t.to_rfc3339()),
            "duration_ms": self.duration.as_secs_f64() * 1000.0,
            "failed": self.failed,
            "skipped": self.skipped,
            "error": self.error.as_ref().map(ExecutionError::to_dict),
        })
    }
}

impl Default for ExecutionRecord {
    fn default() -> Self {
        Self::new()
    }
}
