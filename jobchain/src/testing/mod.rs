//! Testing utilities for middleware chains.
//!
//! This module provides:
//! - Recording and stopping middlewares
//! - Scripted and slow jobs
//! - Assertions over execution records
//! - In-memory capture of emitted logs

mod assertions;
mod logs;
mod mocks;

pub use assertions::{
    assert_record_failed, assert_record_skipped, assert_record_succeeded, assert_run_error,
};
pub use logs::LogCapture;
pub use mocks::{
    EventLog, Observation, RecordingMiddleware, ScriptedJob, SlowJob, StopPoint,
    StoppingMiddleware,
};
