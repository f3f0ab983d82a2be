//! Execution model for a single job run.
//!
//! This module provides:
//! - The job descriptor and the terminal job step
//! - The execution record finalized once per run
//! - The run phase state machine

mod job;
mod phase;
mod record;

pub use job::{AsyncFnJob, FnJob, Job, JobDescriptor, NoOpJob};
pub use phase::RunPhase;
pub use record::{ExecutionRecord, Timestamp};
