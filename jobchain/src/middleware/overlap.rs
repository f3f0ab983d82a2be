//! Overlap guard skipping runs of a job that is already running.

use super::Middleware;
use crate::context::RunContext;
use crate::errors::ExecutionError;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;

/// Middleware that prevents concurrent runs of the same job.
///
/// When a run starts while another run of the same job name is in flight,
/// the new run is stopped with [`ExecutionError::Skipped`] and never reaches
/// the job. The in-flight slot is released on unwind, and also when the job
/// panics or the run is dropped before completing.
#[derive(Debug, Default)]
pub struct OverlapMiddleware {
    /// In-flight runs per job name.
    running: DashMap<String, usize>,
}

impl OverlapMiddleware {
    /// Creates a new overlap guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of in-flight runs of `job`.
    #[must_use]
    pub fn running(&self, job: &str) -> usize {
        self.running.get(job).map_or(0, |count| *count)
    }

    fn acquire(&self, job: &str) -> Slot<'_> {
        let in_flight = {
            let mut count = self.running.entry(job.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        Slot {
            running: &self.running,
            job: job.to_string(),
            in_flight,
        }
    }
}

/// One in-flight run of a job, released when dropped.
///
/// Dropping covers normal unwind, a panicking job and a cancelled run.
struct Slot<'a> {
    running: &'a DashMap<String, usize>,
    job: String,
    in_flight: usize,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.running.remove_if_mut(self.job.as_str(), |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
    }
}

#[async_trait]
impl Middleware for OverlapMiddleware {
    fn name(&self) -> &str {
        "overlap"
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<(), ExecutionError> {
        let slot = self.acquire(&ctx.job().name);

        if slot.in_flight > 1 {
            warn!(
                job = %slot.job,
                in_flight = slot.in_flight,
                "Job already running, skipping execution"
            );
            ctx.stop(Some(ExecutionError::skipped(format!(
                "job '{}' is already running",
                slot.job
            ))));
        }

        let result = ctx.next().await;
        drop(slot);
        result
    }
}
