//! Logging middleware reporting run outcomes through `tracing`.

use super::Middleware;
use crate::context::RunContext;
use crate::errors::ExecutionError;
use async_trait::async_trait;
use tracing::{debug, error, info, warn, Level};

/// Middleware that logs the start and the final outcome of every run.
///
/// Successful runs are logged at the configured level, skipped runs at
/// `WARN` and failed runs at `ERROR`.
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    /// The level used for successful runs.
    level: Level,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingMiddleware {
    /// Creates a new logging middleware with the specified success level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging middleware.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_outcome(&self, ctx: &RunContext) {
        let record = ctx.execution();
        let job = ctx.job();
        let duration_ms = record.duration().as_secs_f64() * 1000.0;

        if record.failed() {
            error!(
                job = %job.name,
                run_id = %record.id(),
                duration_ms,
                error = ?record.error().map(ToString::to_string),
                summary = %record.to_summary(),
                "Job failed"
            );
        } else if record.skipped() {
            warn!(
                job = %job.name,
                run_id = %record.id(),
                reason = ?record.error().map(ToString::to_string),
                "Job skipped"
            );
        } else if self.level == Level::DEBUG {
            debug!(job = %job.name, run_id = %record.id(), duration_ms, "Job finished");
        } else {
            info!(job = %job.name, run_id = %record.id(), duration_ms, "Job finished");
        }
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    fn continue_on_stop(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<(), ExecutionError> {
        debug!(
            job = %ctx.job().name,
            command = %ctx.job().command,
            "Job started"
        );

        let result = ctx.next().await;
        ctx.stop_with(&result);
        self.log_outcome(ctx);
        result
    }
}
