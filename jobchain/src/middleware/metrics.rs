//! Metrics middleware counting run outcomes across concurrent runs.

use super::Middleware;
use crate::context::RunContext;
use crate::errors::ExecutionError;
use crate::execution::Timestamp;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the collected metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Runs observed.
    pub runs: u64,
    /// Runs that failed.
    pub failures: u64,
    /// Runs that were skipped.
    pub skipped: u64,
    /// Cumulative run duration in milliseconds.
    pub total_duration_ms: u64,
    /// Start time of the most recent run.
    pub last_run_at: Option<Timestamp>,
}

impl MetricsSnapshot {
    /// Returns the number of successful runs.
    #[must_use]
    pub fn successes(&self) -> u64 {
        self.runs.saturating_sub(self.failures + self.skipped)
    }

    /// Returns the mean duration in milliseconds.
    #[must_use]
    pub fn mean_duration_ms(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        self.total_duration_ms as f64 / self.runs as f64
    }
}

/// Middleware that counts runs, failures, skips and durations.
///
/// One instance is shared by every run of a chain.
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    runs: AtomicU64,
    failures: AtomicU64,
    skipped: AtomicU64,
    total_duration_ms: AtomicU64,
    last_run_at: RwLock<Option<Timestamp>>,
}

impl MetricsMiddleware {
    /// Creates a new metrics middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the collected metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs: self.runs.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            total_duration_ms: self.total_duration_ms.load(Ordering::SeqCst),
            last_run_at: *self.last_run_at.read(),
        }
    }

    fn observe(&self, ctx: &RunContext) {
        let record = ctx.execution();
        self.runs.fetch_add(1, Ordering::SeqCst);
        if record.failed() {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        if record.skipped() {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }
        let millis = u64::try_from(record.duration().as_millis()).unwrap_or(u64::MAX);
        self.total_duration_ms.fetch_add(millis, Ordering::SeqCst);

        if let Some(started_at) = record.started_at() {
            let mut last = self.last_run_at.write();
            if last.map_or(true, |t| started_at > t) {
                *last = Some(started_at);
            }
        }
    }
}

#[async_trait]
impl Middleware for MetricsMiddleware {
    fn name(&self) -> &str {
        "metrics"
    }

    fn continue_on_stop(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<(), ExecutionError> {
        let result = ctx.next().await;
        ctx.stop_with(&result);
        self.observe(ctx);
        result
    }
}
