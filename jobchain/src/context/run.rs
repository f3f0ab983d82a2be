//! Mutable per-run context driving the middleware chain.

use crate::errors::ExecutionError;
use crate::execution::{ExecutionRecord, Job, JobDescriptor, RunPhase};
use crate::middleware::Middleware;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, Span};

/// The context for a single job run.
///
/// One instance exists per run. It owns the execution record and the chain
/// control state (cursor, phase, stop outcome) and is passed by mutable
/// reference to every middleware, so a stop recorded by an inner middleware
/// is visible to the outer ones while they unwind.
pub struct RunContext {
    /// The run's execution record.
    record: ExecutionRecord,
    /// The terminal job step.
    job: Arc<dyn Job>,
    /// The middleware sequence, shared with the chain.
    middlewares: Arc<[Arc<dyn Middleware>]>,
    /// Logger handle for this run.
    span: Span,
    /// Index of the next middleware to enter.
    cursor: usize,
    /// Lifecycle phase.
    phase: RunPhase,
    /// Result of the job step, once it ran.
    job_result: Option<Result<(), ExecutionError>>,
    /// Time limit for the job step.
    job_timeout: Option<Duration>,
}

impl RunContext {
    /// Creates a new run context.
    #[must_use]
    pub fn new(
        job: Arc<dyn Job>,
        middlewares: Arc<[Arc<dyn Middleware>]>,
        span: Span,
    ) -> Self {
        Self {
            record: ExecutionRecord::new(),
            job,
            middlewares,
            span,
            cursor: 0,
            phase: RunPhase::Created,
            job_result: None,
            job_timeout: None,
        }
    }

    /// Limits how long the job step may run.
    ///
    /// A job exceeding the limit is dropped and the run fails with
    /// [`ExecutionError::Timeout`].
    #[must_use]
    pub fn with_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Starts the run: stamps the record and enters the forward pass.
    pub fn start(&mut self) {
        self.record.start();
        self.advance(RunPhase::Running);
    }

    /// Continues the chain.
    ///
    /// Enters the next middleware in declaration order, or runs the job when
    /// none remain, and returns the error produced by that deeper call. The
    /// job's outcome stops the run, so the record is populated by the time
    /// `next` returns. Once the run is stopped, middlewares that do not
    /// continue on stop are skipped and the job is never executed; the call
    /// then returns the stop error.
    ///
    /// Calling `next` more than once from the same middleware is allowed but
    /// discouraged: the cursor is shared, so the second call only sees what
    /// remains of the sequence, and the job runs at most once per run (a
    /// repeated call past the end returns the job's first result).
    pub fn next(&mut self) -> BoxFuture<'_, Result<(), ExecutionError>> {
        Box::pin(async move {
            while let Some(middleware) = self.middlewares.get(self.cursor).cloned() {
                self.cursor += 1;

                if self.is_stopped() && !middleware.continue_on_stop() {
                    debug!(
                        parent: &self.span,
                        middleware = middleware.name(),
                        "Skipping middleware on stopped run"
                    );
                    continue;
                }

                debug!(
                    parent: &self.span,
                    middleware = middleware.name(),
                    position = self.cursor - 1,
                    "Entering middleware"
                );
                let result = middleware.run(self).await;
                self.advance(RunPhase::Unwinding);
                return result;
            }

            self.run_job().await
        })
    }

    async fn run_job(&mut self) -> Result<(), ExecutionError> {
        if let Some(result) = &self.job_result {
            debug!(parent: &self.span, "Job already executed in this run");
            return result.clone();
        }

        if self.is_stopped() {
            debug!(parent: &self.span, "Run stopped before reaching the job");
            self.advance(RunPhase::Unwinding);
            return self.record.error().cloned().map_or(Ok(()), Err);
        }

        self.advance(RunPhase::Executing);
        let job = Arc::clone(&self.job);
        let result = match self.job_timeout {
            Some(limit) => tokio::time::timeout(limit, job.run(self))
                .await
                .unwrap_or_else(|_| Err(ExecutionError::timeout(limit))),
            None => job.run(self).await,
        };

        // The job's outcome is the first effective stop of a run nobody
        // stopped early.
        self.stop_with(&result);
        self.job_result = Some(result.clone());
        self.advance(RunPhase::Unwinding);
        result
    }

    /// Records `error` as the authoritative outcome of the run.
    ///
    /// The first stop wins: it finalizes the record (duration, failure,
    /// error) and every later call is ignored, so a later `stop(None)` never
    /// clears an earlier failure. A job that ran counts as a stop, which
    /// makes stops issued while unwinding past it no-ops. Stops outside of
    /// an active run are ignored too.
    pub fn stop(&mut self, error: Option<ExecutionError>) {
        if !self.phase.accepts_stop() {
            debug!(parent: &self.span, phase = %self.phase, "Ignoring stop outside of an active run");
            return;
        }

        let requested = error.as_ref().map(ToString::to_string);
        if !self.record.finish(error) {
            debug!(
                parent: &self.span,
                ignored_error = ?requested,
                "Run already stopped, keeping the first outcome"
            );
        }
    }

    /// Stops the run with the outcome of a `next` call.
    pub fn stop_with(&mut self, result: &Result<(), ExecutionError>) {
        self.stop(result.as_ref().err().cloned());
    }

    /// Finalizes the run and returns its authoritative error.
    pub(crate) fn complete(
        &mut self,
        result: Result<(), ExecutionError>,
    ) -> Result<(), ExecutionError> {
        self.stop(result.err());
        self.advance(RunPhase::Completed);
        self.record.error().cloned().map_or(Ok(()), Err)
    }

    /// Appends captured job output to the record.
    pub fn record_output(&mut self, text: &str) {
        if self.phase.is_terminal() {
            return;
        }
        self.record.append_output(text);
    }

    fn advance(&mut self, next: RunPhase) {
        if self.phase.can_advance_to(next) {
            self.phase = next;
        }
    }

    /// Returns the execution record.
    #[must_use]
    pub fn execution(&self) -> &ExecutionRecord {
        &self.record
    }

    /// Consumes the context, returning the execution record.
    #[must_use]
    pub fn into_record(self) -> ExecutionRecord {
        self.record
    }

    /// Returns the job descriptor.
    #[must_use]
    pub fn job(&self) -> &JobDescriptor {
        self.job.descriptor()
    }

    /// Returns the run's logger handle.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Returns the position of the next middleware to enter.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns the number of middlewares in the chain.
    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns true once a stop has been recorded.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.record.is_finished()
    }

    /// Returns true if the job step has run.
    #[must_use]
    pub fn job_executed(&self) -> bool {
        self.job_result.is_some()
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("job", self.job.descriptor())
            .field("record", &self.record)
            .field("cursor", &self.cursor)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
