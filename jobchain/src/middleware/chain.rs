//! Middleware chain for ordered job execution.

use crate::context::RunContext;
use crate::errors::ExecutionError;
use crate::execution::{ExecutionRecord, Job};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{field, info_span, Instrument, Span};

/// Trait for job execution middlewares.
///
/// Middlewares are configured once and shared by every run, possibly
/// concurrently, so any state beyond immutable configuration must be
/// internally synchronized.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Returns the middleware name used in logs.
    fn name(&self) -> &str;

    /// Returns true if the middleware must still be entered after an
    /// earlier middleware stopped the run.
    ///
    /// Observability middlewares return true so they report every run.
    fn continue_on_stop(&self) -> bool {
        false
    }

    /// Runs the middleware.
    ///
    /// Implementations normally call `ctx.next()` to continue the chain, then
    /// post-process using the populated execution record, and return the
    /// error they received or the one they want to surface. Not calling
    /// `next` short-circuits everything deeper, including the job.
    async fn run(&self, ctx: &mut RunContext) -> Result<(), ExecutionError> {
        ctx.next().await
    }
}

/// An ordered chain of middlewares around a job.
///
/// Declaration order is the forward order; post-logic runs in reverse.
/// Cloning is cheap and every clone can be invoked concurrently.
#[derive(Clone)]
pub struct Chain {
    middlewares: Arc<[Arc<dyn Middleware>]>,
    job_timeout: Option<Duration>,
}

impl Chain {
    /// Creates a chain without middlewares; invoking it runs the job
    /// directly.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            middlewares: Arc::from(Vec::new()),
            job_timeout: None,
        }
    }

    /// Returns a builder for a new chain.
    #[must_use]
    pub fn builder() -> ChainBuilder {
        ChainBuilder::new()
    }

    /// Runs `job` through the chain.
    ///
    /// Returns the finalized execution record and the run's authoritative
    /// error: the first effective stop, or the job's own outcome.
    pub async fn invoke(
        &self,
        job: Arc<dyn Job>,
    ) -> (ExecutionRecord, Result<(), ExecutionError>) {
        let span = info_span!(
            "job_run",
            job = %job.descriptor().name,
            run_id = field::Empty,
        );
        self.invoke_in(job, span).await
    }

    /// Runs `job` through the chain, logging under `span`.
    pub async fn invoke_in(
        &self,
        job: Arc<dyn Job>,
        span: Span,
    ) -> (ExecutionRecord, Result<(), ExecutionError>) {
        let mut ctx = RunContext::new(job, Arc::clone(&self.middlewares), span.clone())
            .with_job_timeout(self.job_timeout);
        span.record("run_id", field::display(ctx.execution().id()));

        let result = async {
            ctx.start();
            let result = ctx.next().await;
            ctx.complete(result)
        }
        .instrument(span)
        .await;

        (ctx.into_record(), result)
    }

    /// Returns the middleware names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of middlewares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns true if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Returns the job step's time limit.
    #[must_use]
    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("middlewares", &self.names())
            .field("job_timeout", &self.job_timeout)
            .finish()
    }
}

/// Builder composing middlewares in declaration order.
#[derive(Default)]
pub struct ChainBuilder {
    middlewares: Vec<Arc<dyn Middleware>>,
    job_timeout: Option<Duration>,
}

impl ChainBuilder {
    /// Creates a new empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
            job_timeout: None,
        }
    }

    /// Appends a middleware.
    #[must_use]
    pub fn with(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Appends a middleware if present.
    ///
    /// Absent middlewares (e.g. a webhook without URL) are no-ops.
    #[must_use]
    pub fn with_optional(self, middleware: Option<Arc<dyn Middleware>>) -> Self {
        match middleware {
            Some(m) => self.with(m),
            None => self,
        }
    }

    /// Fails runs whose job step takes longer than `timeout`.
    #[must_use]
    pub fn job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    /// Sets the job step's time limit in place.
    pub fn set_job_timeout(&mut self, timeout: Option<Duration>) {
        self.job_timeout = timeout;
    }

    /// Appends a middleware in place.
    pub fn add(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Returns the number of middlewares added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns true if no middleware was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Builds the chain.
    #[must_use]
    pub fn build(self) -> Chain {
        Chain {
            middlewares: Arc::from(self.middlewares),
            job_timeout: self.job_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{FnJob, JobDescriptor, NoOpJob};
    use crate::testing::{EventLog, RecordingMiddleware, StoppingMiddleware};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingMiddleware {
        before_count: AtomicUsize,
        after_count: AtomicUsize,
    }

    impl CountingMiddleware {
        fn new() -> Self {
            Self {
                before_count: AtomicUsize::new(0),
                after_count: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Middleware for CountingMiddleware {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self, ctx: &mut RunContext) -> Result<(), ExecutionError> {
            self.before_count.fetch_add(1, Ordering::SeqCst);
            let result = ctx.next().await;
            self.after_count.fetch_add(1, Ordering::SeqCst);
            result
        }
    }

    struct PassThrough;

    #[async_trait]
    impl Middleware for PassThrough {
        fn name(&self) -> &str {
            "pass"
        }
    }

    #[test]
    fn test_chain_creation() {
        let chain = Chain::empty();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
    }

    #[test]
    fn test_builder_preserves_declaration_order() {
        let log = EventLog::new();
        let chain = Chain::builder()
            .with(Arc::new(RecordingMiddleware::new("a", log.clone())))
            .with(Arc::new(RecordingMiddleware::new("b", log.clone())))
            .with_optional(None)
            .with(Arc::new(RecordingMiddleware::new("c", log)))
            .build();

        assert_eq!(chain.names(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_empty_chain_runs_job_directly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let job = Arc::new(FnJob::new(JobDescriptor::new("direct", "true"), move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ExecutionError::failed("exit 2"))
        }));

        let (record, result) = Chain::empty().invoke(job).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(result, Err(ExecutionError::failed("exit 2")));
        assert!(record.failed());
        assert!(record.is_finished());
    }

    #[tokio::test]
    async fn test_counting_middleware_runs_once_per_invoke() {
        let counting = Arc::new(CountingMiddleware::new());
        let chain = Chain::builder().with(counting.clone()).build();

        chain.invoke(Arc::new(NoOpJob::new("noop"))).await;
        chain.invoke(Arc::new(NoOpJob::new("noop"))).await;

        assert_eq!(counting.before_count.load(Ordering::SeqCst), 2);
        assert_eq!(counting.after_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_default_run_passes_through() {
        let chain = Chain::builder().with(Arc::new(PassThrough)).build();
        let (record, result) = chain.invoke(Arc::new(NoOpJob::new("noop"))).await;

        assert!(result.is_ok());
        assert!(!record.failed());
    }

    #[test]
    fn test_invoke_from_blocking_caller() {
        let chain = Chain::builder().with(Arc::new(PassThrough)).build();
        let (record, result) = tokio_test::block_on(chain.invoke(Arc::new(NoOpJob::new("noop"))));

        assert!(result.is_ok());
        assert!(record.is_finished());
    }

    #[tokio::test]
    async fn test_chain_short_circuit() {
        let log = EventLog::new();
        let chain = Chain::builder()
            .with(Arc::new(StoppingMiddleware::new(
                "guard",
                ExecutionError::middleware("guard", "denied"),
            )))
            .with(Arc::new(RecordingMiddleware::new("inner", log.clone())))
            .build();

        let (record, result) = chain.invoke(Arc::new(NoOpJob::new("noop"))).await;

        assert!(log.events().is_empty());
        assert!(record.failed());
        assert_eq!(result, Err(ExecutionError::middleware("guard", "denied")));
    }

    #[tokio::test]
    async fn test_job_timeout_fails_run() {
        let log = EventLog::new();
        let outer = Arc::new(RecordingMiddleware::new("outer", log.clone()));
        let chain = Chain::builder()
            .with(outer.clone())
            .job_timeout(Duration::from_millis(10))
            .build();

        let (record, result) = chain
            .invoke(Arc::new(crate::testing::SlowJob::with_delay_ms("sleepy", 5_000)))
            .await;

        let expected = ExecutionError::timeout(Duration::from_millis(10));
        assert_eq!(result, Err(expected.clone()));
        assert!(record.failed());
        assert_eq!(record.error(), Some(&expected));
        assert!(outer.observations()[0].failed);
    }

    #[tokio::test]
    async fn test_job_within_timeout_succeeds() {
        let chain = Chain::builder().job_timeout(Duration::from_secs(5)).build();
        assert_eq!(chain.job_timeout(), Some(Duration::from_secs(5)));

        let (record, result) = chain.invoke(Arc::new(NoOpJob::new("noop"))).await;

        assert!(result.is_ok());
        assert!(!record.failed());
    }
}
