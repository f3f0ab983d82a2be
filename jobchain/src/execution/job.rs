//! Job descriptors and the terminal job step.

use crate::context::RunContext;
use crate::errors::ExecutionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::future::Future;

/// Read-only description of a scheduled job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// The job name.
    pub name: String,
    /// The command the job runs.
    pub command: String,
}

impl JobDescriptor {
    /// Creates a new job descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }

    /// Returns the job name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the job command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }
}

/// The terminal step of a chain: the job itself.
///
/// The job runs at most once per run, after every entered middleware has
/// called [`RunContext::next`].
#[async_trait]
pub trait Job: Send + Sync + Debug {
    /// Returns the job descriptor.
    fn descriptor(&self) -> &JobDescriptor;

    /// Runs the job.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The run context, usable to record output
    async fn run(&self, ctx: &mut RunContext) -> Result<(), ExecutionError>;
}

/// A simple function-based job.
pub struct FnJob<F>
where
    F: Fn(&mut RunContext) -> Result<(), ExecutionError> + Send + Sync,
{
    descriptor: JobDescriptor,
    func: F,
}

impl<F> FnJob<F>
where
    F: Fn(&mut RunContext) -> Result<(), ExecutionError> + Send + Sync,
{
    /// Creates a new function-based job.
    pub fn new(descriptor: JobDescriptor, func: F) -> Self {
        Self { descriptor, func }
    }
}

impl<F> Debug for FnJob<F>
where
    F: Fn(&mut RunContext) -> Result<(), ExecutionError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnJob")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

#[async_trait]
impl<F> Job for FnJob<F>
where
    F: Fn(&mut RunContext) -> Result<(), ExecutionError> + Send + Sync,
{
    fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<(), ExecutionError> {
        (self.func)(ctx)
    }
}

/// An async function-based job.
pub struct AsyncFnJob<F, Fut>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ExecutionError>> + Send,
{
    descriptor: JobDescriptor,
    func: F,
}

impl<F, Fut> AsyncFnJob<F, Fut>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ExecutionError>> + Send,
{
    /// Creates a new async function-based job.
    pub fn new(descriptor: JobDescriptor, func: F) -> Self {
        Self { descriptor, func }
    }
}

impl<F, Fut> Debug for AsyncFnJob<F, Fut>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ExecutionError>> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFnJob")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

#[async_trait]
impl<F, Fut> Job for AsyncFnJob<F, Fut>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ExecutionError>> + Send,
{
    fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    async fn run(&self, _ctx: &mut RunContext) -> Result<(), ExecutionError> {
        (self.func)().await
    }
}

/// A job that does nothing and succeeds.
#[derive(Debug, Clone)]
pub struct NoOpJob {
    descriptor: JobDescriptor,
}

impl NoOpJob {
    /// Creates a new no-op job.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            descriptor: JobDescriptor::new(name, "true"),
        }
    }
}

#[async_trait]
impl Job for NoOpJob {
    fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    async fn run(&self, _ctx: &mut RunContext) -> Result<(), ExecutionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Chain;
    use std::sync::Arc;

    #[test]
    fn test_job_descriptor_accessors() {
        let job = JobDescriptor::new("backup", "tar czf /tmp/backup.tgz /srv");
        assert_eq!(job.name(), "backup");
        assert_eq!(job.command(), "tar czf /tmp/backup.tgz /srv");
    }

    #[tokio::test]
    async fn test_fn_job_records_output() {
        let job = Arc::new(FnJob::new(JobDescriptor::new("echo", "echo hi"), |ctx| {
            ctx.record_output("hi\n");
            Ok(())
        }));

        let (record, result) = Chain::empty().invoke(job).await;
        assert!(result.is_ok());
        assert_eq!(record.output(), Some("hi\n"));
    }

    #[tokio::test]
    async fn test_async_fn_job() {
        let job = Arc::new(AsyncFnJob::new(JobDescriptor::new("fail", "false"), || async {
            Err(ExecutionError::failed("exit 1"))
        }));

        assert_eq!(job.descriptor().name(), "fail");

        let (record, result) = Chain::empty().invoke(job).await;
        assert_eq!(result, Err(ExecutionError::failed("exit 1")));
        assert!(record.failed());
    }

    #[tokio::test]
    async fn test_noop_job() {
        let job = Arc::new(NoOpJob::new("noop"));
        let (record, result) = Chain::empty().invoke(job).await;
        assert!(result.is_ok());
        assert!(!record.failed());
    }
}
