//! Mock middlewares and jobs for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::context::RunContext;
use crate::errors::ExecutionError;
use crate::execution::{Job, JobDescriptor, RunPhase};
use crate::middleware::Middleware;

/// A shared, ordered log of chain events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Creates a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// What a [`RecordingMiddleware`] saw after its `next` call returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Whether the record was marked failed.
    pub failed: bool,
    /// Whether the run had been stopped.
    pub stopped: bool,
    /// The phase at that point.
    pub phase: RunPhase,
    /// The error returned by `next`.
    pub returned: Option<ExecutionError>,
}

/// A middleware that logs `name:before` and `name:after` around `next`.
#[derive(Debug)]
pub struct RecordingMiddleware {
    name: String,
    log: EventLog,
    continue_on_stop: bool,
    observations: Mutex<Vec<Observation>>,
}

impl RecordingMiddleware {
    /// Creates a new recording middleware.
    #[must_use]
    pub fn new(name: impl Into<String>, log: EventLog) -> Self {
        Self {
            name: name.into(),
            log,
            continue_on_stop: false,
            observations: Mutex::new(Vec::new()),
        }
    }

    /// Sets whether the middleware continues on stop.
    #[must_use]
    pub fn continuing_on_stop(mut self, value: bool) -> Self {
        self.continue_on_stop = value;
        self
    }

    /// Returns what the middleware observed on each run.
    #[must_use]
    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().clone()
    }
}

#[async_trait]
impl Middleware for RecordingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    fn continue_on_stop(&self) -> bool {
        self.continue_on_stop
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<(), ExecutionError> {
        self.log.push(format!("{}:before", self.name));
        let result = ctx.next().await;
        self.observations.lock().push(Observation {
            failed: ctx.execution().failed(),
            stopped: ctx.is_stopped(),
            phase: ctx.phase(),
            returned: result.as_ref().err().cloned(),
        });
        self.log.push(format!("{}:after", self.name));
        result
    }
}

/// Where a [`StoppingMiddleware`] issues its stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPoint {
    /// Stop, then continue with `next`.
    BeforeNext,
    /// Call `next`, then stop during unwind.
    AfterNext,
    /// Stop and never call `next`.
    ShortCircuit,
}

/// A middleware that stops the run with a fixed outcome.
#[derive(Debug)]
pub struct StoppingMiddleware {
    name: String,
    error: Option<ExecutionError>,
    point: StopPoint,
    continue_on_stop: bool,
}

impl StoppingMiddleware {
    /// Creates a middleware that stops with `error` before calling `next`.
    #[must_use]
    pub fn new(name: impl Into<String>, error: ExecutionError) -> Self {
        Self {
            name: name.into(),
            error: Some(error),
            point: StopPoint::BeforeNext,
            continue_on_stop: false,
        }
    }

    /// Creates a middleware that stops without an error.
    #[must_use]
    pub fn clean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: None,
            point: StopPoint::BeforeNext,
            continue_on_stop: false,
        }
    }

    /// Sets where the stop is issued.
    #[must_use]
    pub fn at(mut self, point: StopPoint) -> Self {
        self.point = point;
        self
    }

    /// Sets whether the middleware continues on stop.
    #[must_use]
    pub fn continuing_on_stop(mut self, value: bool) -> Self {
        self.continue_on_stop = value;
        self
    }
}

#[async_trait]
impl Middleware for StoppingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    fn continue_on_stop(&self) -> bool {
        self.continue_on_stop
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<(), ExecutionError> {
        match self.point {
            StopPoint::BeforeNext => {
                ctx.stop(self.error.clone());
                ctx.next().await
            }
            StopPoint::AfterNext => {
                let result = ctx.next().await;
                ctx.stop(self.error.clone());
                result
            }
            StopPoint::ShortCircuit => {
                ctx.stop(self.error.clone());
                self.error.clone().map_or(Ok(()), Err)
            }
        }
    }
}

/// A job that logs `job` and returns a fixed outcome.
#[derive(Debug)]
pub struct ScriptedJob {
    descriptor: JobDescriptor,
    outcome: Result<(), ExecutionError>,
    output: Option<String>,
    log: Option<EventLog>,
}

impl ScriptedJob {
    /// Creates a job that succeeds.
    #[must_use]
    pub fn succeeding(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            descriptor: JobDescriptor::new(name, command),
            outcome: Ok(()),
            output: None,
            log: None,
        }
    }

    /// Creates a job that fails with `message`.
    #[must_use]
    pub fn failing(
        name: impl Into<String>,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            descriptor: JobDescriptor::new(name, command),
            outcome: Err(ExecutionError::failed(message)),
            output: None,
            log: None,
        }
    }

    /// Sets output the job records when it runs.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Sets the log the job writes `job` to.
    #[must_use]
    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }
}

#[async_trait]
impl Job for ScriptedJob {
    fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<(), ExecutionError> {
        if let Some(log) = &self.log {
            log.push("job");
        }
        if let Some(output) = &self.output {
            ctx.record_output(output);
        }
        self.outcome.clone()
    }
}

/// A job that takes time to execute.
#[derive(Debug)]
pub struct SlowJob {
    descriptor: JobDescriptor,
    delay: Duration,
}

impl SlowJob {
    /// Creates a new slow job.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            descriptor: JobDescriptor::new(name, "sleep"),
            delay,
        }
    }

    /// Creates a slow job with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(name: impl Into<String>, ms: u64) -> Self {
        Self::new(name, Duration::from_millis(ms))
    }
}

#[async_trait]
impl Job for SlowJob {
    fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    async fn run(&self, _ctx: &mut RunContext) -> Result<(), ExecutionError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
