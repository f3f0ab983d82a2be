//! # Jobchain
//!
//! Middleware chain execution for scheduled jobs.
//!
//! Jobchain wraps every job run in an ordered, composable chain of
//! middlewares with support for:
//!
//! - **Onion composition**: middlewares run in declaration order and
//!   post-process in reverse order as nested calls return
//! - **Early stop**: any middleware can fix the run's outcome; the first
//!   stop wins
//! - **Guaranteed reporting**: observability middlewares still run after an
//!   early stop
//! - **Webhook notifications**: Slack-compatible run reports whose delivery
//!   failures never fail the job
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jobchain::prelude::*;
//!
//! let chain = Chain::builder()
//!     .with(Arc::new(LoggingMiddleware::default()))
//!     .with_optional(WebhookMiddleware::from_config(webhook_config)?.map(|w| Arc::new(w) as _))
//!     .build();
//!
//! let job = Arc::new(FnJob::new(JobDescriptor::new("backup", "tar czf"), |_ctx| Ok(())));
//! let (record, result) = chain.invoke(job).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod errors;
pub mod execution;
pub mod middleware;
pub mod observability;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ChainConfig, ConfiguredChain};
    pub use crate::context::RunContext;
    pub use crate::errors::{ConfigError, DeliveryError, ExecutionError};
    pub use crate::execution::{
        AsyncFnJob, ExecutionRecord, FnJob, Job, JobDescriptor, NoOpJob, RunPhase,
    };
    pub use crate::middleware::{
        Chain, ChainBuilder, LoggingMiddleware, MetricsMiddleware, MetricsSnapshot, Middleware,
        OverlapMiddleware,
    };
    #[cfg(feature = "webhook")]
    pub use crate::middleware::{WebhookConfig, WebhookMiddleware};
    pub use crate::observability::{init_tracing, LogFormat};
}
