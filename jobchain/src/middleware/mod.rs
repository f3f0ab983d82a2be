//! Middlewares wrapping job execution.
//!
//! A [`Chain`] composes an ordered sequence of [`Middleware`]s around a job.
//! Each middleware calls [`RunContext::next`](crate::context::RunContext::next)
//! to continue and runs its own post-logic as the nested calls return.

mod chain;
mod logging;
mod metrics;
mod overlap;
#[cfg(feature = "webhook")]
pub mod webhook;


pub use chain::{Chain, ChainBuilder, Middleware};
pub use logging::LoggingMiddleware;
pub use metrics::{MetricsMiddleware, MetricsSnapshot};
pub use overlap::OverlapMiddleware;
#[cfg(feature = "webhook")]
pub use webhook::{WebhookConfig, WebhookMiddleware};
