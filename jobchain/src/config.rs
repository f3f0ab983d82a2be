//! Chain configuration.
//!
//! A [`ChainConfig`] describes which middlewares a scheduler installs around
//! its jobs. It is loaded once at startup, typically from a JSON file:
//!
//! ```json
//! {
//!   "logging": true,
//!   "no-overlap": true,
//!   "job-timeout-seconds": 3600,
//!   "webhook": {
//!     "endpoint-url": "https://hooks.example.com/services/T000/B000",
//!     "report-on-error-only": true
//!   }
//! }
//! ```

use crate::errors::ConfigError;
use crate::middleware::{
    Chain, ChainBuilder, LoggingMiddleware, MetricsMiddleware, Middleware, OverlapMiddleware,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "webhook")]
use crate::middleware::{WebhookConfig, WebhookMiddleware};

/// Middleware selection for a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainConfig {
    /// Install the logging middleware.
    #[serde(default = "default_true")]
    pub logging: bool,
    /// Install the metrics middleware.
    #[serde(default)]
    pub metrics: bool,
    /// Skip runs of a job that is already running.
    #[serde(default)]
    pub no_overlap: bool,
    /// Fail runs whose job step takes longer than this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_timeout_seconds: Option<f64>,
    /// Webhook notifier settings.
    #[cfg(feature = "webhook")]
    #[serde(default)]
    pub webhook: WebhookConfig,
}

fn default_true() -> bool {
    true
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            logging: default_true(),
            metrics: false,
            no_overlap: false,
            job_timeout_seconds: None,
            #[cfg(feature = "webhook")]
            webhook: WebhookConfig::default(),
        }
    }
}

/// A chain built from configuration, with handles to the shared
/// middlewares callers may want to inspect.
#[derive(Debug, Clone)]
pub struct ConfiguredChain {
    /// The composed chain.
    pub chain: Chain,
    /// The metrics middleware, when enabled.
    pub metrics: Option<Arc<MetricsMiddleware>>,
}

impl ChainConfig {
    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(seconds) = self.job_timeout_seconds {
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(ConfigError::invalid(
                    "job-timeout-seconds",
                    "must be a positive number of seconds",
                ));
            }
        }
        #[cfg(feature = "webhook")]
        self.webhook.validate()?;
        Ok(())
    }

    /// Builds the chain.
    ///
    /// Middlewares are installed in this order: logging, metrics, overlap
    /// guard, webhook. A webhook without endpoint URL is not installed.
    pub fn build_chain(&self) -> Result<ConfiguredChain, ConfigError> {
        let mut builder = ChainBuilder::new();
        builder.set_job_timeout(self.job_timeout());

        if self.logging {
            builder.add(Arc::new(LoggingMiddleware::default()));
        }

        let metrics = self.metrics.then(|| Arc::new(MetricsMiddleware::new()));
        if let Some(metrics) = &metrics {
            builder.add(Arc::clone(metrics) as Arc<dyn Middleware>);
        }

        if self.no_overlap {
            builder.add(Arc::new(OverlapMiddleware::new()));
        }

        #[cfg(feature = "webhook")]
        {
            let webhook = WebhookMiddleware::from_config(self.webhook.clone())?;
            builder = builder.with_optional(webhook.map(|w| Arc::new(w) as Arc<dyn Middleware>));
        }

        Ok(ConfiguredChain {
            chain: builder.build(),
            metrics,
        })
    }

    /// Returns the job step's time limit, if configured.
    #[must_use]
    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_seconds.map(Duration::from_secs_f64)
    }
}
