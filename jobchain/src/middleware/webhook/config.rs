//! Configuration for the webhook notifier.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`WebhookMiddleware`](super::WebhookMiddleware).
///
/// An empty endpoint URL disables the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WebhookConfig {
    /// Incoming webhook URL.
    #[serde(default, alias = "slack-webhook")]
    pub endpoint_url: String,
    /// Only report failed runs.
    #[serde(default, alias = "slack-on-error")]
    pub report_on_error_only: bool,
    /// Display name of the message author.
    #[serde(default = "default_username")]
    pub username: String,
    /// Avatar URL of the message author.
    #[serde(default)]
    pub icon_url: String,
    /// Delivery timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
}

fn default_username() -> String {
    "jobchain".to_string()
}

fn default_timeout() -> f64 {
    10.0
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            report_on_error_only: false,
            username: default_username(),
            icon_url: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl WebhookConfig {
    /// Creates a configuration for `endpoint_url` with defaults.
    #[must_use]
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }

    /// Sets whether only failed runs are reported.
    #[must_use]
    pub fn with_report_on_error_only(mut self, value: bool) -> Self {
        self.report_on_error_only = value;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Sets the avatar URL.
    #[must_use]
    pub fn with_icon_url(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = icon_url.into();
        self
    }

    /// Sets the delivery timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Returns true if an endpoint is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.endpoint_url.trim().is_empty()
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(ConfigError::invalid(
                "timeout-seconds",
                format!("must be a positive number of seconds, got {}", self.timeout_seconds),
            ));
        }
        if self.is_enabled()
            && !(self.endpoint_url.starts_with("http://") || self.endpoint_url.starts_with("https://"))
        {
            return Err(ConfigError::invalid(
                "endpoint-url",
                format!("expected an http(s) URL, got {:?}", self.endpoint_url),
            ));
        }
        Ok(())
    }
}
