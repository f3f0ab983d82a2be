//! Error types for the jobchain crate.
//!
//! Two families of errors never mix: an [`ExecutionError`] is the
//! authoritative outcome of a job run and travels outward through the chain,
//! while a [`DeliveryError`] belongs to a side channel (a notification
//! endpoint) and is only ever logged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// The authoritative outcome of a failed or skipped run.
///
/// Produced by the job itself or by a middleware calling
/// [`RunContext::stop`](crate::context::RunContext::stop).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionError {
    /// The job reported a failure; displays the bare message.
    #[error("{message}")]
    Failed {
        /// The failure message (e.g. `exit 1`).
        message: String,
    },

    /// The run was skipped before reaching the job.
    #[error("Execution skipped: {reason}")]
    Skipped {
        /// Why the run was skipped.
        reason: String,
    },

    /// The job exceeded its allotted time.
    #[error("Execution timed out after {timeout:?}")]
    Timeout {
        /// The limit that was exceeded.
        timeout: Duration,
    },

    /// The run was cancelled.
    #[error("Execution cancelled: {reason}")]
    Cancelled {
        /// The cancel reason.
        reason: String,
    },

    /// A middleware aborted the run.
    #[error("Middleware '{name}' aborted the run: {message}")]
    Middleware {
        /// The middleware name.
        name: String,
        /// The abort message.
        message: String,
    },
}

impl ExecutionError {
    /// Creates a job failure error.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Creates a skipped-run error.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub const fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Creates a middleware abort error.
    #[must_use]
    pub fn middleware(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Middleware {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error marks a skipped run rather than a failure.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        let kind = match self {
            Self::Failed { .. } => "failed",
            Self::Skipped { .. } => "skipped",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::Middleware { name, .. } => {
                map.insert("middleware".to_string(), serde_json::json!(name));
                "middleware"
            }
        };

        map.insert("kind".to_string(), serde_json::json!(kind));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Errors raised while delivering a notification.
///
/// These are contained by the middleware that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The request never produced a response.
    #[error("Error calling {url:?}: {reason}")]
    Transport {
        /// The endpoint URL.
        url: String,
        /// The underlying transport failure.
        reason: String,
    },

    /// The endpoint answered with a non-200 status.
    #[error("Non-200 status code {status} calling {url:?}")]
    Status {
        /// The endpoint URL.
        url: String,
        /// The returned status code.
        status: u16,
    },

    /// The message could not be encoded.
    #[error("Failed to encode notification payload: {0}")]
    Encode(String),
}

impl DeliveryError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a status error.
    #[must_use]
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }
}

impl From<serde_json::Error> for DeliveryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

/// Errors raised while loading chain configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be parsed.
    #[error("Invalid configuration syntax: {0}")]
    Parse(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("Invalid configuration value for '{key}': {reason}")]
    Invalid {
        /// The offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_displays_bare_message() {
        let err = ExecutionError::failed("exit 1");
        assert_eq!(err.to_string(), "exit 1");
        assert!(!err.is_skipped());
    }

    #[test]
    fn test_skipped_is_flagged() {
        let err = ExecutionError::skipped("job already running");
        assert!(err.is_skipped());
        assert!(err.to_string().contains("job already running"));
    }

    #[test]
    fn test_execution_error_to_dict() {
        let err = ExecutionError::middleware("guard", "denied");
        let dict = err.to_dict();

        assert_eq!(dict.get("kind").unwrap(), "middleware");
        assert_eq!(dict.get("middleware").unwrap(), "guard");
    }

    #[test]
    fn test_execution_error_serde_tag() {
        let err = ExecutionError::failed("boom");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "failed");
        assert_eq!(value["message"], "boom");
    }

    #[test]
    fn test_delivery_error_messages() {
        let err = DeliveryError::status("http://hooks.local", 500);
        assert!(err.to_string().contains("500"));

        let err = DeliveryError::transport("http://hooks.local", "connection refused");
        assert!(err.to_string().contains("connection refused"));
    }
}
