//! HTTP transport for webhook delivery.

use crate::errors::{ConfigError, DeliveryError};
use async_trait::async_trait;
use std::time::Duration;

/// Posts form-encoded fields to a webhook endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Posts `fields` form-encoded to `url` and returns the response status.
    async fn post_form(&self, url: &str, fields: Vec<(String, String)>)
        -> Result<u16, DeliveryError>;
}

/// Transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// Fails if the HTTP client cannot be built (e.g. no TLS backend).
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ConfigError::invalid("webhook", format!("cannot build HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post_form(
        &self,
        url: &str,
        fields: Vec<(String, String)>,
    ) -> Result<u16, DeliveryError> {
        let response = self
            .client
            .post(url)
            .form(&fields)
            .send()
            .await
            .map_err(|e| DeliveryError::transport(url, e.to_string()))?;

        Ok(response.status().as_u16())
    }
}
