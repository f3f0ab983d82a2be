//! Webhook notifier reporting the outcome of every run.
//!
//! Messages follow the Slack incoming-webhook format and are posted
//! form-encoded in a single `payload` field. Delivery problems are logged and
//! never change the run's outcome.

mod config;
mod message;
mod transport;

pub use config::WebhookConfig;
pub use message::{Attachment, WebhookMessage, COLOR_FAILURE, COLOR_SUCCESS};
pub use transport::{ReqwestTransport, WebhookTransport};

use super::Middleware;
use crate::context::RunContext;
use crate::errors::{ConfigError, DeliveryError, ExecutionError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

/// Form field carrying the JSON message.
pub const PAYLOAD_FIELD: &str = "payload";

/// Middleware posting a run report to a webhook endpoint.
///
/// Holds no per-run state and is safe to share across concurrent runs.
pub struct WebhookMiddleware {
    config: WebhookConfig,
    transport: Arc<dyn WebhookTransport>,
}

impl WebhookMiddleware {
    /// Creates the notifier from configuration.
    ///
    /// Returns `Ok(None)` when no endpoint URL is configured.
    pub fn from_config(config: WebhookConfig) -> Result<Option<Self>, ConfigError> {
        if !config.is_enabled() {
            return Ok(None);
        }
        config.validate()?;

        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Some(Self::with_transport(config, Arc::new(transport))))
    }

    /// Creates the notifier with a custom transport.
    #[must_use]
    pub fn with_transport(config: WebhookConfig, transport: Arc<dyn WebhookTransport>) -> Self {
        Self { config, transport }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Builds the message for a finished run.
    #[must_use]
    pub fn build_message(&self, ctx: &RunContext) -> WebhookMessage {
        WebhookMessage::for_run(ctx, &self.config.username, &self.config.icon_url)
    }

    /// Returns true if the run in `ctx` should be reported.
    #[must_use]
    pub fn should_report(&self, ctx: &RunContext) -> bool {
        ctx.execution().failed() || !self.config.report_on_error_only
    }

    async fn push_message(&self, ctx: &RunContext) -> Result<(), DeliveryError> {
        let payload = serde_json::to_string(&self.build_message(ctx))?;
        let url = &self.config.endpoint_url;

        let status = self
            .transport
            .post_form(url, vec![(PAYLOAD_FIELD.to_string(), payload)])
            .await?;

        if status != 200 {
            return Err(DeliveryError::status(url.as_str(), status));
        }
        Ok(())
    }
}

impl std::fmt::Debug for WebhookMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookMiddleware")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Middleware for WebhookMiddleware {
    fn name(&self) -> &str {
        "webhook"
    }

    fn continue_on_stop(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<(), ExecutionError> {
        let result = ctx.next().await;
        ctx.stop_with(&result);

        if self.should_report(ctx) {
            match self.push_message(ctx).await {
                Ok(()) => debug!(job = %ctx.job().name, "Webhook notification delivered"),
                Err(err) => error!(
                    job = %ctx.job().name,
                    url = %self.config.endpoint_url,
                    error = %err,
                    "Webhook delivery failed"
                ),
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::transport::MockWebhookTransport;
    use super::*;
    use crate::middleware::Chain;
    use crate::testing::{LogCapture, ScriptedJob, StoppingMiddleware};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    const URL: &str = "https://hooks.example.com/services/T000/B000";

    type Captured = Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>;

    fn capturing_transport(status: u16, times: usize) -> (MockWebhookTransport, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);

        let mut transport = MockWebhookTransport::new();
        transport
            .expect_post_form()
            .times(times)
            .returning(move |url, fields| {
                sink.lock().push((url.to_string(), fields));
                Ok(status)
            });

        (transport, captured)
    }

    fn payload_of(captured: &Captured) -> serde_json::Value {
        let calls = captured.lock();
        let (_, fields) = &calls[0];
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, PAYLOAD_FIELD);
        serde_json::from_str(&fields[0].1).unwrap()
    }

    fn chain_with(config: WebhookConfig, transport: MockWebhookTransport) -> Chain {
        Chain::builder()
            .with(Arc::new(WebhookMiddleware::with_transport(
                config,
                Arc::new(transport),
            )))
            .build()
    }

    #[tokio::test]
    async fn test_reports_successful_run() {
        let (transport, captured) = capturing_transport(200, 1);
        let chain = chain_with(WebhookConfig::new(URL), transport);
        let logs = LogCapture::new();
        let _guard = logs.install();

        let job = Arc::new(ScriptedJob::succeeding("backup", "tar czf /tmp/backup.tgz /srv"));
        let (record, result) = chain.invoke(job).await;

        assert!(result.is_ok());
        assert!(!record.failed());
        assert!(logs.lines_at("ERROR").is_empty());
        assert!(logs.contents().contains("Webhook notification delivered"));

        assert_eq!(captured.lock()[0].0, URL);
        let payload = payload_of(&captured);
        assert_eq!(payload["username"], "jobchain");
        assert_eq!(payload["attachments"][0]["title"], "Execution successful");
        assert_eq!(payload["attachments"][0]["color"], COLOR_SUCCESS);
        assert_eq!(payload["attachments"][0]["text"], "");

        let text = payload["text"].as_str().unwrap();
        assert!(text.starts_with("Job *backup* finished in *"));
        assert!(text.ends_with(r#"command _"tar czf /tmp/backup.tgz /srv"_"#));
    }

    #[tokio::test]
    async fn test_reports_failed_run_when_on_error_only() {
        let (transport, captured) = capturing_transport(200, 1);
        let chain = chain_with(
            WebhookConfig::new(URL).with_report_on_error_only(true),
            transport,
        );

        let job = Arc::new(ScriptedJob::failing("backup", "tar czf", "exit 1"));
        let (record, result) = chain.invoke(job).await;

        assert!(record.failed());
        assert_eq!(result, Err(ExecutionError::failed("exit 1")));

        let payload = payload_of(&captured);
        assert_eq!(payload["attachments"][0]["title"], "Execution failed");
        assert_eq!(payload["attachments"][0]["text"], "exit 1");
        assert_eq!(payload["attachments"][0]["color"], COLOR_FAILURE);
    }

    #[tokio::test]
    async fn test_skips_successful_run_when_on_error_only() {
        let (transport, captured) = capturing_transport(200, 0);
        let chain = chain_with(
            WebhookConfig::new(URL).with_report_on_error_only(true),
            transport,
        );

        let (_, result) = chain
            .invoke(Arc::new(ScriptedJob::succeeding("backup", "tar czf")))
            .await;

        assert!(result.is_ok());
        assert!(captured.lock().is_empty());
    }

    #[tokio::test]
    async fn test_non_200_does_not_change_outcome() {
        let (transport, captured) = capturing_transport(500, 1);
        let chain = chain_with(WebhookConfig::new(URL), transport);
        let logs = LogCapture::new();
        let _guard = logs.install();

        let (record, result) = chain
            .invoke(Arc::new(ScriptedJob::failing("backup", "tar czf", "exit 1")))
            .await;

        assert_eq!(captured.lock().len(), 1);
        assert!(record.failed());
        assert_eq!(result, Err(ExecutionError::failed("exit 1")));

        let errors = logs.lines_at("ERROR");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Webhook delivery failed"));
        assert!(errors[0].contains("Non-200 status code 500"));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_fail_successful_run() {
        let mut transport = MockWebhookTransport::new();
        transport
            .expect_post_form()
            .times(1)
            .returning(|url, _| Err(DeliveryError::transport(url, "connection refused")));
        let chain = chain_with(WebhookConfig::new(URL), transport);
        let logs = LogCapture::new();
        let _guard = logs.install();

        let (record, result) = chain
            .invoke(Arc::new(ScriptedJob::succeeding("backup", "tar czf")))
            .await;

        assert!(result.is_ok());
        assert!(!record.failed());

        let errors = logs.lines_at("ERROR");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Webhook delivery failed"));
        assert!(errors[0].contains("connection refused"));
    }

    #[tokio::test]
    async fn test_push_message_maps_status() {
        let (transport, _) = capturing_transport(404, 1);
        let webhook =
            WebhookMiddleware::with_transport(WebhookConfig::new(URL), Arc::new(transport));

        let job: Arc<dyn crate::execution::Job> =
            Arc::new(ScriptedJob::succeeding("backup", "tar"));
        let mut ctx = RunContext::new(job, Arc::from(Vec::new()), tracing::Span::none());
        ctx.start();
        ctx.stop(None);

        let err = webhook.push_message(&ctx).await.unwrap_err();
        assert_eq!(err, DeliveryError::status(URL, 404));
    }

    #[tokio::test]
    async fn test_reports_runs_stopped_before_it() {
        let (transport, captured) = capturing_transport(200, 1);
        let chain = Chain::builder()
            .with(Arc::new(StoppingMiddleware::new(
                "guard",
                ExecutionError::middleware("guard", "quota exceeded"),
            )))
            .with(Arc::new(WebhookMiddleware::with_transport(
                WebhookConfig::new(URL).with_report_on_error_only(true),
                Arc::new(transport),
            )))
            .build();

        let (record, _) = chain
            .invoke(Arc::new(ScriptedJob::succeeding("backup", "tar czf")))
            .await;

        assert!(record.failed());
        let payload = payload_of(&captured);
        assert_eq!(payload["attachments"][0]["title"], "Execution failed");
        assert_eq!(
            payload["attachments"][0]["text"],
            "Middleware 'guard' aborted the run: quota exceeded"
        );
    }

    #[test]
    fn test_empty_url_is_not_instantiated() {
        let webhook = WebhookMiddleware::from_config(WebhookConfig::default()).unwrap();
        assert!(webhook.is_none());
    }

    #[test]
    fn test_from_config_validates() {
        let err = WebhookMiddleware::from_config(WebhookConfig::new(URL).with_timeout(-1.0));
        assert!(err.is_err());

        let webhook = WebhookMiddleware::from_config(WebhookConfig::new(URL)).unwrap();
        assert!(webhook.unwrap().continue_on_stop());
    }
}
