//! Webhook message payload.

use crate::context::RunContext;
use serde::{Deserialize, Serialize};

/// Attachment color for successful runs.
pub const COLOR_SUCCESS: &str = "#7CD197";
/// Attachment color for failed runs.
pub const COLOR_FAILURE: &str = "#F35A00";

/// A Slack-compatible incoming webhook message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookMessage {
    /// Main message text.
    pub text: String,
    /// Display name of the author.
    pub username: String,
    /// Avatar URL of the author.
    pub icon_url: String,
    /// Message attachments.
    pub attachments: Vec<Attachment>,
}

/// A message attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Side bar color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Attachment title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Attachment body.
    pub text: String,
}

impl WebhookMessage {
    /// Builds the report for a finished run.
    #[must_use]
    pub fn for_run(ctx: &RunContext, username: &str, icon_url: &str) -> Self {
        let record = ctx.execution();
        let job = ctx.job();

        let text = format!(
            "Job *{}* finished in *{:?}*, command _{:?}_",
            job.name,
            record.duration(),
            job.command,
        );

        let attachment = if record.failed() {
            Attachment {
                color: Some(COLOR_FAILURE.to_string()),
                title: Some("Execution failed".to_string()),
                text: record.error().map(ToString::to_string).unwrap_or_default(),
            }
        } else {
            Attachment {
                color: Some(COLOR_SUCCESS.to_string()),
                title: Some("Execution successful".to_string()),
                text: String::new(),
            }
        };

        Self {
            text,
            username: username.to_string(),
            icon_url: icon_url.to_string(),
            attachments: vec![attachment],
        }
    }
}
