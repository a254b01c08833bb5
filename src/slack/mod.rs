//! Delivery of the rendered briefing to a Slack incoming webhook.

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Slack webhook delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),
}

/// Exactly the payload the webhook expects: channel and text, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackMessage {
    pub channel: String,
    pub text: String,
}

pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.into(),
        }
    }

    /// One JSON POST to the webhook. A non-2xx status or transport error is
    /// returned as is; there is no retry and no partial send.
    pub async fn send(&self, message: &SlackMessage) -> Result<(), SlackError> {
        debug!("Posting {} chars to Slack webhook", message.text.len());
        self.client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
