//! Chat delivery through a Slack incoming webhook.

use serde_json::json;

use courier_common::config::AppConfig;
use courier_common::error::AppError;
use courier_common::types::{ChatMessage, NotificationType};

use super::{ChannelError, ChannelSender, DEFAULT_HTTP_TIMEOUT, check_response, http_client, require};

pub struct SlackChannel {
    http: reqwest::Client,
    webhook_url: String,
}

impl SlackChannel {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            http: http_client(DEFAULT_HTTP_TIMEOUT),
            webhook_url: webhook_url.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self::new(require(&config.slack_webhook_url, "SLACK_WEBHOOK_URL")?))
    }

    fn build_payload(message: &ChatMessage) -> serde_json::Value {
        json!({ "text": message.text })
    }
}

impl ChannelSender for SlackChannel {
    type Message = ChatMessage;

    const KIND: NotificationType = NotificationType::Chat;

    async fn send(&self, message: &ChatMessage) -> Result<(), ChannelError> {
        let response = self
            .http
            .post(&self.webhook_url)
            .json(&Self::build_payload(message))
            .send()
            .await?;

        check_response(response).await
    }
}
