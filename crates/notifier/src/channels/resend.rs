//! Email delivery through the Resend HTTP API.

use serde::Serialize;

use courier_common::config::AppConfig;
use courier_common::error::AppError;
use courier_common::types::{EmailMessage, NotificationType};

use super::{ChannelError, ChannelSender, DEFAULT_HTTP_TIMEOUT, check_response, http_client, require};

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: String,
    pub from: String,
    pub api_base: String,
}

impl ResendConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self {
            api_key: require(&config.resend_api_key, "RESEND_API_KEY")?,
            from: require(&config.email_from, "EMAIL_FROM")?,
            api_base: config.resend_api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

pub struct ResendChannel {
    http: reqwest::Client,
    config: ResendConfig,
}

impl ResendChannel {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            http: http_client(DEFAULT_HTTP_TIMEOUT),
            config,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self::new(ResendConfig::from_app_config(config)?))
    }

    fn build_payload<'a>(&'a self, message: &'a EmailMessage) -> SendEmailBody<'a> {
        SendEmailBody {
            from: &self.config.from,
            to: [&message.to],
            subject: &message.subject,
            text: &message.text,
        }
    }
}

impl ChannelSender for ResendChannel {
    type Message = EmailMessage;

    const KIND: NotificationType = NotificationType::Email;

    async fn send(&self, message: &EmailMessage) -> Result<(), ChannelError> {
        let response = self
            .http
            .post(format!("{}/emails", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&self.build_payload(message))
            .send()
            .await?;

        check_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::test_server;
    use axum::http::StatusCode;

    fn config(api_base: &str) -> ResendConfig {
        ResendConfig {
            api_key: "re_test".to_string(),
            from: "alerts@courier.dev".to_string(),
            api_base: api_base.to_string(),
        }
    }

    fn message() -> EmailMessage {
        EmailMessage::new("Disk at 91%", "ops@example.com", "Disk alert").unwrap()
    }

    #[test]
    fn test_payload_shape() {
        let channel = ResendChannel::new(config("https://api.resend.com"));
        let message = message();
        let body = serde_json::to_value(channel.build_payload(&message)).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "from": "alerts@courier.dev",
                "to": ["ops@example.com"],
                "subject": "Disk alert",
                "text": "Disk at 91%",
            })
        );
    }

    #[tokio::test]
    async fn test_send_uses_bearer_key() {
        let (base, requests) = test_server::spawn(StatusCode::OK).await;
        let channel = ResendChannel::new(config(&base));

        channel.send(&message()).await.unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/emails");
        assert_eq!(requests[0].headers["authorization"], "Bearer re_test");
    }

    #[tokio::test]
    async fn test_rejected_email_carries_body() {
        let (base, _requests) = test_server::spawn(StatusCode::UNPROCESSABLE_ENTITY).await;
        let channel = ResendChannel::new(config(&base));

        match channel.send(&message()).await {
            Err(ChannelError::Rejected { status, body }) => {
                assert_eq!(status, 422);
                assert_eq!(body, "{}");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
