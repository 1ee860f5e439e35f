//! SMS delivery through the Twilio Messages API.

use courier_common::config::AppConfig;
use courier_common::error::AppError;
use courier_common::types::{NotificationType, SmsMessage};

use super::{ChannelError, ChannelSender, DEFAULT_HTTP_TIMEOUT, check_response, http_client, require};

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// Scheme and host, without trailing slash.
    pub api_base: String,
}

impl TwilioConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self {
            account_sid: require(&config.twilio_account_sid, "TWILIO_ACCOUNT_SID")?,
            auth_token: require(&config.twilio_auth_token, "TWILIO_AUTH_TOKEN")?,
            from_number: require(&config.twilio_from_number, "TWILIO_FROM_NUMBER")?,
            api_base: config.twilio_api_base.trim_end_matches('/').to_string(),
        })
    }
}

pub struct TwilioChannel {
    http: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioChannel {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            http: http_client(DEFAULT_HTTP_TIMEOUT),
            config,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self::new(TwilioConfig::from_app_config(config)?))
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base, self.config.account_sid
        )
    }

    fn build_form<'a>(&'a self, message: &'a SmsMessage) -> [(&'static str, &'a str); 3] {
        [
            ("To", message.to.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Body", message.text.as_str()),
        ]
    }
}

impl ChannelSender for TwilioChannel {
    type Message = SmsMessage;

    const KIND: NotificationType = NotificationType::Sms;

    async fn send(&self, message: &SmsMessage) -> Result<(), ChannelError> {
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&self.build_form(message))
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

    fn config(api_base: &str) -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+15559990000".to_string(),
            api_base: api_base.to_string(),
        }
    }

    #[test]
    fn test_form_fields() {
        let channel = TwilioChannel::new(config("https://api.twilio.com"));
        let message = SmsMessage::new("Hi", "+15550001111").unwrap();

        assert_eq!(
            channel.build_form(&message),
            [("To", "+15550001111"), ("From", "+15559990000"), ("Body", "Hi")]
        );
        assert_eq!(
            channel.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn test_send_posts_form_with_basic_auth() {
        let (base, requests) = test_server::spawn(StatusCode::CREATED).await;
        let channel = TwilioChannel::new(config(&base));

        channel
            .send(&SmsMessage::new("Hi there", "+15550001111").unwrap())
            .await
            .unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let captured = &requests[0];
        assert_eq!(captured.path, "/2010-04-01/Accounts/AC123/Messages.json");
        // base64("AC123:secret")
        assert_eq!(
            captured.headers["authorization"],
            "Basic QUMxMjM6c2VjcmV0"
        );
        assert_eq!(
            captured.headers["content-type"],
            "application/x-www-form-urlencoded"
        );
        assert!(captured.body.contains("To=%2B15550001111"));
        assert!(captured.body.contains("Body=Hi+there"));
    }

    #[tokio::test]
    async fn test_provider_error_is_failure() {
        let (base, _requests) = test_server::spawn(StatusCode::SERVICE_UNAVAILABLE).await;
        let channel = TwilioChannel::new(config(&base));

        let err = channel
            .send(&SmsMessage::new("Hi", "+15550001111").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Rejected { status: 503, .. }));
    }
}
