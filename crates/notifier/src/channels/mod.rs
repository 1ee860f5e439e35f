//! Delivery channels. Each one turns a typed message into a single call to an
//! external provider.

pub mod resend;
pub mod slack;
pub mod twilio;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use courier_common::error::AppError;
use courier_common::types::{NotificationPayload, NotificationType, PayloadMismatch};

pub use resend::ResendChannel;
pub use slack::SlackChannel;
pub use twilio::TwilioChannel;

/// Per-request timeout for provider calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// An external provider that delivers one kind of notification.
pub trait ChannelSender: Send + Sync {
    /// Typed message this channel accepts.
    type Message: TryFrom<NotificationPayload, Error = PayloadMismatch> + Send + Sync;

    /// Outbox rows of this type are routed here.
    const KIND: NotificationType;

    fn send(&self, message: &Self::Message)
    -> impl Future<Output = Result<(), ChannelError>> + Send;
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected delivery with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Undecodable payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Payload(#[from] PayloadMismatch),
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Any non-2xx answer is a failed delivery.
pub(crate) async fn check_response(response: reqwest::Response) -> Result<(), ChannelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::Rejected {
        status: status.as_u16(),
        body,
    })
}

/// A credential the channel cannot start without.
fn require(value: &Option<String>, var: &str) -> Result<String, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Config(format!("{} must be set for this channel", var)))
}
