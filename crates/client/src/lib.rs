//! HTTP client for the Courier intake API.
//!
//! Each call generates one idempotency key and sends it on every attempt, so
//! a retried submission can never create a second notification.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use courier_common::requests::{
    IDEMPOTENCY_HEADER, SendChatRequest, SendEmailRequest, SendSmsRequest, SubmitResponse,
};
use courier_common::retry::{Classify, ErrorKind, RetryError, RetryPolicy};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server answered {status}: {message}")]
    Status { status: u16, message: String },
}

impl Classify for ClientError {
    fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport(e) if e.is_decode() => ErrorKind::Internal,
            ClientError::Transport(_) => ErrorKind::Unavailable,
            ClientError::Status { status, .. } => kind_for_status(*status),
        }
    }
}

/// Map an HTTP status from the intake API onto an [`ErrorKind`].
pub fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        400 | 422 => ErrorKind::InvalidArgument,
        404 => ErrorKind::NotFound,
        409 | 412 => ErrorKind::FailedPrecondition,
        408 | 504 => ErrorKind::DeadlineExceeded,
        429 | 502 | 503 => ErrorKind::Unavailable,
        500..=599 => ErrorKind::Internal,
        _ => ErrorKind::Unknown,
    }
}

pub type ClientResult<T> = Result<T, RetryError<ClientError>>;

#[derive(Clone)]
pub struct CourierClient {
    http: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl CourierClient {
    pub fn new(base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy,
        }
    }

    pub async fn send_sms(
        &self,
        req: &SendSmsRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<SubmitResponse> {
        self.submit("/api/notifications/sms", req, cancel).await
    }

    pub async fn send_chat(
        &self,
        req: &SendChatRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<SubmitResponse> {
        self.submit("/api/notifications/chat", req, cancel).await
    }

    pub async fn send_email(
        &self,
        req: &SendEmailRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<SubmitResponse> {
        self.submit("/api/notifications/email", req, cancel).await
    }

    async fn submit<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> ClientResult<SubmitResponse> {
        let key = Uuid::new_v4();
        let url = format!("{}{}", self.base_url, path);

        self.policy
            .run_classified(cancel, |attempt| {
                let request = self
                    .http
                    .post(&url)
                    .header(IDEMPOTENCY_HEADER, key.to_string())
                    .json(body);

                async move {
                    tracing::debug!(idempotency_key = %key, attempt, "Submitting notification");
                    let response = request.send().await?;
                    read_response(response).await
                }
            })
            .await
    }
}

async fn read_response(response: reqwest::Response) -> Result<SubmitResponse, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<SubmitResponse>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or(text);

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
