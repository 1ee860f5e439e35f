//! Wire shapes of the intake API, shared by the server and the client.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the client's idempotency token.
pub const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

/// Request body for POST /api/notifications/sms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendSmsRequest {
    pub message: String,
    /// Recipient in E.164 form, e.g. `+15550001111`
    pub send_to: String,
}

/// Request body for POST /api/notifications/chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendChatRequest {
    pub message: String,
}

/// Request body for POST /api/notifications/email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendEmailRequest {
    pub message: String,
    pub send_to: String,
    pub subject: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitStatus {
    /// First sighting of the key; a notification row was created.
    Accepted,
    /// The key was admitted before; nothing was written.
    Duplicate,
}

/// Response body for every submission endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: SubmitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}
