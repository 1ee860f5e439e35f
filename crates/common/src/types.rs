use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;

static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").expect("valid E.164 pattern"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Delivery channel a notification is addressed to. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationType {
    Sms,
    Chat,
    Email,
}

impl NotificationType {
    pub const ALL: [NotificationType; 3] = [
        NotificationType::Sms,
        NotificationType::Chat,
        NotificationType::Email,
    ];
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::Sms => write!(f, "SMS"),
            NotificationType::Chat => write!(f, "CHAT"),
            NotificationType::Email => write!(f, "EMAIL"),
        }
    }
}

impl FromStr for NotificationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SMS" => Ok(NotificationType::Sms),
            "CHAT" => Ok(NotificationType::Chat),
            "EMAIL" => Ok(NotificationType::Email),
            _ => Err(AppError::Validation(format!(
                "Unknown notification type '{}'",
                s
            ))),
        }
    }
}

/// Notification delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    /// SENT is terminal. FAILED rows are re-claimed by later polls and may
    /// fail again or succeed.
    pub fn can_transition_to(self, next: NotificationStatus) -> bool {
        use NotificationStatus::*;
        matches!(
            (self, next),
            (Pending, Sent) | (Pending, Failed) | (Failed, Sent) | (Failed, Failed)
        )
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "PENDING"),
            NotificationStatus::Sent => write!(f, "SENT"),
            NotificationStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Client-supplied idempotency token, interpreted as a 128-bit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse a raw header value. Accepts any textual UUID form.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| AppError::InvalidIdempotencyKey(raw.to_string()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// SMS body: free text to an E.164 phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    pub text: String,
    pub to: String,
}

impl SmsMessage {
    pub fn new(text: impl Into<String>, to: impl Into<String>) -> Result<Self, AppError> {
        let message = Self {
            text: text.into(),
            to: to.into().trim().to_string(),
        };
        require_text("text", &message.text)?;
        if !E164.is_match(&message.to) {
            return Err(AppError::Validation(format!(
                "'{}' is not an E.164 phone number",
                message.to
            )));
        }
        Ok(message)
    }
}

/// Chat body: free text posted to the configured webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>) -> Result<Self, AppError> {
        let message = Self { text: text.into() };
        require_text("text", &message.text)?;
        Ok(message)
    }
}

/// Email body: plain-text message with a subject line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub text: String,
    pub to: String,
    pub subject: String,
}

impl EmailMessage {
    pub fn new(
        text: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
    ) -> Result<Self, AppError> {
        let message = Self {
            text: text.into(),
            to: to.into().trim().to_string(),
            subject: subject.into(),
        };
        require_text("text", &message.text)?;
        require_text("subject", &message.subject)?;
        if !EMAIL.is_match(&message.to) {
            return Err(AppError::Validation(format!(
                "'{}' is not a valid email address",
                message.to
            )));
        }
        Ok(message)
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Channel-specific body of a notification. The variant always agrees with
/// the row's `type` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationPayload {
    Sms(SmsMessage),
    Chat(ChatMessage),
    Email(EmailMessage),
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationType {
        match self {
            NotificationPayload::Sms(_) => NotificationType::Sms,
            NotificationPayload::Chat(_) => NotificationType::Chat,
            NotificationPayload::Email(_) => NotificationType::Email,
        }
    }

    /// Serialize the body for the `data` column.
    pub fn to_data(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            NotificationPayload::Sms(m) => serde_json::to_value(m),
            NotificationPayload::Chat(m) => serde_json::to_value(m),
            NotificationPayload::Email(m) => serde_json::to_value(m),
        }
    }

    /// Decode a stored `data` column according to its `type`.
    pub fn decode(kind: NotificationType, data: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            NotificationType::Sms => NotificationPayload::Sms(SmsMessage::deserialize(data)?),
            NotificationType::Chat => NotificationPayload::Chat(ChatMessage::deserialize(data)?),
            NotificationType::Email => NotificationPayload::Email(EmailMessage::deserialize(data)?),
        })
    }
}

/// A payload did not carry the variant a channel expected.
#[derive(Debug, Error)]
#[error("expected {expected} payload, found {found}")]
pub struct PayloadMismatch {
    pub expected: NotificationType,
    pub found: NotificationType,
}

macro_rules! payload_variant {
    ($message:ty, $variant:ident) => {
        impl From<$message> for NotificationPayload {
            fn from(message: $message) -> Self {
                NotificationPayload::$variant(message)
            }
        }

        impl TryFrom<NotificationPayload> for $message {
            type Error = PayloadMismatch;

            fn try_from(payload: NotificationPayload) -> Result<Self, Self::Error> {
                match payload {
                    NotificationPayload::$variant(message) => Ok(message),
                    other => Err(PayloadMismatch {
                        expected: NotificationType::$variant,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

payload_variant!(SmsMessage, Sms);
payload_variant!(ChatMessage, Chat);
payload_variant!(EmailMessage, Email);

/// A status change that would break monotonicity.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("notification {id} cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub id: Uuid,
    pub from: NotificationStatus,
    pub to: NotificationStatus,
}

/// A row of the `notifications` outbox table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub status: NotificationStatus,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// Decode the opaque `data` column into its typed payload.
    pub fn payload(&self) -> Result<NotificationPayload, serde_json::Error> {
        NotificationPayload::decode(self.kind, &self.data)
    }

    /// Move to `next`, stamping `updated_at`.
    pub fn transition(&mut self, next: NotificationStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now().max(self.updated_at);
        Ok(())
    }
}
