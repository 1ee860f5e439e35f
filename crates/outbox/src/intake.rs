//! Intake service. Validates notification requests and admits them through
//! the idempotency guard.
//!
//! Validation happens before any transaction is opened, so a malformed request
//! never touches storage.

use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::requests::{SendChatRequest, SendEmailRequest, SendSmsRequest};
use courier_common::types::{
    ChatMessage, EmailMessage, IdempotencyKey, Notification, NotificationPayload, SmsMessage,
};

use crate::guard::{Admission, IdempotencyGuard};
use crate::repository::NotificationRepository;
use crate::store::Store;

#[derive(Clone)]
pub struct IntakeService {
    store: Store,
    guard: IdempotencyGuard,
}

impl IntakeService {
    pub fn new(store: Store) -> Self {
        Self {
            guard: IdempotencyGuard::new(store.clone()),
            store,
        }
    }

    pub async fn submit_sms(
        &self,
        key: IdempotencyKey,
        req: &SendSmsRequest,
    ) -> Result<Admission, AppError> {
        let message = SmsMessage::new(req.message.as_str(), req.send_to.as_str())?;
        self.submit(key, message.into()).await
    }

    pub async fn submit_chat(
        &self,
        key: IdempotencyKey,
        req: &SendChatRequest,
    ) -> Result<Admission, AppError> {
        let message = ChatMessage::new(req.message.as_str())?;
        self.submit(key, message.into()).await
    }

    pub async fn submit_email(
        &self,
        key: IdempotencyKey,
        req: &SendEmailRequest,
    ) -> Result<Admission, AppError> {
        let message = EmailMessage::new(
            req.message.as_str(),
            req.send_to.as_str(),
            req.subject.as_str(),
        )?;
        self.submit(key, message.into()).await
    }

    /// Admit an already-validated payload.
    pub async fn submit(
        &self,
        key: IdempotencyKey,
        payload: NotificationPayload,
    ) -> Result<Admission, AppError> {
        tracing::debug!(idempotency_key = %key, kind = %payload.kind(), "Submitting notification");
        self.guard.admit(key, &payload).await
    }

    /// Current state of a notification, for status queries.
    pub async fn find(&self, id: Uuid) -> Result<Notification, AppError> {
        NotificationRepository::find_by_id(self.store.pool(), id).await
    }
}
