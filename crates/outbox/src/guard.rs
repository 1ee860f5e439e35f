//! Idempotency guard: admits a notification at most once per client key.
//!
//! The key lookup, the key insert and the notification insert share one
//! transaction. Either both rows become visible or neither does.

use courier_common::error::AppError;
use courier_common::types::{IdempotencyKey, Notification, NotificationPayload};

use crate::repository::{IdempotencyRepository, NotificationRepository};
use crate::store::Store;

/// Outcome of an admission attempt. A duplicate is a successful no-op.
#[derive(Debug, Clone)]
pub enum Admission {
    Admitted(Notification),
    Duplicate,
}

impl Admission {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Admission::Duplicate)
    }
}

#[derive(Clone)]
pub struct IdempotencyGuard {
    store: Store,
}

impl IdempotencyGuard {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Persist `payload` as a PENDING notification unless `key` was seen before.
    ///
    /// Storage failures roll the transaction back; the client may replay the
    /// same key safely.
    pub async fn admit(
        &self,
        key: IdempotencyKey,
        payload: &NotificationPayload,
    ) -> Result<Admission, AppError> {
        let mut uow = self.store.begin().await?;

        if IdempotencyRepository::get_by_id(&mut uow, key)
            .await?
            .is_some()
        {
            uow.rollback().await?;
            tracing::debug!(idempotency_key = %key, "Duplicate admission ignored");
            return Ok(Admission::Duplicate);
        }

        // Blocks behind a concurrent admission of the same key and loses to it.
        if !IdempotencyRepository::insert_one(&mut uow, key).await? {
            uow.rollback().await?;
            tracing::debug!(idempotency_key = %key, "Concurrent duplicate admission ignored");
            return Ok(Admission::Duplicate);
        }

        let notification = NotificationRepository::insert_one(&mut uow, payload).await?;
        uow.commit().await?;

        tracing::info!(
            notification_id = %notification.id,
            kind = %notification.kind,
            idempotency_key = %key,
            "Notification admitted"
        );

        Ok(Admission::Admitted(notification))
    }
}
