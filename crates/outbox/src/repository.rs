//! Typed access to the `notifications` and `idempotency_keys` tables.

use chrono::Utc;
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::{
    IdempotencyKey, Notification, NotificationPayload, NotificationStatus, NotificationType,
};

use crate::store::UnitOfWork;

/// Repository for outbox rows.
pub struct NotificationRepository;

impl NotificationRepository {
    /// Insert a PENDING row for `payload`, assigning its id and timestamps.
    ///
    /// Only the idempotency guard calls this, inside its admission transaction.
    pub async fn insert_one(
        uow: &mut UnitOfWork,
        payload: &NotificationPayload,
    ) -> Result<Notification, AppError> {
        let now = Utc::now();

        let notification: Notification = sqlx::query_as(
            r#"
            INSERT INTO notifications (id, type, status, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payload.kind().to_string())
        .bind(NotificationStatus::Pending.to_string())
        .bind(payload.to_data()?)
        .bind(now)
        .fetch_one(uow.conn())
        .await?;

        Ok(notification)
    }

    /// Claim up to `limit` undelivered rows of one type, oldest first.
    ///
    /// Returned rows stay locked until `uow` ends; rows locked by another
    /// transaction are skipped, so concurrent claimers get disjoint sets.
    /// FAILED rows are claimable again, giving at-least-once delivery across
    /// polls.
    pub async fn get_batch_by_type(
        uow: &mut UnitOfWork,
        kind: NotificationType,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError> {
        let rows: Vec<Notification> = sqlx::query_as(
            r#"
            SELECT *
            FROM notifications
            WHERE type = $1
              AND status <> $2
            ORDER BY created_at
            LIMIT $3
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(kind.to_string())
        .bind(NotificationStatus::Sent.to_string())
        .bind(limit)
        .fetch_all(uow.conn())
        .await?;

        Ok(rows)
    }

    /// Persist `status` and `updated_at` of an existing row.
    ///
    /// A row that is missing, or already SENT, is reported as `NotFound`.
    pub async fn update(uow: &mut UnitOfWork, notification: &Notification) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = $1, updated_at = $2
            WHERE id = $3
              AND status <> $4
            "#,
        )
        .bind(notification.status.to_string())
        .bind(notification.updated_at)
        .bind(notification.id)
        .bind(NotificationStatus::Sent.to_string())
        .execute(uow.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Notification {} not found or already sent",
                notification.id
            )));
        }

        Ok(())
    }

    /// Look up a single row. Works against a pool or an open unit of work.
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Notification, AppError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))
    }
}

/// Repository for admitted idempotency keys.
pub struct IdempotencyRepository;

impl IdempotencyRepository {
    pub async fn get_by_id(
        uow: &mut UnitOfWork,
        key: IdempotencyKey,
    ) -> Result<Option<IdempotencyKey>, AppError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM idempotency_keys WHERE id = $1")
            .bind(key.as_uuid())
            .fetch_optional(uow.conn())
            .await?;

        Ok(row.map(|(id,)| IdempotencyKey::new(id)))
    }

    /// Record `key`. Returns `false` when the key already exists.
    ///
    /// If another open transaction has inserted the same key, this waits for
    /// it to finish and then reports `false` if it committed.
    pub async fn insert_one(uow: &mut UnitOfWork, key: IdempotencyKey) -> Result<bool, AppError> {
        let result =
            sqlx::query("INSERT INTO idempotency_keys (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
                .bind(key.as_uuid())
                .execute(uow.conn())
                .await?;

        Ok(result.rows_affected() == 1)
    }
}
