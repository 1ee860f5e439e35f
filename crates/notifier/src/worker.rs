//! Delivery worker: drains the outbox for one channel.
//!
//! Each cycle claims a batch of undelivered rows inside one unit of work,
//! calls the channel for each row under the retry policy, records SENT or
//! FAILED, and commits. Rows stay locked for the whole cycle, so several
//! workers can poll the same channel without delivering a row twice in one
//! round.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use courier_common::config::AppConfig;
use courier_common::error::AppError;
use courier_common::retry::{RetryError, RetryPolicy};
use courier_common::types::{Notification, NotificationStatus};
use courier_outbox::{NotificationRepository, Store};

use crate::channels::{ChannelError, ChannelSender};

/// Result of handing one row to its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed,
    /// Shutdown began while waiting to retry. The row keeps its status.
    Cancelled,
}

/// Counts for one claim-deliver-commit cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
}

impl CycleReport {
    /// Claimed rows left untouched because the cycle was cancelled.
    pub fn skipped(&self) -> usize {
        self.claimed - self.sent - self.failed
    }
}

pub struct DeliveryWorker<S> {
    store: Store,
    sender: S,
    policy: RetryPolicy,
    batch_size: i64,
    poll_interval: Duration,
    max_consecutive_failures: u32,
}

impl<S: ChannelSender> DeliveryWorker<S> {
    pub fn new(store: Store, sender: S, policy: RetryPolicy) -> Self {
        Self {
            store,
            sender,
            policy,
            batch_size: 100,
            poll_interval: Duration::from_secs(10),
            max_consecutive_failures: 30,
        }
    }

    pub fn from_config(store: Store, sender: S, config: &AppConfig) -> Self {
        Self::new(store, sender, config.retry_policy())
            .with_batch_size(config.worker_batch_size)
            .with_poll_interval(config.poll_interval())
            .with_max_consecutive_failures(config.worker_max_consecutive_failures)
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Zero disables the limit.
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    /// Poll until `cancel` fires.
    ///
    /// A failed cycle is logged and the loop carries on. After
    /// `max_consecutive_failures` failed cycles in a row the last error is
    /// returned instead.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), AppError> {
        tracing::info!(
            channel = %S::KIND,
            batch_size = self.batch_size,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            max_attempts = self.policy.max_attempts,
            "Delivery worker started"
        );

        let mut consecutive_failures = 0u32;

        while !cancel.is_cancelled() {
            match self.run_cycle(cancel).await {
                Ok(_) => consecutive_failures = 0,
                Err(e) => {
                    consecutive_failures += 1;
                    tracing::error!(
                        channel = %S::KIND,
                        error = %e,
                        consecutive_failures,
                        "Delivery cycle failed"
                    );
                    if self.max_consecutive_failures > 0
                        && consecutive_failures >= self.max_consecutive_failures
                    {
                        return Err(e);
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!(channel = %S::KIND, "Delivery worker stopped");
        Ok(())
    }

    /// Claim one batch, deliver it, and commit the new statuses.
    ///
    /// On cancellation the rows already handled are committed and the rest
    /// are released unchanged for the next poll. A storage error rolls the
    /// whole batch back.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, AppError> {
        let mut uow = self.store.begin().await?;
        let mut batch =
            NotificationRepository::get_batch_by_type(&mut uow, S::KIND, self.batch_size).await?;

        let mut report = CycleReport {
            claimed: batch.len(),
            ..CycleReport::default()
        };

        for row in batch.iter_mut() {
            if cancel.is_cancelled() {
                break;
            }

            let next = match self.deliver(row, cancel).await {
                DeliveryOutcome::Sent => NotificationStatus::Sent,
                DeliveryOutcome::Failed => NotificationStatus::Failed,
                DeliveryOutcome::Cancelled => break,
            };

            row.transition(next)
                .map_err(|e| AppError::Internal(e.to_string()))?;
            NotificationRepository::update(&mut uow, row).await?;

            match next {
                NotificationStatus::Sent => report.sent += 1,
                _ => report.failed += 1,
            }
        }

        uow.commit().await?;

        if report.claimed > 0 {
            tracing::info!(
                channel = %S::KIND,
                claimed = report.claimed,
                sent = report.sent,
                failed = report.failed,
                skipped = report.skipped(),
                "Delivery cycle complete"
            );
        } else {
            tracing::debug!(channel = %S::KIND, "Nothing to deliver");
        }

        Ok(report)
    }

    /// Hand one row to the channel, retrying per the policy.
    pub async fn deliver(&self, row: &Notification, cancel: &CancellationToken) -> DeliveryOutcome {
        let message = match decode::<S>(row) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(
                    notification_id = %row.id,
                    channel = %S::KIND,
                    error = %e,
                    "Undeliverable notification payload"
                );
                return DeliveryOutcome::Failed;
            }
        };

        let result = self
            .policy
            .run(cancel, |_attempt| self.sender.send(&message))
            .await;

        match result {
            Ok(()) => {
                tracing::debug!(notification_id = %row.id, channel = %S::KIND, "Notification sent");
                DeliveryOutcome::Sent
            }
            Err(RetryError::Cancelled) => DeliveryOutcome::Cancelled,
            Err(e) => {
                tracing::warn!(
                    notification_id = %row.id,
                    channel = %S::KIND,
                    error = %e,
                    "Notification delivery failed"
                );
                DeliveryOutcome::Failed
            }
        }
    }
}

fn decode<S: ChannelSender>(row: &Notification) -> Result<S::Message, ChannelError> {
    let payload = row.payload()?;
    Ok(S::Message::try_from(payload)?)
}
