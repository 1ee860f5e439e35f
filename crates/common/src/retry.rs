//! Bounded retry with a fixed delay between attempts.
//!
//! Two entry points share one loop:
//! - [`RetryPolicy::run`] retries every error until the attempt budget is spent.
//! - [`RetryPolicy::run_classified`] consults [`Classify`] and stops immediately
//!   on errors whose [`ErrorKind`] is not retriable.
//!
//! The wait between attempts is interruptible: a cancelled token or an elapsed
//! overall timeout ends the call at once, whatever budget remains.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Closed classification of failures, independent of transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    Unavailable,
    DeadlineExceeded,
    Internal,
    Unknown,
}

/// Structurally invalid requests fail the same way on every attempt.
pub fn is_retriable(kind: ErrorKind) -> bool {
    !matches!(
        kind,
        ErrorKind::InvalidArgument | ErrorKind::NotFound | ErrorKind::FailedPrecondition
    )
}

/// Errors that can report their [`ErrorKind`].
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("cancelled while waiting to retry")]
    Cancelled,

    #[error("deadline exceeded while waiting to retry")]
    DeadlineExceeded,

    #[error("failed after {attempts} attempt(s): {source}")]
    Failed { attempts: u32, source: E },
}

impl<E> RetryError<E> {
    /// The last error returned by the action, if it ran to a verdict.
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Failed { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations allowed, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
    /// Overall budget measured from the first attempt.
    pub timeout: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Invoke `op` until it succeeds or the attempt budget is exhausted.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute(cancel, op, |_| true).await
    }

    /// Like [`run`](Self::run), but non-retriable errors end the call after
    /// the attempt that produced them.
    pub async fn run_classified<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Display + Classify,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute(cancel, op, |e: &E| is_retriable(e.kind())).await
    }

    async fn execute<T, E, F, Fut, P>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
        retriable: P,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= max_attempts || !retriable(&err) {
                return Err(RetryError::Failed {
                    attempts: attempt,
                    source: err,
                });
            }

            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = self.delay.as_millis() as u64,
                error = %err,
                "Attempt failed, retrying"
            );

            let deadline_reached = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = deadline_reached => return Err(RetryError::DeadlineExceeded),
                _ = tokio::time::sleep(self.delay) => {}
            }
        }
    }
}
