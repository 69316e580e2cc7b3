//! Per-call deadlines.
//!
//! A store call bounded by a deadline is raced against the clock. When the
//! clock wins the call's future is dropped, which drops any open
//! `sqlx::Transaction` and queues its rollback.

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use crate::DbError;

/// An optional point in time by which a call must finish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub const NONE: Deadline = Deadline(None);

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn after(duration: Duration) -> Self {
        Self(Some(Instant::now() + duration))
    }

    /// A deadline `duration` from now, or none when `duration` is `None`.
    pub fn from_timeout(duration: Option<Duration>) -> Self {
        duration.map(Self::after).unwrap_or_default()
    }

    /// The earlier of the two deadlines.
    pub fn min(self, other: Deadline) -> Deadline {
        match (self.0, other.0) {
            (Some(a), Some(b)) => Deadline(Some(a.min(b))),
            (a, b) => Deadline(a.or(b)),
        }
    }

    /// Run `fut` to completion or fail with [`DbError::DeadlineExceeded`].
    pub async fn run<T, F>(self, fut: F) -> Result<T, DbError>
    where
        F: Future<Output = Result<T, DbError>>,
    {
        match self.0 {
            None => fut.await,
            Some(at) => timeout_at(at, fut)
                .await
                .map_err(|_| DbError::DeadlineExceeded)?,
        }
    }
}
