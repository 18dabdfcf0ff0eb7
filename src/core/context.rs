use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::MatchError;

/// Per-request state threaded through every tool call
///
/// Carries the request id used in log spans and the absolute deadline that
/// bounds geocoding and the routing worker pool.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub deadline: Instant,
}

impl RequestContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            deadline: Instant::now() + timeout,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Run a future that must finish before the deadline
    pub async fn run<T, F>(&self, future: F) -> Result<T, MatchError>
    where
        F: Future<Output = Result<T, MatchError>>,
    {
        tokio::time::timeout_at(self.deadline, future)
            .await
            .map_err(|_| MatchError::DeadlineExceeded)?
    }
}
