//! Read-only persistence boundary for location and posting pools.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{JobPosting, Location};

/// Errors that can occur while loading pools
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Snapshot I/O error: {0}")]
    Snapshot(#[from] std::io::Error),

    #[error("Snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Snapshot source for the matching core
///
/// Every call returns a fresh, read-only copy; nothing in the core writes back.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn load_locations(&self) -> Result<Vec<Location>, StoreError>;

    async fn load_postings(&self) -> Result<Vec<JobPosting>, StoreError>;

    async fn find_posting(&self, id: i64) -> Result<Option<JobPosting>, StoreError>;

    async fn count_locations(&self) -> Result<usize, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}
