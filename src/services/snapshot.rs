use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::{JobPosting, Location};
use crate::services::store::{Repository, StoreError};

/// In-memory pools loaded once from a JSON export
///
/// Format: `{"locations": [...], "postings": [...]}` using the camelCase
/// field names of [`Location`] and [`JobPosting`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotStore {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub postings: Vec<JobPosting>,
}

impl SnapshotStore {
    pub fn new(locations: Vec<Location>, postings: Vec<JobPosting>) -> Self {
        Self { locations, postings }
    }

    /// Load a snapshot file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let store: SnapshotStore = serde_json::from_slice(&bytes)?;

        tracing::info!(
            "Loaded snapshot {}: {} locations, {} postings",
            path.as_ref().display(),
            store.locations.len(),
            store.postings.len()
        );

        Ok(store)
    }
}

#[async_trait]
impl Repository for SnapshotStore {
    async fn load_locations(&self) -> Result<Vec<Location>, StoreError> {
        Ok(self.locations.clone())
    }

    async fn load_postings(&self) -> Result<Vec<JobPosting>, StoreError> {
        Ok(self.postings.clone())
    }

    async fn find_posting(&self, id: i64) -> Result<Option<JobPosting>, StoreError> {
        Ok(self.postings.iter().find(|posting| posting.id == id).cloned())
    }

    async fn count_locations(&self) -> Result<usize, StoreError> {
        Ok(self.locations.len())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
