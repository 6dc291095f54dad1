//! Process-wide job registry.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use picvid_models::{JobId, JobRecord, JobUpdate};

use crate::error::{RegistryError, RegistryResult};

/// Concurrent store of job records keyed by task id.
///
/// Readers always receive cloned snapshots; records are only mutated
/// through [`JobRegistry::update`].
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Insert a fresh record.
    async fn create(&self, record: JobRecord) -> RegistryResult<JobId>;

    /// Snapshot of a record, `None` if unknown.
    async fn get(&self, id: &JobId) -> Option<JobRecord>;

    /// Apply `update` atomically and return the resulting snapshot.
    async fn update(&self, id: &JobId, update: JobUpdate) -> RegistryResult<JobRecord>;

    /// Remove a record, returning it if it existed.
    async fn delete(&self, id: &JobId) -> Option<JobRecord>;

    /// Number of records currently held.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// `RwLock<HashMap>` backed registry. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn create(&self, record: JobRecord) -> RegistryResult<JobId> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.id) {
            return Err(RegistryError::DuplicateId(record.id));
        }

        let id = record.id.clone();
        jobs.insert(id.clone(), record);
        debug!(job_id = %id, "Registered job");
        Ok(id)
    }

    async fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs.read().await.get(id).cloned()
    }

    async fn update(&self, id: &JobId, update: JobUpdate) -> RegistryResult<JobRecord> {
        let mut jobs = self.jobs.write().await;
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| RegistryError::Conflict(id.clone()))?;

        record
            .apply(update)
            .map_err(|source| RegistryError::InvalidTransition {
                id: id.clone(),
                source,
            })?;

        Ok(record.clone())
    }

    async fn delete(&self, id: &JobId) -> Option<JobRecord> {
        let removed = self.jobs.write().await.remove(id);
        if removed.is_some() {
            debug!(job_id = %id, "Removed job");
        }
        removed
    }

    async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picvid_models::JobStatus;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = InMemoryJobRegistry::new();
        let id = registry.create(JobRecord::new("clip.mp4")).await.unwrap();

        let record = registry.get(&id).await.unwrap();
        assert_eq!(record.status, JobStatus::Processing);
        assert_eq!(record.percent, 0);
        assert_eq!(record.output_filename, "clip.mp4");
        assert_eq!(registry.len().await, 1);

        assert!(registry.get(&JobId::from("missing")).await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let registry = InMemoryJobRegistry::new();
        let id = JobId::from("fixed");
        registry
            .create(JobRecord::with_id(id.clone(), "a.mp4"))
            .await
            .unwrap();

        let err = registry
            .create(JobRecord::with_id(id.clone(), "b.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateId(dup) if dup == id));
        assert_eq!(registry.get(&id).await.unwrap().output_filename, "a.mp4");
    }

    #[tokio::test]
    async fn test_update_unknown_is_conflict() {
        let registry = InMemoryJobRegistry::new();
        let err = registry
            .update(&JobId::from("gone"), JobUpdate::percent(10))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_terminal_rules() {
        let registry = InMemoryJobRegistry::new();
        let id = registry.create(JobRecord::new("v.mp4")).await.unwrap();

        let done = registry
            .update(
                &id,
                JobUpdate::Complete {
                    result_path: PathBuf::from("/tmp/v.mp4"),
                },
            )
            .await
            .unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.percent, 100);

        // late progress is ignored
        let after = registry
            .update(&id, JobUpdate::progress(40, "late"))
            .await
            .unwrap();
        assert_eq!(after.percent, 100);
        assert_eq!(after.message, "done");

        let err = registry
            .update(
                &id,
                JobUpdate::Fail {
                    error: "boom".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let registry = InMemoryJobRegistry::new();
        let id = registry.create(JobRecord::new("v.mp4")).await.unwrap();

        assert!(registry.delete(&id).await.is_some());
        assert!(registry.delete(&id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_and_readers() {
        let registry = Arc::new(InMemoryJobRegistry::new());
        let id = registry.create(JobRecord::new("v.mp4")).await.unwrap();

        let mut handles = Vec::new();
        for p in 1..=100u8 {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                registry.update(&id, JobUpdate::percent(p)).await.unwrap();
                registry.get(&id).await.unwrap().percent
            }));
        }

        for handle in handles {
            let seen = handle.await.unwrap();
            assert!((1..=100).contains(&seen));
        }

        // out-of-order writes never lower the stored value
        assert_eq!(registry.get(&id).await.unwrap().percent, 100);
    }
}
