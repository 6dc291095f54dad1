//! Deferred removal of finished jobs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use picvid_jobs::JobRegistry;
use picvid_media::fs_utils::{remove_dir_if_exists, remove_file_if_exists};
use picvid_models::JobId;

use crate::metrics;

/// Reaps a job's registry entry, video and scratch directory once its
/// retention window has passed.
///
/// Every step tolerates things that are already gone, so a job can be
/// reaped any number of times.
#[derive(Clone)]
pub struct CleanupScheduler {
    registry: Arc<dyn JobRegistry>,
    work_dir: PathBuf,
    retention: Duration,
}

impl CleanupScheduler {
    pub fn new(registry: Arc<dyn JobRegistry>, work_dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            registry,
            work_dir: work_dir.into(),
            retention,
        }
    }

    /// Reap `job_id` after the retention window.
    pub fn schedule(&self, job_id: JobId, output: Option<PathBuf>) -> JoinHandle<()> {
        let scheduler = self.clone();
        debug!(
            job_id = %job_id,
            retention_secs = scheduler.retention.as_secs(),
            "Scheduled cleanup"
        );

        tokio::spawn(async move {
            tokio::time::sleep(scheduler.retention).await;
            scheduler.reap_now(&job_id, output.as_deref()).await;
        })
    }

    /// Remove the job right away. Returns `true` if a registry entry existed.
    pub async fn reap_now(&self, job_id: &JobId, output: Option<&Path>) -> bool {
        let existed = self.registry.delete(job_id).await.is_some();

        if let Some(path) = output {
            match remove_file_if_exists(path).await {
                Ok(true) => debug!(job_id = %job_id, "Removed {}", path.display()),
                Ok(false) => {}
                Err(e) => warn!(job_id = %job_id, "Failed to remove {}: {}", path.display(), e),
            }
        }

        let scratch = self.work_dir.join(job_id.as_str());
        if let Err(e) = remove_dir_if_exists(&scratch).await {
            warn!(job_id = %job_id, "Failed to remove {}: {}", scratch.display(), e);
        }

        if existed {
            metrics::record_job_reaped();
            debug!(job_id = %job_id, "Job reaped");
        }
        existed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picvid_jobs::InMemoryJobRegistry;
    use picvid_models::JobRecord;
    use tempfile::TempDir;

    fn setup(retention: Duration) -> (TempDir, Arc<InMemoryJobRegistry>, CleanupScheduler) {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(InMemoryJobRegistry::new());
        let scheduler = CleanupScheduler::new(registry.clone(), dir.path(), retention);
        (dir, registry, scheduler)
    }

    fn write_output(dir: &Path, id: &JobId) -> PathBuf {
        let job_dir = dir.join(id.as_str());
        std::fs::create_dir_all(&job_dir).unwrap();
        let output = job_dir.join(format!("{}.mp4", id));
        std::fs::write(&output, b"video").unwrap();
        output
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_waits_for_retention() {
        let (dir, registry, scheduler) = setup(Duration::from_secs(600));
        let id = registry.create(JobRecord::new("v.mp4")).await.unwrap();
        let output = write_output(dir.path(), &id);

        let handle = scheduler.schedule(id.clone(), Some(output.clone()));

        tokio::time::sleep(Duration::from_secs(599)).await;
        assert!(registry.get(&id).await.is_some());
        assert!(output.exists());

        handle.await.unwrap();
        assert!(registry.get(&id).await.is_none());
        assert!(!output.exists());
        assert!(!dir.path().join(id.as_str()).exists());
    }

    #[tokio::test]
    async fn test_reap_is_idempotent() {
        let (dir, registry, scheduler) = setup(Duration::from_secs(600));
        let id = registry.create(JobRecord::new("v.mp4")).await.unwrap();
        let output = write_output(dir.path(), &id);

        assert!(scheduler.reap_now(&id, Some(&output)).await);
        assert!(!scheduler.reap_now(&id, Some(&output)).await);
        assert!(!scheduler.reap_now(&id, None).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_reap_without_output_file() {
        let (_dir, registry, scheduler) = setup(Duration::ZERO);
        let id = registry.create(JobRecord::new("v.mp4")).await.unwrap();

        // failed jobs never produced a file
        scheduler.schedule(id.clone(), None).await.unwrap();
        assert!(registry.get(&id).await.is_none());
    }
}
