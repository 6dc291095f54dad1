//! Typed progress channel between a running pipeline and the registry.
//!
//! The pipeline holds a [`ProgressSender`]; a consumer task owns the
//! receiving half and applies every update to the job's record in order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use picvid_models::{JobId, ProgressUpdate};

use crate::registry::JobRegistry;

/// Producer side of a job's progress stream.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    job_id: JobId,
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ProgressSender {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Queue an update. Returns `false` if the consumer is gone.
    pub fn send(&self, update: ProgressUpdate) -> bool {
        if update.is_empty() {
            return true;
        }
        self.tx.send(update).is_ok()
    }

    pub fn percent(&self, percent: u8) -> bool {
        self.send(ProgressUpdate::percent(percent))
    }

    pub fn message(&self, message: impl Into<String>) -> bool {
        self.send(ProgressUpdate::message(message))
    }

    pub fn progress(&self, percent: u8, message: impl Into<String>) -> bool {
        self.send(ProgressUpdate::percent(percent).with_message(message))
    }
}

/// Consumer task applying a job's progress updates to the registry.
pub struct ProgressChannel {
    job_id: JobId,
    handle: JoinHandle<usize>,
}

impl ProgressChannel {
    /// Start the consumer for `job_id`.
    pub fn spawn(registry: Arc<dyn JobRegistry>, job_id: JobId) -> (ProgressSender, Self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressUpdate>();
        let id = job_id.clone();

        let handle = tokio::spawn(async move {
            let mut applied = 0;
            while let Some(update) = rx.recv().await {
                match registry.update(&id, update.into()).await {
                    Ok(_) => applied += 1,
                    Err(e) if e.is_conflict() => {
                        warn!(job_id = %id, "Dropping progress for unknown job");
                    }
                    Err(e) => {
                        error!(job_id = %id, error = %e, "Failed to apply progress");
                    }
                }
            }
            applied
        });

        (ProgressSender { job_id: job_id.clone(), tx }, Self { job_id, handle })
    }

    /// Wait until every sender is dropped and all queued updates are applied.
    ///
    /// Returns the number of updates that reached the record.
    pub async fn finish(self) -> usize {
        match self.handle.await {
            Ok(applied) => {
                debug!(job_id = %self.job_id, applied, "Progress stream drained");
                applied
            }
            Err(e) => {
                error!(job_id = %self.job_id, error = %e, "Progress consumer aborted");
                0
            }
        }
    }
}
