//! Slideshow job records and their lifecycle.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job processing status.
///
/// Transitions are one-way: `Processing` moves to exactly one of the
/// terminal states and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is queued or running
    #[default]
    Processing,
    /// Job completed successfully
    Completed,
    /// Job failed with an error
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Attempted to move a job out of a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid job transition from {from} to {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// A partial update applied atomically to a [`JobRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobUpdate {
    /// Progress and/or status text while the job is running.
    Progress {
        percent: Option<u8>,
        message: Option<String>,
    },
    /// Pipeline finished and the artifact is ready.
    Complete { result_path: PathBuf },
    /// Pipeline aborted.
    Fail { error: String },
}

impl JobUpdate {
    pub fn percent(percent: u8) -> Self {
        Self::Progress {
            percent: Some(percent),
            message: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::Progress {
            percent: None,
            message: Some(message.into()),
        }
    }

    pub fn progress(percent: u8, message: impl Into<String>) -> Self {
        Self::Progress {
            percent: Some(percent),
            message: Some(message.into()),
        }
    }
}

/// In-memory state of one slideshow job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    /// Unique job ID
    pub id: JobId,

    /// Current status
    pub status: JobStatus,

    /// Progress (0-100), never decreases
    pub percent: u8,

    /// Latest human-readable status text
    pub message: String,

    /// Output artifact (only once completed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<PathBuf>,

    /// Download filename, sanitized at submission
    pub output_filename: String,

    /// Failure description (only once failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Terminal transition timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Create a fresh record in the `Processing` state.
    pub fn new(output_filename: impl Into<String>) -> Self {
        Self::with_id(JobId::new(), output_filename)
    }

    /// Create a fresh record with a caller-chosen ID.
    pub fn with_id(id: JobId, output_filename: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Processing,
            percent: 0,
            message: "queued".to_string(),
            result_path: None,
            output_filename: output_filename.into(),
            error_detail: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply an update, enforcing the lifecycle rules.
    ///
    /// Returns `Ok(true)` if any field changed. Progress updates on a
    /// terminal record and lower-or-equal percent values are dropped
    /// silently; a second terminal transition is an error.
    pub fn apply(&mut self, update: JobUpdate) -> Result<bool, TransitionError> {
        match update {
            JobUpdate::Progress { percent, message } => {
                if self.is_terminal() {
                    return Ok(false);
                }

                let mut changed = false;
                if let Some(p) = percent {
                    let p = p.min(100);
                    if p > self.percent {
                        self.percent = p;
                        changed = true;
                    }
                }
                if let Some(m) = message {
                    self.message = m;
                    changed = true;
                }
                if changed {
                    self.updated_at = Utc::now();
                }
                Ok(changed)
            }
            JobUpdate::Complete { result_path } => {
                self.ensure_processing(JobStatus::Completed)?;
                let now = Utc::now();
                self.status = JobStatus::Completed;
                self.percent = 100;
                self.message = "done".to_string();
                self.result_path = Some(result_path);
                self.updated_at = now;
                self.finished_at = Some(now);
                Ok(true)
            }
            JobUpdate::Fail { error } => {
                self.ensure_processing(JobStatus::Failed)?;
                let now = Utc::now();
                self.status = JobStatus::Failed;
                self.message = error.clone();
                self.error_detail = Some(error);
                self.updated_at = now;
                self.finished_at = Some(now);
                Ok(true)
            }
        }
    }

    fn ensure_processing(&self, to: JobStatus) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        Ok(())
    }
}
