//! Registry error types.

use thiserror::Error;

use picvid_models::{JobId, TransitionError};

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The record is gone, usually because it was already reaped.
    #[error("Job not found: {0}")]
    Conflict(JobId),

    #[error("Job already exists: {0}")]
    DuplicateId(JobId),

    #[error("Job {id}: {source}")]
    InvalidTransition {
        id: JobId,
        #[source]
        source: TransitionError,
    },
}

impl RegistryError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RegistryError::Conflict(_))
    }
}
