//! Worker error types.

use thiserror::Error;

use picvid_jobs::RegistryError;
use picvid_media::MediaError;
use picvid_models::ValidationError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Worker is shutting down")]
    ShuttingDown,

    /// One input image could not be normalized (1-based index).
    #[error("Image {index} could not be processed: {source}")]
    Image {
        index: usize,
        #[source]
        source: MediaError,
    },

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    /// Whether the caller sent something unusable.
    pub fn is_validation(&self) -> bool {
        matches!(self, WorkerError::Validation(_))
    }

    /// Failure text recorded on the job, free of scratch paths and OS detail.
    pub fn user_message(&self) -> String {
        match self {
            WorkerError::Image { index, source } if !source.is_decode() => {
                format!("Image {} could not be processed", index)
            }
            WorkerError::Media(MediaError::FileNotFound(_)) => {
                "A rendered frame went missing before encoding".to_string()
            }
            WorkerError::Media(MediaError::Io(_)) | WorkerError::Io(_) => {
                "Internal storage error".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Whether the failure came from undecodable input images.
    pub fn is_decode(&self) -> bool {
        match self {
            WorkerError::Image { source, .. } => source.is_decode(),
            WorkerError::Media(e) => e.is_decode(),
            _ => false,
        }
    }
}
