//! Shared data models for the PicVid slideshow service.
//!
//! This crate provides Serde-serializable types for:
//! - Slideshow jobs and their lifecycle state
//! - Output resolutions
//! - Encoding configuration
//! - Progress breakpoints shared by the pipeline stages
//! - Submission requests and their validation

pub mod encoding;
pub mod job;
pub mod progress;
pub mod request;
pub mod resolution;
pub mod utils;

// Re-export common types
pub use encoding::EncodingConfig;
pub use job::{JobId, JobRecord, JobStatus, JobUpdate, TransitionError};
pub use progress::{ProgressPlan, ProgressUpdate};
pub use request::{SlideshowRequest, ValidationError, DEFAULT_DURATION_SECS, MAX_DURATION_SECS};
pub use resolution::{FrameSize, Resolution, ResolutionParseError};
pub use utils::{download_filename, sanitize_filename, DEFAULT_FILENAME};
