//! Slideshow worker.
//!
//! This crate provides:
//! - The orchestrator that runs normalize and encode pipelines on a bounded pool
//! - Deferred cleanup of finished jobs
//! - Structured job logging and pipeline metrics
//! - Graceful shutdown

pub mod cleanup;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;

pub use cleanup::CleanupScheduler;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use orchestrator::SlideshowOrchestrator;
