//! Structured job logging.
//!
//! Every line carries `job_id` and `operation` fields so a single job can be
//! followed through the JSON logs.

use std::time::{Duration, Instant};

use tracing::{error, info, warn, Span};

use picvid_models::JobId;

/// Logs the lifecycle of one job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    operation: &'static str,
    started: Instant,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &'static str) -> Self {
        Self {
            job_id: job_id.clone(),
            operation,
            started: Instant::now(),
        }
    }

    /// Log the start of a job.
    pub fn log_start(&self, images: usize, resolution: &str, duration_secs: f64) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            images,
            resolution,
            duration_secs,
            "Job started"
        );
    }

    /// Log entry into a pipeline stage.
    pub fn log_stage(&self, stage: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            stage,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Job stage"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = self.operation,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = self.operation,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Job failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Time since the logger was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Span that scopes everything a job does.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "slideshow");

        assert_eq!(logger.job_id(), &job_id);
        assert_eq!(logger.operation(), "slideshow");
        assert!(logger.elapsed() < Duration::from_secs(5));
    }
}
