//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use picvid_models::{EncodingConfig, JobId, ProgressPlan};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrently running pipelines
    pub max_concurrent_jobs: usize,
    /// Root of the per-job scratch directories
    pub work_dir: PathBuf,
    /// How long finished jobs and their videos are kept
    pub retention: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Encoder settings
    pub encoding: EncodingConfig,
    /// Percent breakpoints of the pipeline stages
    pub progress: ProgressPlan,
    /// Probe finished videos and log their duration
    pub verify_output: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            work_dir: std::env::temp_dir().join("picvid"),
            retention: Duration::from_secs(600), // 10 minutes
            shutdown_timeout: Duration::from_secs(30),
            encoding: EncodingConfig::default(),
            progress: ProgressPlan::default(),
            verify_output: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut encoding = EncodingConfig::default();
        if let Some(fps) = std::env::var("WORKER_FPS").ok().and_then(|s| s.parse().ok()) {
            encoding = encoding.with_fps(fps);
        }
        if let Some(threads) = std::env::var("FFMPEG_THREADS").ok().and_then(|s| s.parse().ok()) {
            encoding = encoding.with_threads(threads);
        }
        if let Ok(preset) = std::env::var("FFMPEG_PRESET") {
            encoding = encoding.with_preset(preset);
        }

        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            retention: Duration::from_secs(
                std::env::var("WORKER_RETENTION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            encoding,
            progress: defaults.progress,
            verify_output: std::env::var("WORKER_VERIFY_OUTPUT")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.verify_output),
        }
    }

    /// Scratch directory owned by one job.
    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.work_dir.join(job_id.as_str())
    }

    /// Where the finished video of a job is written.
    pub fn output_path(&self, job_id: &JobId) -> PathBuf {
        self.job_dir(job_id).join(format!("{}.mp4", job_id))
    }
}
