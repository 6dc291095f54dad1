//! Pipeline metrics.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "picvid_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "picvid_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "picvid_jobs_failed_total";
    pub const JOBS_ACTIVE: &str = "picvid_jobs_active";
    pub const JOB_DURATION_SECONDS: &str = "picvid_job_duration_seconds";
    pub const IMAGES_NORMALIZED_TOTAL: &str = "picvid_images_normalized_total";
    pub const JOBS_REAPED_TOTAL: &str = "picvid_jobs_reaped_total";
}

pub fn record_job_submitted(resolution: &str) {
    let labels = [("resolution", resolution.to_string())];
    counter!(names::JOBS_SUBMITTED_TOTAL, &labels).increment(1);
}

pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "status" => "completed").record(duration_secs);
}

pub fn record_job_failed(duration_secs: f64) {
    counter!(names::JOBS_FAILED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "status" => "failed").record(duration_secs);
}

pub fn record_job_started() {
    gauge!(names::JOBS_ACTIVE).increment(1.0);
}

pub fn record_job_finished() {
    gauge!(names::JOBS_ACTIVE).decrement(1.0);
}

pub fn record_image_normalized() {
    counter!(names::IMAGES_NORMALIZED_TOTAL).increment(1);
}

pub fn record_job_reaped() {
    counter!(names::JOBS_REAPED_TOTAL).increment(1);
}
