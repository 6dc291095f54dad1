//! Progress events and the breakpoints that split a job into stages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::JobUpdate;

/// A unified progress event emitted by the pipeline stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressUpdate {
    pub fn percent(percent: u8) -> Self {
        Self {
            percent: Some(percent),
            message: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            percent: None,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.percent.is_none() && self.message.is_none()
    }
}

impl From<ProgressUpdate> for JobUpdate {
    fn from(update: ProgressUpdate) -> Self {
        JobUpdate::Progress {
            percent: update.percent,
            message: update.message,
        }
    }
}

/// Percent breakpoints of the two pipeline stages.
///
/// Preprocessing reports `preprocess_floor` up front and then climbs by up to
/// `preprocess_span` as images are normalized; encoding owns the
/// `encode_start..=encode_end` slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressPlan {
    pub preprocess_floor: u8,
    pub preprocess_span: u8,
    pub encode_start: u8,
    pub encode_end: u8,
}

impl Default for ProgressPlan {
    fn default() -> Self {
        Self {
            preprocess_floor: 5,
            preprocess_span: 10,
            encode_start: 20,
            encode_end: 100,
        }
    }
}

impl ProgressPlan {
    /// Percent after `done` of `total` images have been normalized.
    pub fn preprocess_percent(&self, done: usize, total: usize) -> u8 {
        if total == 0 {
            return self.preprocess_floor;
        }
        let done = done.min(total) as u64;
        let step = (self.preprocess_span as u64 * done) / total as u64;
        (self.preprocess_floor as u64 + step).min(self.encode_start as u64) as u8
    }

    /// Check that the breakpoints are ordered and within 0..=100.
    pub fn is_valid(&self) -> bool {
        let preprocess_end = self.preprocess_floor as u16 + self.preprocess_span as u16;
        preprocess_end <= self.encode_start as u16
            && self.encode_start <= self.encode_end
            && self.encode_end <= 100
    }
}
