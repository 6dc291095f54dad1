//! Encoder progress: FFmpeg `-progress` snapshots and the bridge that maps
//! stage-local progress onto a slice of the overall job.

use serde::{Deserialize, Serialize};

use picvid_models::ProgressUpdate;

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Estimate time remaining in seconds.
    pub fn eta_seconds(&self, total_duration_ms: i64) -> Option<f64> {
        if self.speed <= 0.0 || self.out_time_ms <= 0 {
            return None;
        }

        let remaining_ms = total_duration_ms - self.out_time_ms;
        if remaining_ms <= 0 {
            return Some(0.0);
        }

        Some((remaining_ms as f64 / 1000.0) / self.speed)
    }
}

/// One item read from FFmpeg's stderr.
#[derive(Debug, Clone)]
pub enum FfmpegOutput {
    /// A complete `-progress` block
    Progress(FfmpegProgress),
    /// Any other diagnostic line
    Log(String),
}

/// Stage name the FFmpeg encoder reports its output-time progress under.
pub const STAGE_OUTPUT_TIME: &str = "t";

/// Native progress event of an encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderEvent {
    /// `current` of `total` units done in the named stage.
    Progress {
        stage: String,
        current: i64,
        total: i64,
    },
    /// Free-form log text.
    Log(String),
}

impl EncoderEvent {
    pub fn progress(stage: impl Into<String>, current: i64, total: i64) -> Self {
        Self::Progress {
            stage: stage.into(),
            current,
            total,
        }
    }

    pub fn log(line: impl Into<String>) -> Self {
        Self::Log(line.into())
    }
}

/// Sender half encoders push their native events into.
pub type EncoderEvents = tokio::sync::mpsc::UnboundedSender<EncoderEvent>;

/// Maps an encoder's stage-local progress onto `lower..=upper` of a job.
///
/// Only strictly increasing percentages are forwarded. Log lines pass
/// through verbatim as message-only updates.
#[derive(Debug, Clone)]
pub struct ProgressBridge {
    lower: u8,
    upper: u8,
    stage: Option<String>,
    progress_message: Option<String>,
    last_percent: Option<u8>,
}

impl ProgressBridge {
    /// Create a bridge for the `lower..=upper` slice (clamped to 0..=100).
    pub fn new(lower: u8, upper: u8) -> Self {
        let upper = upper.min(100);
        let lower = lower.min(upper);
        Self {
            lower,
            upper,
            stage: None,
            progress_message: None,
            last_percent: None,
        }
    }

    /// Only map progress events of this stage; others are dropped.
    pub fn only_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Attach this message to every forwarded percent.
    pub fn with_progress_message(mut self, message: impl Into<String>) -> Self {
        self.progress_message = Some(message.into());
        self
    }

    /// Last percent forwarded, if any.
    pub fn last_percent(&self) -> Option<u8> {
        self.last_percent
    }

    /// Stage-local `current / total` mapped onto the bridge slice.
    ///
    /// `None` when `total <= 0`.
    pub fn map(&self, current: i64, total: i64) -> Option<u8> {
        if total <= 0 {
            return None;
        }
        let current = current.clamp(0, total) as i128;
        let local = (100 * current) / total as i128;
        let span = (self.upper - self.lower) as i128;
        Some(self.lower + ((local * span) / 100) as u8)
    }

    /// Translate one native event into a unified update.
    pub fn bridge(&mut self, event: EncoderEvent) -> Option<ProgressUpdate> {
        match event {
            EncoderEvent::Progress {
                stage,
                current,
                total,
            } => {
                if stage.is_empty() {
                    return None;
                }
                if let Some(expected) = &self.stage {
                    if *expected != stage {
                        return None;
                    }
                }

                let percent = self.map(current, total)?;
                if self.last_percent.is_some_and(|last| percent <= last) {
                    return None;
                }
                self.last_percent = Some(percent);

                Some(ProgressUpdate {
                    percent: Some(percent),
                    message: self.progress_message.clone(),
                })
            }
            EncoderEvent::Log(line) => {
                let line = line.trim();
                if line.is_empty() {
                    return None;
                }
                Some(ProgressUpdate::message(line))
            }
        }
    }
}
