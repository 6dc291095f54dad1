//! Slideshow encoding: concatenates one still-image clip per frame.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use picvid_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::progress::{EncoderEvent, EncoderEvents, FfmpegOutput, STAGE_OUTPUT_TIME};

/// One normalized frame and how long it stays on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideshowClip {
    pub frame_path: PathBuf,
    pub duration_secs: f64,
}

impl SlideshowClip {
    pub fn new(frame_path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            frame_path: frame_path.into(),
            duration_secs,
        }
    }
}

/// Total running time of `clips` in milliseconds, saturating at `i64::MAX`.
pub fn total_duration_ms(clips: &[SlideshowClip]) -> i64 {
    clips
        .iter()
        .map(|c| (c.duration_secs * 1000.0).round() as i64)
        .fold(0i64, |total, ms| total.saturating_add(ms))
}

/// Encodes an ordered list of clips into a single video file.
#[async_trait]
pub trait SlideshowEncoder: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Encode `clips` in order into `output`, pushing native progress
    /// events into `events`. Dropped receivers must not fail the encode.
    async fn encode(
        &self,
        clips: &[SlideshowClip],
        output: &Path,
        events: EncoderEvents,
    ) -> MediaResult<()>;
}

/// FFmpeg CLI backed encoder.
#[derive(Debug, Clone, Default)]
pub struct FfmpegSlideshowEncoder {
    config: EncodingConfig,
    runner: FfmpegRunner,
}

impl FfmpegSlideshowEncoder {
    pub fn new(config: EncodingConfig) -> Self {
        Self {
            config,
            runner: FfmpegRunner::new(),
        }
    }

    pub fn config(&self) -> &EncodingConfig {
        &self.config
    }

    /// Build the FFmpeg invocation for `clips`.
    pub fn build_command(&self, clips: &[SlideshowClip], output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(output);
        for clip in clips {
            cmd = cmd.looped_image(&clip.frame_path, clip.duration_secs, self.config.fps);
        }

        cmd.filter_complex(concat_filter(clips.len()))
            .map("[v]")
            .output_args(self.config.to_ffmpeg_args())
    }
}

/// `[0:v][1:v]...concat=n=N:v=1:a=0[v]`
fn concat_filter(count: usize) -> String {
    let mut filter: String = (0..count).map(|i| format!("[{}:v]", i)).collect();
    filter.push_str(&format!("concat=n={}:v=1:a=0[v]", count));
    filter
}

#[async_trait]
impl SlideshowEncoder for FfmpegSlideshowEncoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn encode(
        &self,
        clips: &[SlideshowClip],
        output: &Path,
        events: EncoderEvents,
    ) -> MediaResult<()> {
        if clips.is_empty() {
            return Err(MediaError::EmptySlideshow);
        }
        for clip in clips {
            if !clip.frame_path.exists() {
                return Err(MediaError::FileNotFound(clip.frame_path.clone()));
            }
        }

        let total_ms = total_duration_ms(clips);
        let cmd = self.build_command(clips, output);

        info!(
            clips = clips.len(),
            total_ms,
            fps = self.config.fps,
            preset = %self.config.preset,
            "Encoding slideshow to {}",
            output.display()
        );

        self.runner
            .run_with_progress(&cmd, move |out| {
                let event = match out {
                    FfmpegOutput::Progress(p) => {
                        if p.is_complete {
                            debug!("FFmpeg reported end of progress");
                        } else if let Some(eta) = p.eta_seconds(total_ms) {
                            debug!(speed = p.speed, eta_secs = eta, "Encoding");
                        }
                        EncoderEvent::progress(STAGE_OUTPUT_TIME, p.out_time_ms, total_ms)
                    }
                    FfmpegOutput::Log(line) => EncoderEvent::Log(line),
                };
                // receiver may be gone; encoding continues regardless
                let _ = events.send(event);
            })
            .await?;

        if !output.exists() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg finished without writing output",
                None,
                None,
            ));
        }

        debug!("Slideshow encoded: {}", output.display());
        Ok(())
    }
}
