//! Frame normalization and FFmpeg CLI encoding for slideshows.
//!
//! This crate provides:
//! - Letterboxing of arbitrary still images onto fixed-size canvases
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - A progress bridge that maps encoder progress onto a job's percent scale
//! - The slideshow encoder behind an async trait

pub mod command;
pub mod encoder;
pub mod error;
pub mod fs_utils;
pub mod normalize;
pub mod probe;
pub mod progress;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use encoder::{total_duration_ms, FfmpegSlideshowEncoder, SlideshowClip, SlideshowEncoder};
pub use error::{MediaError, MediaResult};
pub use normalize::{
    centered_offset, decode_oriented, fit_within, write_frame, FrameProducer, LetterboxNormalizer,
};
pub use probe::{probe_video, VideoInfo};
pub use progress::{
    EncoderEvent, EncoderEvents, FfmpegOutput, FfmpegProgress, ProgressBridge, STAGE_OUTPUT_TIME,
};
