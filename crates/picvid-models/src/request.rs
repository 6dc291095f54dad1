//! Slideshow submission requests.

use thiserror::Error;

use crate::resolution::Resolution;
use crate::utils::download_filename;

/// Seconds each image stays on screen when the caller does not say.
pub const DEFAULT_DURATION_SECS: f64 = 2.0;

/// Longest time a single image may stay on screen.
pub const MAX_DURATION_SECS: f64 = 3600.0;

/// Rejections raised synchronously at submission time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("No valid images were uploaded")]
    NoImages,

    #[error("Duration per image must be greater than 0 and at most 3600 seconds, got {0}")]
    InvalidDuration(f64),
}

/// A validated request to render a slideshow.
#[derive(Debug, Clone)]
pub struct SlideshowRequest {
    images: Vec<Vec<u8>>,
    duration_secs: f64,
    resolution: Resolution,
    title: String,
}

impl SlideshowRequest {
    /// Build a request, dropping empty uploads.
    ///
    /// Unknown resolution names fall back to portrait.
    pub fn new(
        images: Vec<Vec<u8>>,
        duration_secs: f64,
        resolution: &str,
        title: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let images: Vec<Vec<u8>> = images.into_iter().filter(|i| !i.is_empty()).collect();
        if images.is_empty() {
            return Err(ValidationError::NoImages);
        }
        if !duration_secs.is_finite() || duration_secs <= 0.0 || duration_secs > MAX_DURATION_SECS {
            return Err(ValidationError::InvalidDuration(duration_secs));
        }

        Ok(Self {
            images,
            duration_secs,
            resolution: Resolution::parse_or_default(resolution),
            title: title.into(),
        })
    }

    pub fn into_images(self) -> Vec<Vec<u8>> {
        self.images
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Sanitized download name (`<title>.mp4`).
    pub fn output_filename(&self) -> String {
        download_filename(&self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Vec<u8> {
        vec![0x89, b'P', b'N', b'G']
    }

    #[test]
    fn test_empty_uploads_are_dropped() {
        let request =
            SlideshowRequest::new(vec![Vec::new(), image(), Vec::new()], 1.5, "square", "t")
                .unwrap();
        assert_eq!(request.image_count(), 1);
        assert_eq!(request.resolution(), Resolution::Square);
        assert_eq!(request.duration_secs(), 1.5);
    }

    #[test]
    fn test_rejects_no_images() {
        assert_eq!(
            SlideshowRequest::new(vec![], 2.0, "portrait", "t").unwrap_err(),
            ValidationError::NoImages
        );
        assert_eq!(
            SlideshowRequest::new(vec![Vec::new()], 2.0, "portrait", "t").unwrap_err(),
            ValidationError::NoImages
        );
    }

    #[test]
    fn test_rejects_bad_duration() {
        for duration in [0.0, -1.0, f64::NAN, f64::INFINITY, 3600.5, 5e15] {
            assert!(matches!(
                SlideshowRequest::new(vec![image()], duration, "portrait", "t"),
                Err(ValidationError::InvalidDuration(_))
            ));
        }
    }

    #[test]
    fn test_accepts_duration_bounds() {
        assert!(SlideshowRequest::new(vec![image()], MAX_DURATION_SECS, "portrait", "t").is_ok());
        assert!(SlideshowRequest::new(vec![image()], 0.0004, "portrait", "t").is_ok());
    }

    #[test]
    fn test_unknown_resolution_defaults_to_portrait() {
        let request = SlideshowRequest::new(vec![image()], 2.0, "imax", "t").unwrap();
        assert_eq!(request.resolution(), Resolution::Portrait);
    }

    #[test]
    fn test_output_filename_is_sanitized() {
        let request = SlideshowRequest::new(vec![image()], 2.0, "square", "My:Video?").unwrap();
        assert_eq!(request.output_filename(), "MyVideo.mp4");
    }
}
