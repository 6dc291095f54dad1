//! Frame normalization: any still image into a fixed-size letterboxed canvas.

use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Rgb, RgbImage};

use picvid_models::FrameSize;

use crate::error::{MediaError, MediaResult};

/// Produces fixed-size RGB frames from raw encoded images.
pub trait FrameProducer: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Decode `raw` and render it onto a `target`-sized canvas.
    fn produce(&self, raw: &[u8], target: FrameSize) -> MediaResult<RgbImage>;
}

/// Aspect-preserving fit onto a black canvas.
#[derive(Debug, Clone)]
pub struct LetterboxNormalizer {
    filter: FilterType,
    background: Rgb<u8>,
}

impl Default for LetterboxNormalizer {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
            background: Rgb([0, 0, 0]),
        }
    }
}

impl LetterboxNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the resampling filter.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

impl FrameProducer for LetterboxNormalizer {
    fn name(&self) -> &'static str {
        "letterbox"
    }

    fn produce(&self, raw: &[u8], target: FrameSize) -> MediaResult<RgbImage> {
        if target.width == 0 || target.height == 0 {
            return Err(MediaError::Dimension {
                width: target.width,
                height: target.height,
            });
        }

        let rgb = decode_oriented(raw)?.to_rgb8();
        let source = FrameSize::new(rgb.width(), rgb.height());
        if source.width == 0 || source.height == 0 {
            return Err(MediaError::decode("image has no pixels"));
        }

        let fitted = fit_within(source, target);
        let resized = if fitted == source {
            rgb
        } else {
            imageops::resize(&rgb, fitted.width, fitted.height, self.filter)
        };

        let (x, y) = centered_offset(fitted, target);
        let mut canvas = RgbImage::from_pixel(target.width, target.height, self.background);
        imageops::overlay(&mut canvas, &resized, x as i64, y as i64);

        Ok(canvas)
    }
}

/// Decode an image and apply its EXIF orientation.
pub fn decode_oriented(raw: &[u8]) -> MediaResult<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| MediaError::decode(e.to_string()))?;

    if reader.format().is_none() {
        return Err(MediaError::decode("unrecognized image format"));
    }

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| MediaError::decode(e.to_string()))?;
    let orientation = decoder
        .orientation()
        .map_err(|e| MediaError::decode(e.to_string()))?;
    let mut img =
        DynamicImage::from_decoder(decoder).map_err(|e| MediaError::decode(e.to_string()))?;
    img.apply_orientation(orientation);

    Ok(img)
}

/// Largest size with the source aspect ratio that fits inside `target`.
///
/// Uses exact integer arithmetic (floor); each side is at least one pixel.
pub fn fit_within(source: FrameSize, target: FrameSize) -> FrameSize {
    let (sw, sh) = (source.width.max(1) as u64, source.height.max(1) as u64);
    let (tw, th) = (target.width as u64, target.height as u64);

    // tw / sw <= th / sh  <=>  width is the limiting side
    if tw * sh <= th * sw {
        FrameSize::new(tw as u32, ((sh * tw) / sw).clamp(1, th) as u32)
    } else {
        FrameSize::new(((sw * th) / sh).clamp(1, tw) as u32, th as u32)
    }
}

/// Top-left corner that centers `inner` in `outer` (left/top-biased).
pub fn centered_offset(inner: FrameSize, outer: FrameSize) -> (u32, u32) {
    (
        outer.width.saturating_sub(inner.width) / 2,
        outer.height.saturating_sub(inner.height) / 2,
    )
}

/// Persist a normalized frame as PNG for the encoder.
pub fn write_frame(frame: &RgbImage, path: &Path) -> MediaResult<()> {
    frame
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| match e {
            image::ImageError::IoError(io) => MediaError::Io(io),
            other => MediaError::internal(format!("failed to write frame: {}", other)),
        })
}
