//! Filename helpers for downloads.

/// Name used when sanitization leaves nothing behind.
pub const DEFAULT_FILENAME: &str = "video";

/// Characters that are illegal in filenames on common filesystems.
const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Strip characters that are illegal in filenames.
///
/// Returns [`DEFAULT_FILENAME`] when nothing is left.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c))
        .collect();

    if cleaned.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned
    }
}

/// Download name for a slideshow title, e.g. `"My:Video?"` -> `"MyVideo.mp4"`.
pub fn download_filename(title: &str) -> String {
    format!("{}.mp4", sanitize_filename(title))
}
