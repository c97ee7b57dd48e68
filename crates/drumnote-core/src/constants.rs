//! Shared constants for media validation and roles

pub const ADMIN_ROLE: &str = "admin";

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

pub const VIDEO_CONTENT_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
    "video/webm",
];

pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac"];

pub const AUDIO_CONTENT_TYPES: &[&str] = &[
    "audio/wav",
    "audio/x-wav",
    "audio/wave",
    "audio/mpeg",
    "audio/flac",
    "audio/x-flac",
];

/// Characters that may not appear in a stored filename.
pub const FORBIDDEN_FILENAME_CHARS: &[char] = &['/', '\\', '<', '>', ':', '"', '|', '?', '*'];

pub const MAX_FILENAME_LENGTH: usize = 255;

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Content type served for a stored media file, chosen by extension.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_lookup_ignores_case() {
        assert_eq!(content_type_for_extension("MP4"), "video/mp4");
        assert_eq!(content_type_for_extension("mkv"), "video/x-matroska");
        assert_eq!(content_type_for_extension("exe"), "application/octet-stream");
    }
}
