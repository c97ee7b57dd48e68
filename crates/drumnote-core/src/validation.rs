//! Input validation shared by the HTTP layer and services

use regex::Regex;

use crate::constants::{
    FORBIDDEN_FILENAME_CHARS, MAX_FILENAME_LENGTH, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
};
use crate::error::AppError;

/// Validate a client-supplied filename and return it trimmed.
pub fn validate_filename(filename: &str) -> Result<String, AppError> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("No filename provided".to_string()));
    }
    if trimmed.len() > MAX_FILENAME_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Filename exceeds maximum length of {} characters",
            MAX_FILENAME_LENGTH
        )));
    }
    if trimmed.contains("..") {
        return Err(AppError::InvalidInput(
            "Filename contains invalid path sequence".to_string(),
        ));
    }
    if let Some(c) = trimmed.chars().find(|c| FORBIDDEN_FILENAME_CHARS.contains(c)) {
        return Err(AppError::InvalidInput(format!(
            "Filename contains invalid character '{}'",
            c
        )));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(AppError::InvalidInput(
            "Filename contains control characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Lowercased extension of `filename`, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Parse a time signature such as `4/4` into (beats per measure, beat unit).
pub fn parse_time_signature(value: &str) -> Result<(u32, u32), AppError> {
    let invalid = || {
        AppError::InvalidInput(format!(
            "Invalid time signature '{}'. Expected format like '4/4'",
            value
        ))
    };
    let pattern = Regex::new(r"^\s*(\d{1,2})\s*/\s*(\d{1,2})\s*$").map_err(|e| {
        AppError::Internal(format!("Failed to compile time signature regex: {}", e))
    })?;
    let caps = pattern.captures(value).ok_or_else(invalid)?;
    let beats: u32 = caps[1].parse().map_err(|_| invalid())?;
    let unit: u32 = caps[2].parse().map_err(|_| invalid())?;
    if beats == 0 || unit == 0 {
        return Err(invalid());
    }
    Ok((beats, unit))
}

pub fn validate_tempo(tempo: i32) -> Result<(), AppError> {
    if tempo <= 0 || tempo > 300 {
        return Err(AppError::InvalidInput(
            "Tempo must be between 1 and 300 BPM".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_unit_interval(field: &str, value: f64) -> Result<(), AppError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(AppError::InvalidInput(format!(
            "{} must be between 0.0 and 1.0",
            field
        )));
    }
    Ok(())
}

/// Strip MIME parameters and normalize case (`Video/MP4; codecs=avc1` -> `video/mp4`).
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_rejects_traversal_and_reserved_chars() {
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("clip|1.mp4").is_err());
        assert!(validate_filename("a\\b.mp4").is_err());
        assert!(validate_filename("   ").is_err());
        assert_eq!(validate_filename(" groove.mp4 ").unwrap(), "groove.mp4");
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(file_extension("Groove.MP4").as_deref(), Some("mp4"));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension(".hidden"), None);
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn time_signature_parsing() {
        assert_eq!(parse_time_signature("4/4").unwrap(), (4, 4));
        assert_eq!(parse_time_signature(" 7 / 8 ").unwrap(), (7, 8));
        assert!(parse_time_signature("44").is_err());
        assert!(parse_time_signature("0/4").is_err());
        assert!(parse_time_signature("a/b").is_err());
    }

    #[test]
    fn content_type_normalization() {
        assert_eq!(normalize_content_type("Video/MP4; codecs=avc1"), "video/mp4");
        assert_eq!(normalize_content_type("video/webm"), "video/webm");
    }

    #[test]
    fn tempo_bounds() {
        assert!(validate_tempo(0).is_err());
        assert!(validate_tempo(300).is_ok());
        assert!(validate_tempo(301).is_err());
    }
}
