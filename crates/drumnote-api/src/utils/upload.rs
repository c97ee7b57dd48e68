//! Common utilities for file upload handlers

use axum::extract::Multipart;
use drumnote_core::constants::{
    AUDIO_CONTENT_TYPES, AUDIO_EXTENSIONS, VIDEO_CONTENT_TYPES, VIDEO_EXTENSIONS,
};
use drumnote_core::models::AudioFileMetadata;
use drumnote_core::validation::{file_extension, normalize_content_type, validate_filename};
use drumnote_core::AppError;
use std::collections::HashMap;

/// The single `file` part of a multipart form plus any text fields sent with it.
#[derive(Debug)]
pub struct UploadedFile {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: String,
    pub fields: HashMap<String, String>,
}

/// Extract file data, filename, and content type from multipart form.
/// Only one field named "file" is accepted; multiple file fields are rejected.
pub async fn extract_multipart_file(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == "file" {
            if file_data.is_some() {
                return Err(AppError::InvalidInput(
                    "Multiple file fields are not allowed; send exactly one field named 'file'"
                        .to_string(),
                ));
            }
            filename = field.file_name().map(|s: &str| s.to_string());
            content_type = field.content_type().map(|s: &str| s.to_string());

            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;

            file_data = Some(data.to_vec());
        } else if !field_name.is_empty() {
            let value = field.text().await.map_err(|e| {
                AppError::InvalidInput(format!("Failed to read field '{}': {}", field_name, e))
            })?;
            fields.insert(field_name, value);
        }
    }

    let data = file_data.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    Ok(UploadedFile {
        data,
        filename: filename.unwrap_or_default(),
        content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        fields,
    })
}

/// Validate file size
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Validated name, extension and normalized content type of an accepted upload.
#[derive(Debug, PartialEq)]
pub struct AcceptedFile {
    pub filename: String,
    pub extension: String,
    pub content_type: String,
}

fn accept_file(
    filename: &str,
    content_type: &str,
    extensions: &[&str],
    content_types: &[&str],
    kind: &str,
) -> Result<AcceptedFile, AppError> {
    let filename = validate_filename(filename)?;
    let normalized = normalize_content_type(content_type);

    let extension = file_extension(&filename)
        .filter(|ext| extensions.contains(&ext.as_str()))
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Invalid file extension. Only {} files ({}) are supported.",
                kind,
                extensions.join(", ")
            ))
        })?;

    if !content_types.contains(&normalized.as_str()) {
        return Err(AppError::InvalidInput(format!(
            "File type {} is not allowed. Only {} files ({}) are supported.",
            normalized,
            kind,
            extensions.join(", ")
        )));
    }

    Ok(AcceptedFile {
        filename,
        extension,
        content_type: normalized,
    })
}

pub fn accept_video(filename: &str, content_type: &str) -> Result<AcceptedFile, AppError> {
    accept_file(
        filename,
        content_type,
        VIDEO_EXTENSIONS,
        VIDEO_CONTENT_TYPES,
        "video",
    )
}

pub fn accept_audio(filename: &str, content_type: &str) -> Result<AcceptedFile, AppError> {
    accept_file(
        filename,
        content_type,
        AUDIO_EXTENSIONS,
        AUDIO_CONTENT_TYPES,
        "audio",
    )
}

fn parse_field<T: std::str::FromStr>(
    fields: &HashMap<String, String>,
    name: &str,
) -> Result<Option<T>, AppError> {
    match fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::InvalidInput(format!("Invalid value for '{}': {}", name, raw))),
        None => Ok(None),
    }
}

/// Read `sample_rate`, `channels` and optional `duration_seconds` from form fields.
pub fn audio_metadata_from_fields(
    fields: &HashMap<String, String>,
) -> Result<AudioFileMetadata, AppError> {
    let sample_rate = parse_field::<i32>(fields, "sample_rate")?
        .ok_or_else(|| AppError::InvalidInput("sample_rate is required".to_string()))?;
    let channels = parse_field::<i32>(fields, "channels")?
        .ok_or_else(|| AppError::InvalidInput("channels is required".to_string()))?;
    let metadata = AudioFileMetadata {
        sample_rate,
        channels,
        duration_seconds: parse_field::<f64>(fields, "duration_seconds")?,
    };
    metadata.validate()?;
    Ok(metadata)
}
