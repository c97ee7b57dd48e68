//! Streaming file downloads from storage.

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
};
use drumnote_core::constants::content_type_for_extension;
use drumnote_core::validation::file_extension;
use drumnote_core::AppError;
use drumnote_storage::{Storage, StorageError};
use futures::StreamExt;

/// Content type for a stored object, chosen by the extension of its key.
pub fn content_type_for_key(storage_key: &str, fallback: &str) -> String {
    file_extension(storage_key)
        .map(|ext| content_type_for_extension(&ext))
        .filter(|ct| *ct != "application/octet-stream")
        .unwrap_or(fallback)
        .to_string()
}

pub fn content_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename)
}

/// Stream `storage_key` back as an attachment named `filename`.
pub async fn attachment_response(
    storage: &dyn Storage,
    storage_key: &str,
    filename: &str,
    content_type: &str,
) -> Result<Response<Body>, AppError> {
    let stream = storage.get_stream(storage_key).await.map_err(|e| match e {
        StorageError::NotFound(_) => AppError::NotFound("Physical file not found".to_string()),
        other => AppError::Storage(format!("Failed to download from storage: {}", other)),
    })?;

    tracing::debug!(storage_key = %storage_key, "Streaming file from storage");

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition(filename))
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}
