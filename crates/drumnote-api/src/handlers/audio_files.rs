use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::ownership::{owned_audio_file, owned_video};
use crate::state::AppState;
use crate::utils::download::{attachment_response, content_type_for_key};
use crate::utils::upload::{
    accept_audio, audio_metadata_from_fields, extract_multipart_file, validate_file_size,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use drumnote_core::models::{AudioFile, MessageResponse};
use drumnote_core::AppError;
use drumnote_storage::keys::audio_key;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/videos/{id}/audio-files",
    tag = "audio-files",
    params(("id" = Uuid, Path, description = "Video ID")),
    request_body(content = String, description = "Multipart form: `file`, `sample_rate`, `channels`, optional `duration_seconds`", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Audio file registered", body = AudioFile),
        (status = 400, description = "Invalid file or metadata", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = %auth.id(), video_id = %id, operation = "register_audio_file"))]
pub async fn register_audio_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = owned_video(&state.db, &auth, id, "add audio to this video").await?;

    let upload = extract_multipart_file(multipart).await?;
    let accepted = accept_audio(&upload.filename, &upload.content_type)?;
    validate_file_size(upload.data.len(), state.media.audio_max_file_size)?;
    let metadata = audio_metadata_from_fields(&upload.fields)?;

    let file_size = upload.data.len() as i64;
    let used = state
        .db
        .video_repository
        .storage_used_by_user(auth.id())
        .await?;
    let quota = state.media.user_storage_quota_bytes;
    if used.saturating_add(file_size) > quota {
        return Err(AppError::QuotaExceeded { used, quota }.into());
    }

    let audio_id = Uuid::new_v4();
    let storage_key = audio_key(video.id, audio_id, &accepted.extension);
    state
        .media
        .storage
        .put(&storage_key, Bytes::from(upload.data))
        .await?;

    let created = state
        .db
        .audio_file_repository
        .create(audio_id, video.id, &metadata, &storage_key, file_size)
        .await;

    let audio_file = match created {
        Ok(audio_file) => audio_file,
        Err(e) => {
            if let Err(cleanup) = state.media.storage.delete(&storage_key).await {
                tracing::warn!(error = %cleanup, storage_key = %storage_key, "Failed to remove file after insert error");
            }
            return Err(e.into());
        }
    };

    tracing::info!(audio_file_id = %audio_file.id, file_size, "Audio file registered");
    Ok((StatusCode::CREATED, Json(audio_file)))
}

#[utoipa::path(
    get,
    path = "/api/v1/videos/{id}/audio-files",
    tag = "audio-files",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Audio files of the video, oldest first", body = Vec<AudioFile>),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %id, operation = "list_audio_files"))]
pub async fn list_audio_files(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    owned_video(&state.db, &auth, id, "access this video").await?;
    let files = state.db.audio_file_repository.list_for_video(id).await?;
    Ok(Json(files))
}

#[utoipa::path(
    get,
    path = "/api/v1/audio-files/{id}",
    tag = "audio-files",
    params(("id" = Uuid, Path, description = "Audio file ID")),
    responses(
        (status = 200, description = "Audio file found", body = AudioFile),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Audio file not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), audio_file_id = %id, operation = "get_audio_file"))]
pub async fn get_audio_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(owned_audio_file(&state.db, &auth, id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/audio-files/{id}",
    tag = "audio-files",
    params(("id" = Uuid, Path, description = "Audio file ID")),
    responses(
        (status = 200, description = "Audio file soft-deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Audio file not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), audio_file_id = %id, operation = "delete_audio_file"))]
pub async fn delete_audio_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    owned_audio_file(&state.db, &auth, id).await?;
    if !state.db.audio_file_repository.soft_delete(id).await? {
        return Err(AppError::NotFound("Audio file not found".to_string()).into());
    }
    Ok(Json(MessageResponse::new("Audio file deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/v1/audio-files/{id}/download",
    tag = "audio-files",
    params(("id" = Uuid, Path, description = "Audio file ID")),
    responses(
        (status = 200, description = "Audio file", content_type = "audio/*"),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Audio file or physical file not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), audio_file_id = %id, operation = "download_audio_file"))]
pub async fn download_audio_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let audio_file = owned_audio_file(&state.db, &auth, id).await?;
    let content_type = content_type_for_key(&audio_file.storage_path, "application/octet-stream");
    let extension = drumnote_core::validation::file_extension(&audio_file.storage_path)
        .unwrap_or_else(|| "wav".to_string());
    let filename = format!("audio_{}.{}", audio_file.id, extension);

    let response = attachment_response(
        state.media.storage.as_ref(),
        &audio_file.storage_path,
        &filename,
        &content_type,
    )
    .await?;
    Ok(response)
}
