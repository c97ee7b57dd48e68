//! Video upload, listing and lifecycle endpoints.

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::ownership::{owned_video, owned_video_including_deleted};
use crate::state::AppState;
use crate::utils::download::{attachment_response, content_type_for_key};
use crate::utils::upload::{accept_video, extract_multipart_file, validate_file_size};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use drumnote_core::constants::{VIDEO_CONTENT_TYPES, VIDEO_EXTENSIONS};
use drumnote_core::models::{
    MessageResponse, OrphanCleanupResponse, ProcessingStatusResponse, SupportedFormats, Video,
    VideoDeleteQuery, VideoList, VideoListQuery, VideoStats, VideoUpdate, VideoUploadResponse,
};
use drumnote_core::validation::validate_filename;
use drumnote_core::AppError;
use drumnote_db::NewVideo;
use drumnote_storage::keys::{video_key, AUDIO_PREFIX, VIDEO_PREFIX};
use drumnote_storage::Storage;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

fn duplicate_filename(filename: &str) -> AppError {
    AppError::BadRequest(format!("A video with filename '{}' already exists", filename))
}

#[utoipa::path(
    post,
    path = "/api/v1/videos",
    tag = "videos",
    request_body(content = String, description = "Video file (multipart/form-data, field `file`)", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Video uploaded", body = VideoUploadResponse),
        (status = 400, description = "Invalid file, duplicate filename or quota exceeded", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = %auth.id(), operation = "upload_video"))]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let upload = extract_multipart_file(multipart).await?;
    let accepted = accept_video(&upload.filename, &upload.content_type)?;
    validate_file_size(upload.data.len(), state.media.video_max_file_size)?;

    let repo = &state.db.video_repository;
    let user_id = auth.id();

    if repo
        .filename_exists(user_id, &accepted.filename, None)
        .await?
    {
        return Err(duplicate_filename(&accepted.filename).into());
    }

    let file_size = upload.data.len() as i64;
    let used = repo.storage_used_by_user(user_id).await?;
    let quota = state.media.user_storage_quota_bytes;
    if used.saturating_add(file_size) > quota {
        tracing::info!(used, quota, file_size, "Upload rejected by storage quota");
        return Err(AppError::QuotaExceeded { used, quota }.into());
    }

    let video_id = Uuid::new_v4();
    let storage_key = video_key(user_id, video_id, &accepted.extension);
    state
        .media
        .storage
        .put(&storage_key, Bytes::from(upload.data))
        .await?;

    let created = repo
        .create(NewVideo {
            id: video_id,
            user_id,
            filename: &accepted.filename,
            storage_path: &storage_key,
            content_type: &accepted.content_type,
            file_size_bytes: file_size,
        })
        .await;

    let video = match created {
        Ok(video) => video,
        Err(e) => {
            // The row was never written; drop the object too.
            if let Err(cleanup) = state.media.storage.delete(&storage_key).await {
                tracing::warn!(error = %cleanup, storage_key = %storage_key, "Failed to remove file after insert error");
            }
            return Err(e.into());
        }
    };

    tracing::info!(video_id = %video.id, file_size, "Video uploaded");
    Ok((
        StatusCode::CREATED,
        Json(VideoUploadResponse {
            message: "Video uploaded successfully".to_string(),
            video,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/videos",
    tag = "videos",
    params(
        ("page" = Option<i64>, Query, description = "1-based page (default 1)"),
        ("per_page" = Option<i64>, Query, description = "Page size 1-100 (default 20)")
    ),
    responses((status = 200, description = "Caller's videos, newest first", body = VideoList))
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), operation = "list_videos"))]
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<VideoListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (page, per_page) = (query.page(), query.per_page());
    let repo = &state.db.video_repository;

    let videos = repo
        .list_for_user(auth.id(), per_page, query.offset())
        .await?;
    let total = repo.count_for_user(auth.id()).await?;

    Ok(Json(VideoList::new(videos, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video found", body = Video),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %id, operation = "get_video"))]
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = owned_video(&state.db, &auth, id, "access this video").await?;
    Ok(Json(video))
}

#[utoipa::path(
    put,
    path = "/api/v1/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    request_body = VideoUpdate,
    responses(
        (status = 200, description = "Video renamed", body = Video),
        (status = 400, description = "Invalid or duplicate filename", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), video_id = %id, operation = "update_video"))]
pub async fn update_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<VideoUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    payload.validate()?;
    let filename = validate_filename(&payload.filename)?;

    owned_video(&state.db, &auth, id, "update this video").await?;

    let repo = &state.db.video_repository;
    if repo.filename_exists(auth.id(), &filename, Some(id)).await? {
        return Err(duplicate_filename(&filename).into());
    }

    let video = repo
        .update_filename(id, &filename)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;
    Ok(Json(video))
}

/// Remove a video's stored objects, logging failures so the row can still go.
async fn remove_stored_files(storage: &dyn Storage, video: &Video, audio_paths: &[String]) {
    for key in std::iter::once(&video.storage_path).chain(audio_paths) {
        if let Err(e) = storage.delete(key).await {
            tracing::warn!(error = %e, storage_key = %key, video_id = %video.id, "Failed to delete stored file");
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/videos/{id}",
    tag = "videos",
    params(
        ("id" = Uuid, Path, description = "Video ID"),
        ("hard" = Option<bool>, Query, description = "Permanently delete the row and stored files")
    ),
    responses(
        (status = 200, description = "Video deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), video_id = %id, hard = query.hard, operation = "delete_video"))]
pub async fn delete_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<VideoDeleteQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let db = &state.db;

    if !query.hard {
        owned_video(db, &auth, id, "delete this video").await?;
        if !db.video_repository.soft_delete(id).await? {
            return Err(AppError::NotFound("Video not found".to_string()).into());
        }
        tracing::info!(video_id = %id, "Video soft-deleted");
        return Ok(Json(MessageResponse::new("Video deleted successfully")));
    }

    let video = owned_video_including_deleted(db, &auth, id, "delete this video").await?;
    let audio_paths = db.audio_file_repository.storage_paths_for_video(id).await?;
    remove_stored_files(state.media.storage.as_ref(), &video, &audio_paths).await;

    if !db.video_repository.hard_delete(id).await? {
        return Err(AppError::NotFound("Video not found".to_string()).into());
    }

    tracing::info!(video_id = %id, audio_files = audio_paths.len(), "Video permanently deleted");
    Ok(Json(MessageResponse::new(
        "Video permanently deleted successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/videos/{id}/restore",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video restored", body = Video),
        (status = 400, description = "Filename now taken by another video", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found or not deleted", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %id, operation = "restore_video"))]
pub async fn restore_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let not_restorable = || AppError::NotFound("Video not found or not deleted".to_string());
    let repo = &state.db.video_repository;

    let video = repo
        .get_by_id(id, true)
        .await?
        .filter(|v| v.deleted_at.is_some())
        .ok_or_else(not_restorable)?;
    if !video.is_owned_by(auth.id()) {
        return Err(AppError::Forbidden("Not authorized to restore this video".to_string()).into());
    }
    if repo
        .filename_exists(auth.id(), &video.filename, Some(id))
        .await?
    {
        return Err(duplicate_filename(&video.filename).into());
    }

    let restored = repo
        .restore(id, auth.id())
        .await?
        .ok_or_else(not_restorable)?;
    Ok(Json(restored))
}

#[utoipa::path(
    get,
    path = "/api/v1/videos/{id}/download",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video file", content_type = "video/*"),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video or physical file not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %id, operation = "download_video"))]
pub async fn download_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = owned_video(&state.db, &auth, id, "download this video").await?;
    let content_type = content_type_for_key(&video.storage_path, &video.content_type);

    let response = attachment_response(
        state.media.storage.as_ref(),
        &video.storage_path,
        &video.filename,
        &content_type,
    )
    .await?;
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/v1/videos/stats",
    tag = "videos",
    responses((status = 200, description = "Storage and processing totals for the caller", body = VideoStats))
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "video_stats"))]
pub async fn video_stats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let aggregates = state
        .db
        .video_repository
        .aggregates_for_user(auth.id())
        .await?;
    Ok(Json(VideoStats::from_aggregates(
        aggregates,
        state.media.user_storage_quota_bytes,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/videos/formats",
    tag = "videos",
    responses((status = 200, description = "Accepted upload formats and limits", body = SupportedFormats))
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "video_formats"))]
pub async fn supported_formats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let max_bytes = state.media.video_max_file_size;
    Ok(Json(SupportedFormats {
        extensions: VIDEO_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        content_types: VIDEO_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
        max_file_size_bytes: max_bytes,
        max_file_size_mb: max_bytes / 1024 / 1024,
        storage_quota_bytes: state.media.user_storage_quota_bytes,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/videos/{id}/processing-status",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Audio extraction state", body = ProcessingStatusResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %id, operation = "processing_status"))]
pub async fn processing_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = owned_video(&state.db, &auth, id, "access this video").await?;
    let audio_files_count = state.db.audio_file_repository.count_for_video(id).await?;
    let has_audio_extracted = audio_files_count > 0;

    Ok(Json(ProcessingStatusResponse {
        video_id: video.id,
        filename: video.filename,
        has_audio_extracted,
        audio_files_count,
        processing_status: if has_audio_extracted {
            "completed"
        } else {
            "pending"
        }
        .to_string(),
    }))
}

/// Delete every key under `prefix` that no row references.
async fn remove_orphans(
    storage: &dyn Storage,
    prefix: &str,
    known: &HashSet<String>,
) -> Result<usize, HttpAppError> {
    let mut removed = 0;
    for key in storage.list_keys(prefix).await? {
        if known.contains(&key) {
            continue;
        }
        match storage.delete(&key).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(error = %e, storage_key = %key, "Failed to delete orphaned file"),
        }
    }
    Ok(removed)
}

#[utoipa::path(
    post,
    path = "/api/v1/videos/admin/cleanup-orphans",
    tag = "videos",
    responses(
        (status = 200, description = "Orphaned files removed", body = OrphanCleanupResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "cleanup_orphans"))]
pub async fn cleanup_orphans(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;

    let db = &state.db;
    let storage = state.media.storage.as_ref();

    // Soft-deleted rows still own their files; only unreferenced keys go.
    let video_paths: HashSet<String> = db.video_repository.all_storage_paths().await?.into_iter().collect();
    let audio_paths: HashSet<String> = db
        .audio_file_repository
        .all_storage_paths()
        .await?
        .into_iter()
        .collect();

    let videos_removed = remove_orphans(storage, VIDEO_PREFIX, &video_paths).await?;
    let audio_removed = remove_orphans(storage, AUDIO_PREFIX, &audio_paths).await?;
    let total = videos_removed + audio_removed;

    tracing::info!(videos_removed, audio_removed, "Orphaned file cleanup finished");
    Ok(Json(OrphanCleanupResponse {
        message: format!("Cleanup completed. Removed {} orphaned files.", total),
        orphaned_video_files_removed: videos_removed,
        orphaned_audio_files_removed: audio_removed,
        total_orphaned_files_removed: total,
    }))
}
