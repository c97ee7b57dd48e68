//! Resource lookups that enforce the video-owner rule.
//!
//! A missing resource is 404; one that exists but belongs to another user is 403.

use drumnote_core::models::{AudioFile, Notation, ProcessingJob, Video};
use drumnote_core::AppError;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::state::DbState;

pub async fn owned_video(
    db: &DbState,
    auth: &AuthUser,
    video_id: Uuid,
    action: &str,
) -> Result<Video, AppError> {
    let video = db
        .video_repository
        .get_by_id(video_id, false)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    check_owner(&video, auth, action)?;
    Ok(video)
}

/// Like [`owned_video`] but also matches soft-deleted rows.
pub async fn owned_video_including_deleted(
    db: &DbState,
    auth: &AuthUser,
    video_id: Uuid,
    action: &str,
) -> Result<Video, AppError> {
    let video = db
        .video_repository
        .get_by_id(video_id, true)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    check_owner(&video, auth, action)?;
    Ok(video)
}

fn check_owner(video: &Video, auth: &AuthUser, action: &str) -> Result<(), AppError> {
    if video.is_owned_by(auth.id()) {
        Ok(())
    } else {
        tracing::debug!(video_id = %video.id, user_id = %auth.id(), action, "Ownership check failed");
        Err(AppError::Forbidden(format!("Not authorized to {}", action)))
    }
}

pub async fn owned_job(
    db: &DbState,
    auth: &AuthUser,
    job_id: Uuid,
) -> Result<(ProcessingJob, Video), AppError> {
    let job = db
        .job_repository
        .get_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let video = owned_video(db, auth, job.video_id, "view this job").await?;
    Ok((job, video))
}

pub async fn owned_audio_file(
    db: &DbState,
    auth: &AuthUser,
    audio_file_id: Uuid,
) -> Result<AudioFile, AppError> {
    let audio_file = db
        .audio_file_repository
        .get_by_id(audio_file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Audio file not found".to_string()))?;

    owned_video(db, auth, audio_file.video_id, "access this audio file").await?;
    Ok(audio_file)
}

pub async fn owned_notation(
    db: &DbState,
    auth: &AuthUser,
    notation_id: Uuid,
    include_deleted: bool,
) -> Result<Notation, AppError> {
    let notation = db
        .notation_repository
        .get_by_id(notation_id, include_deleted)
        .await?
        .ok_or_else(|| AppError::NotFound("Notation not found".to_string()))?;

    owned_video_including_deleted(db, auth, notation.video_id, "access this notation").await?;
    Ok(notation)
}
