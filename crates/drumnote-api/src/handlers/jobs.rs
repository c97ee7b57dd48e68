//! Processing job endpoints.
//!
//! Jobs are rows whose status is written by clients through `PATCH /jobs/{id}`;
//! nothing runs in the background.

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::jobs::{create_job, list_limit, parse_job_type, pipeline_for};
use crate::services::ownership::{owned_job, owned_video};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use drumnote_core::models::{
    JobCreate, JobDetail, JobListQuery, JobStatistics, JobType, JobUpdate, MessageResponse,
    PipelineStatus, ProcessingJob, QueueStatus,
};
use drumnote_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 100;
const DEFAULT_CLEANUP_DAYS: i32 = 30;

#[derive(Debug, Serialize, ToSchema)]
pub struct JobsHealth {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    pub days_old: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobCleanupResponse {
    pub message: String,
    pub deleted: u64,
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "jobs",
    request_body = JobCreate,
    responses(
        (status = 201, description = "Job created", body = ProcessingJob),
        (status = 400, description = "Invalid job type or prerequisites not met", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), video_id = %payload.video_id, operation = "create_job"))]
pub async fn create_processing_job(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<JobCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let job_type = parse_job_type(&payload.job_type)?;
    let job = create_job(&state.db, &auth, payload.video_id, job_type).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn create_typed(
    state: &AppState,
    auth: &AuthUser,
    video_id: Uuid,
    job_type: JobType,
) -> Result<(StatusCode, Json<ProcessingJob>), HttpAppError> {
    let job = create_job(&state.db, auth, video_id, job_type).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs/audio-extraction/{video_id}",
    tag = "jobs",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 201, description = "Extraction job created", body = ProcessingJob),
        (status = 400, description = "Extraction already in progress", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "create_audio_extraction_job"))]
pub async fn create_audio_extraction_job(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    create_typed(&state, &auth, video_id, JobType::AudioExtraction).await
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs/audio-analysis/{video_id}",
    tag = "jobs",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 201, description = "Analysis job created", body = ProcessingJob),
        (status = 400, description = "Audio not extracted yet", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "create_audio_analysis_job"))]
pub async fn create_audio_analysis_job(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    create_typed(&state, &auth, video_id, JobType::AudioAnalysis).await
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs/drum-detection/{video_id}",
    tag = "jobs",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 201, description = "Drum detection job created", body = ProcessingJob),
        (status = 400, description = "Audio not extracted yet", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "create_drum_detection_job"))]
pub async fn create_drum_detection_job(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    create_typed(&state, &auth, video_id, JobType::DrumDetection).await
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "jobs",
    params(
        ("status" = Option<String>, Query, description = "pending, running, completed or failed"),
        ("job_type" = Option<String>, Query, description = "audio_extraction, audio_analysis or drum_detection"),
        ("limit" = Option<i64>, Query, description = "Max rows (1-100, default 50)")
    ),
    responses((status = 200, description = "Caller's jobs, newest first", body = Vec<ProcessingJob>))
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), operation = "list_jobs"))]
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let limit = list_limit(&query, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT)?;
    let jobs = state
        .db
        .job_repository
        .list_for_user(auth.id(), &query, limit)
        .await?;
    Ok(Json(jobs))
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job with timing and allowed actions", body = JobDetail),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), job_id = %id, operation = "get_job"))]
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (job, video) = owned_job(&state.db, &auth, id).await?;
    Ok(Json(JobDetail::new(job, Some(video.filename), Utc::now())))
}

#[utoipa::path(
    patch,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    params(("id" = Uuid, Path, description = "Job ID")),
    request_body = JobUpdate,
    responses(
        (status = 200, description = "Job updated", body = ProcessingJob),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), job_id = %id, operation = "update_job"))]
pub async fn update_job(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<JobUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (mut job, _) = owned_job(&state.db, &auth, id).await?;
    let read_status = job.status;
    job.apply_update(&payload, Utc::now())?;

    let saved = state.db.job_repository.save(&job, read_status).await?;
    tracing::info!(job_id = %saved.id, status = %saved.status, progress = saved.progress, "Job updated");
    Ok(Json(saved))
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/retry",
    tag = "jobs",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job reset to pending", body = ProcessingJob),
        (status = 400, description = "Can only retry failed jobs", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), job_id = %id, operation = "retry_job"))]
pub async fn retry_job(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (mut job, _) = owned_job(&state.db, &auth, id).await?;
    let read_status = job.status;
    job.reset_for_retry(Utc::now())?;

    let saved = state.db.job_repository.save(&job, read_status).await?;
    tracing::info!(job_id = %saved.id, "Job queued for retry");
    Ok(Json(saved))
}

#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job cancelled", body = MessageResponse),
        (status = 400, description = "Job already finished", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), job_id = %id, operation = "cancel_job"))]
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (mut job, _) = owned_job(&state.db, &auth, id).await?;
    let read_status = job.status;
    job.cancel(Utc::now())?;

    state.db.job_repository.save(&job, read_status).await?;
    tracing::info!(job_id = %job.id, "Job cancelled");
    Ok(Json(MessageResponse::new("Job cancelled successfully")))
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/video/{video_id}",
    tag = "jobs",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "All jobs of the video, newest first", body = Vec<ProcessingJob>),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %video_id, operation = "video_jobs"))]
pub async fn video_jobs(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    owned_video(&state.db, &auth, video_id, "view this video's jobs").await?;
    let jobs = state.db.job_repository.list_for_video(video_id).await?;
    Ok(Json(jobs))
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/video/{video_id}/pipeline",
    tag = "jobs",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Stage-by-stage pipeline view", body = PipelineStatus),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %video_id, operation = "video_pipeline"))]
pub async fn video_pipeline(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(pipeline_for(&state.db, &auth, video_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/admin/statistics",
    tag = "jobs",
    responses(
        (status = 200, description = "System-wide job statistics", body = JobStatistics),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "job_statistics"))]
pub async fn job_statistics(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;
    let counts = state.db.job_repository.counts().await?;
    Ok(Json(JobStatistics::from(counts)))
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/health",
    tag = "jobs",
    responses(
        (status = 200, description = "Job table reachable", body = JobsHealth),
        (status = 500, description = "Job table unreachable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "jobs_health"))]
pub async fn jobs_health(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    state.db.job_repository.ping().await?;
    Ok(Json(JobsHealth {
        status: "healthy".to_string(),
        message: "Job processing system is operational".to_string(),
        timestamp: Utc::now(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/queue-status",
    tag = "jobs",
    responses((status = 200, description = "Active job counts for the caller and system-wide", body = QueueStatus))
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "queue_status"))]
pub async fn queue_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let repo = &state.db.job_repository;
    let (pending_jobs, running_jobs) = repo.active_counts(Some(auth.id())).await?;
    let (total_pending, total_running) = repo.active_counts(None).await?;

    Ok(Json(QueueStatus {
        pending_jobs,
        running_jobs,
        total_pending,
        total_running,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs/admin/cleanup",
    tag = "jobs",
    params(("days_old" = Option<i32>, Query, description = "Age threshold in days (1-365, default 30)")),
    responses(
        (status = 200, description = "Finished jobs deleted", body = JobCleanupResponse),
        (status = 400, description = "days_old out of range", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), operation = "cleanup_jobs"))]
pub async fn cleanup_jobs(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<CleanupQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;

    let days_old = query.days_old.unwrap_or(DEFAULT_CLEANUP_DAYS);
    if !(1..=365).contains(&days_old) {
        return Err(AppError::InvalidInput("days_old must be between 1 and 365".to_string()).into());
    }

    let deleted = state
        .db
        .job_repository
        .delete_finished_older_than(days_old)
        .await?;

    tracing::info!(deleted, days_old, "Old jobs cleaned up");
    Ok(Json(JobCleanupResponse {
        message: format!("Cleaned up {} old jobs", deleted),
        deleted,
    }))
}
