//! Audio processing endpoints.
//!
//! These are a thin orchestration layer over processing jobs. No decoding or signal
//! analysis runs in this service; workers report progress through the jobs API.

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::jobs::{create_job, list_limit, pipeline_for};
use crate::services::ownership::owned_video;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use drumnote_core::models::{
    JobDetail, JobListQuery, JobStatistics, JobStatus, JobType, PipelineStatus, ProcessingJob,
};
use drumnote_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

const DEFAULT_SAMPLE_RATE: i32 = 44_100;
const DEFAULT_CHANNELS: i32 = 1;
const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<i32> = 8_000..=192_000;
const CHANNEL_RANGE: std::ops::RangeInclusive<i32> = 1..=2;
const MY_JOBS_DEFAULT_LIMIT: i64 = 20;
const MY_JOBS_MAX_LIMIT: i64 = 100;

const ANALYSIS_STAGES: &[&str] = &[
    "Spectral feature extraction",
    "Onset detection",
    "Tempo and beat tracking",
    "Rhythm pattern analysis",
];

const DRUM_DETECTION_STAGES: &[&str] = &[
    "Percussive source separation",
    "Drum onset detection",
    "Instrument classification",
    "Velocity estimation",
];

#[derive(Debug, Deserialize)]
pub struct ExtractionParams {
    pub sample_rate: Option<i32>,
    pub channels: Option<i32>,
}

impl ExtractionParams {
    /// Resolved `(sample_rate, channels)` with defaults applied.
    pub fn resolve(&self) -> Result<(i32, i32), AppError> {
        let sample_rate = self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
        if !SAMPLE_RATE_RANGE.contains(&sample_rate) {
            return Err(AppError::InvalidInput(format!(
                "sample_rate must be between {} and {}",
                SAMPLE_RATE_RANGE.start(),
                SAMPLE_RATE_RANGE.end()
            )));
        }
        let channels = self.channels.unwrap_or(DEFAULT_CHANNELS);
        if !CHANNEL_RANGE.contains(&channels) {
            return Err(AppError::InvalidInput(
                "channels must be 1 (mono) or 2 (stereo)".to_string(),
            ));
        }
        Ok((sample_rate, channels))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExtractionSettings {
    pub sample_rate: i32,
    pub channels: i32,
    pub format: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessingJobCreated {
    pub message: String,
    pub job_id: Uuid,
    pub video_id: Uuid,
    pub status: JobStatus,
    pub estimated_duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<ExtractionSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<String>>,
}

impl ProcessingJobCreated {
    fn new(message: &str, job: &ProcessingJob, estimated_duration: &str) -> Self {
        Self {
            message: message.to_string(),
            job_id: job.id,
            video_id: job.video_id,
            status: job.status,
            estimated_duration: estimated_duration.to_string(),
            settings: None,
            stages: None,
        }
    }

    fn with_stages(mut self, stages: &[&str]) -> Self {
        self.stages = Some(stages.iter().map(|s| s.to_string()).collect());
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExtractionStatus {
    #[serde(flatten)]
    pub detail: JobDetail,
    pub extraction_status: JobStatus,
    pub audio_available: bool,
    pub next_steps: Vec<String>,
}

pub fn next_steps(status: JobStatus) -> Vec<String> {
    let steps: &[&str] = match status {
        JobStatus::Completed => &[
            "Start audio analysis",
            "Begin drum detection",
            "View audio features",
        ],
        JobStatus::Failed => &[
            "Check error message",
            "Retry extraction",
            "Contact support if issue persists",
        ],
        JobStatus::Pending | JobStatus::Running => &[
            "Wait for processing to complete",
            "Check status again in a few minutes",
        ],
    };
    steps.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AudioBasicInfo {
    pub duration_seconds: Option<f64>,
    pub sample_rate: i32,
    pub channels: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AudioDetailedInfo {
    pub file_size_bytes: i64,
    pub format: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AudioInfo {
    pub video_id: Uuid,
    pub audio_file_id: Uuid,
    pub basic_info: AudioBasicInfo,
    pub detailed_info: AudioDetailedInfo,
    pub storage_path: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobFilters {
    pub status: Option<JobStatus>,
    pub job_type: Option<JobType>,
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyJobs {
    pub jobs: Vec<ProcessingJob>,
    pub total: usize,
    pub filters: JobFilters,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecommendedSettings {
    pub sample_rate: i32,
    pub channels: i32,
    pub format: String,
    pub bit_depth: i32,
    pub normalization: bool,
}

impl Default for RecommendedSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            format: "wav".to_string(),
            bit_depth: 16,
            normalization: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AudioFormatInfo {
    pub format: String,
    pub description: String,
    pub lossless: bool,
    pub recommended: bool,
}

pub fn supported_audio_formats() -> Vec<AudioFormatInfo> {
    let format = |format: &str, description: &str, lossless, recommended| AudioFormatInfo {
        format: format.to_string(),
        description: description.to_string(),
        lossless,
        recommended,
    };
    vec![
        format("wav", "Uncompressed PCM audio, best for analysis", true, true),
        format("mp3", "Compressed lossy audio, smaller files", false, false),
        format("flac", "Compressed lossless audio", true, false),
    ]
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AudioServiceInfo {
    pub supported_formats: Vec<AudioFormatInfo>,
    pub recommended_settings: RecommendedSettings,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AudioStatistics {
    pub job_statistics: JobStatistics,
    pub audio_service_info: AudioServiceInfo,
}

#[utoipa::path(
    post,
    path = "/api/v1/audio/extract/{video_id}",
    tag = "audio",
    params(
        ("video_id" = Uuid, Path, description = "Video ID"),
        ("sample_rate" = Option<i32>, Query, description = "Target sample rate (8000-192000, default 44100)"),
        ("channels" = Option<i32>, Query, description = "1 (mono) or 2 (stereo), default 1")
    ),
    responses(
        (status = 201, description = "Extraction job created", body = ProcessingJobCreated),
        (status = 400, description = "Invalid settings or extraction already in progress", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params), fields(user_id = %auth.id(), video_id = %video_id, operation = "extract_audio"))]
pub async fn extract_audio(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
    Query(params): Query<ExtractionParams>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (sample_rate, channels) = params.resolve()?;
    let job = create_job(&state.db, &auth, video_id, JobType::AudioExtraction).await?;

    let mut body = ProcessingJobCreated::new(
        "Audio extraction job created successfully",
        &job,
        "2-5 minutes",
    );
    body.settings = Some(ExtractionSettings {
        sample_rate,
        channels,
        format: "wav".to_string(),
    });
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/v1/audio/extract/{video_id}/status",
    tag = "audio",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Latest extraction job", body = ExtractionStatus),
        (status = 404, description = "Video or extraction job not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %video_id, operation = "extraction_status"))]
pub async fn extraction_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = owned_video(&state.db, &auth, video_id, "view this video's jobs").await?;

    let job = state
        .db
        .job_repository
        .latest_for_video(video_id, JobType::AudioExtraction)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No audio extraction job found for this video".to_string())
        })?;

    let status = job.status;
    Ok(Json(ExtractionStatus {
        detail: JobDetail::new(job, Some(video.filename), Utc::now()),
        extraction_status: status,
        audio_available: status == JobStatus::Completed,
        next_steps: next_steps(status),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/audio/info/{video_id}",
    tag = "audio",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "First registered audio file of the video", body = AudioInfo),
        (status = 404, description = "Video or audio file not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %video_id, operation = "audio_info"))]
pub async fn audio_info(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    owned_video(&state.db, &auth, video_id, "access this video").await?;

    let audio = state
        .db
        .audio_file_repository
        .list_for_video(video_id)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            AppError::NotFound(
                "No audio file found for this video. Please extract audio first.".to_string(),
            )
        })?;

    let format = drumnote_core::validation::file_extension(&audio.storage_path)
        .unwrap_or_else(|| "unknown".to_string());

    Ok(Json(AudioInfo {
        video_id,
        audio_file_id: audio.id,
        basic_info: AudioBasicInfo {
            duration_seconds: audio.duration_seconds,
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            created_at: audio.created_at,
        },
        detailed_info: AudioDetailedInfo {
            file_size_bytes: audio.file_size_bytes,
            format,
        },
        storage_path: audio.storage_path,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/audio/analyze/{video_id}",
    tag = "audio",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 201, description = "Analysis job created", body = ProcessingJobCreated),
        (status = 400, description = "Audio not extracted yet", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %video_id, operation = "analyze_audio"))]
pub async fn analyze_audio(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let job = create_job(&state.db, &auth, video_id, JobType::AudioAnalysis).await?;
    let body = ProcessingJobCreated::new("Audio analysis job created successfully", &job, "3-7 minutes")
        .with_stages(ANALYSIS_STAGES);
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/v1/audio/detect-drums/{video_id}",
    tag = "audio",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 201, description = "Drum detection job created", body = ProcessingJobCreated),
        (status = 400, description = "Audio not extracted yet", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %video_id, operation = "detect_drums"))]
pub async fn detect_drums(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let job = create_job(&state.db, &auth, video_id, JobType::DrumDetection).await?;
    let body = ProcessingJobCreated::new("Drum detection job created successfully", &job, "5-15 minutes")
        .with_stages(DRUM_DETECTION_STAGES);
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/v1/audio/pipeline/{video_id}",
    tag = "audio",
    params(("video_id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Stage-by-stage pipeline view", body = PipelineStatus),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), video_id = %video_id, operation = "audio_pipeline"))]
pub async fn audio_pipeline(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(pipeline_for(&state.db, &auth, video_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/audio/jobs/my-jobs",
    tag = "audio",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("job_type" = Option<String>, Query, description = "Filter by job type"),
        ("limit" = Option<i64>, Query, description = "Max rows (1-100, default 20)")
    ),
    responses((status = 200, description = "Caller's jobs with the applied filters", body = MyJobs))
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), operation = "my_jobs"))]
pub async fn my_jobs(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let limit = list_limit(&query, MY_JOBS_DEFAULT_LIMIT, MY_JOBS_MAX_LIMIT)?;
    let jobs = state
        .db
        .job_repository
        .list_for_user(auth.id(), &query, limit)
        .await?;

    Ok(Json(MyJobs {
        total: jobs.len(),
        jobs,
        filters: JobFilters {
            status: query.status,
            job_type: query.job_type,
            limit,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/audio/settings/recommended",
    tag = "audio",
    responses((status = 200, description = "Recommended extraction settings", body = RecommendedSettings))
)]
pub async fn recommended_settings(_auth: AuthUser) -> impl IntoResponse {
    Json(RecommendedSettings::default())
}

#[utoipa::path(
    get,
    path = "/api/v1/audio/settings/supported-formats",
    tag = "audio",
    responses((status = 200, description = "Accepted audio formats", body = Vec<AudioFormatInfo>))
)]
pub async fn supported_formats(_auth: AuthUser) -> impl IntoResponse {
    Json(supported_audio_formats())
}

#[utoipa::path(
    get,
    path = "/api/v1/audio/admin/statistics",
    tag = "audio",
    responses(
        (status = 200, description = "Job statistics and service settings", body = AudioStatistics),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "audio_statistics"))]
pub async fn audio_statistics(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;
    let counts = state.db.job_repository.counts().await?;

    Ok(Json(AudioStatistics {
        job_statistics: JobStatistics::from(counts),
        audio_service_info: AudioServiceInfo {
            supported_formats: supported_audio_formats(),
            recommended_settings: RecommendedSettings::default(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_defaults() {
        let params = ExtractionParams {
            sample_rate: None,
            channels: None,
        };
        assert_eq!(params.resolve().unwrap(), (44_100, 1));
    }

    #[test]
    fn extraction_rejects_out_of_range() {
        let low_rate = ExtractionParams {
            sample_rate: Some(4_000),
            channels: None,
        };
        assert!(low_rate.resolve().is_err());

        let surround = ExtractionParams {
            sample_rate: Some(48_000),
            channels: Some(6),
        };
        assert!(surround.resolve().is_err());
    }

    #[test]
    fn next_steps_follow_status() {
        assert_eq!(next_steps(JobStatus::Completed)[0], "Start audio analysis");
        assert_eq!(next_steps(JobStatus::Failed).len(), 3);
        assert_eq!(
            next_steps(JobStatus::Running),
            next_steps(JobStatus::Pending)
        );
    }

    #[test]
    fn wav_is_the_recommended_format() {
        let formats = supported_audio_formats();
        let names: Vec<_> = formats.iter().map(|f| f.format.as_str()).collect();
        assert_eq!(names, ["wav", "mp3", "flac"]);
        assert!(formats.iter().filter(|f| f.recommended).all(|f| f.format == "wav"));
    }
}
