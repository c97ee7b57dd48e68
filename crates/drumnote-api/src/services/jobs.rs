//! Job creation rules
//!
//! Extraction may not run twice concurrently; analysis and drum detection need a
//! completed extraction first.

use drumnote_core::models::{JobListQuery, JobStatus, JobType, PipelineStatus, ProcessingJob};
use drumnote_core::AppError;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::services::ownership::owned_video;
use crate::state::DbState;

/// What is already known about a video's extraction jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionState {
    pub in_progress: bool,
    pub completed: bool,
}

/// Reject a job whose prerequisites are not met.
pub fn check_prerequisites(job_type: JobType, extraction: ExtractionState) -> Result<(), AppError> {
    let message = match job_type {
        JobType::AudioExtraction if extraction.in_progress => {
            "Audio extraction job already in progress"
        }
        JobType::AudioAnalysis if !extraction.completed => "Audio must be extracted before analysis",
        JobType::DrumDetection if !extraction.completed => {
            "Audio must be extracted before drum detection"
        }
        _ => return Ok(()),
    };
    Err(AppError::BadRequest(message.to_string()))
}

pub fn parse_job_type(raw: &str) -> Result<JobType, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid job type".to_string()))
}

impl ExtractionState {
    /// State as seen through the most recent extraction job of a video.
    pub fn from_latest(latest: Option<&ProcessingJob>) -> Self {
        let status = latest.map(|job| job.status);
        ExtractionState {
            in_progress: status.is_some_and(|s| s.is_active()),
            completed: status == Some(JobStatus::Completed),
        }
    }
}

async fn extraction_state(db: &DbState, video_id: Uuid) -> Result<ExtractionState, AppError> {
    let latest = db
        .job_repository
        .latest_for_video(video_id, JobType::AudioExtraction)
        .await?;
    Ok(ExtractionState::from_latest(latest.as_ref()))
}

/// Resolve a list limit, rejecting values outside `1..=max`.
pub fn list_limit(query: &JobListQuery, default: i64, max: i64) -> Result<i64, AppError> {
    let limit = query.limit.unwrap_or(default);
    if !(1..=max).contains(&limit) {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            max
        )));
    }
    Ok(limit)
}

/// Pipeline view over the jobs of a video the caller owns.
pub async fn pipeline_for(
    db: &DbState,
    auth: &AuthUser,
    video_id: Uuid,
) -> Result<PipelineStatus, AppError> {
    let video = owned_video(db, auth, video_id, "view this video's pipeline").await?;
    let jobs = db.job_repository.list_for_video(video_id).await?;
    Ok(PipelineStatus::compute(video.id, video.filename, &jobs))
}

/// Create a pending job for a video the caller owns.
#[tracing::instrument(skip(db, auth), fields(user_id = %auth.id()))]
pub async fn create_job(
    db: &DbState,
    auth: &AuthUser,
    video_id: Uuid,
    job_type: JobType,
) -> Result<ProcessingJob, AppError> {
    owned_video(db, auth, video_id, "process this video").await?;

    let extraction = extraction_state(db, video_id).await?;
    check_prerequisites(job_type, extraction)?;

    let job = db.job_repository.create(video_id, job_type).await?;
    tracing::info!(job_id = %job.id, video_id = %video_id, job_type = %job_type, "Processing job created");
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(in_progress: bool, completed: bool) -> ExtractionState {
        ExtractionState {
            in_progress,
            completed,
        }
    }

    #[test]
    fn extraction_blocked_while_active() {
        let err = check_prerequisites(JobType::AudioExtraction, state(true, false)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Audio extraction job already in progress"));
        assert!(check_prerequisites(JobType::AudioExtraction, state(false, true)).is_ok());
    }

    #[test]
    fn downstream_jobs_need_completed_extraction() {
        let err = check_prerequisites(JobType::AudioAnalysis, state(true, false)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Audio must be extracted before analysis"));

        let err = check_prerequisites(JobType::DrumDetection, state(false, false)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Audio must be extracted before drum detection"));

        assert!(check_prerequisites(JobType::AudioAnalysis, state(false, true)).is_ok());
        assert!(check_prerequisites(JobType::DrumDetection, state(true, true)).is_ok());
    }

    #[test]
    fn extraction_state_follows_latest_job() {
        let job = |status| {
            let now = chrono::Utc::now();
            ProcessingJob {
                id: Uuid::new_v4(),
                video_id: Uuid::nil(),
                job_type: JobType::AudioExtraction,
                status,
                progress: 0.0,
                error_message: None,
                created_at: now,
                updated_at: now,
                started_at: None,
                finished_at: None,
                deleted_at: None,
            }
        };

        let none = ExtractionState::from_latest(None);
        assert!(!none.in_progress && !none.completed);

        let pending = ExtractionState::from_latest(Some(&job(JobStatus::Pending)));
        assert!(pending.in_progress && !pending.completed);
        assert!(check_prerequisites(JobType::DrumDetection, pending).is_err());

        let done = ExtractionState::from_latest(Some(&job(JobStatus::Completed)));
        assert!(!done.in_progress && done.completed);

        let failed = ExtractionState::from_latest(Some(&job(JobStatus::Failed)));
        assert!(!failed.in_progress && !failed.completed);
    }

    #[test]
    fn unknown_job_type() {
        assert_eq!(parse_job_type("drum_detection").unwrap(), JobType::DrumDetection);
        assert!(matches!(
            parse_job_type("transcode"),
            Err(AppError::BadRequest(msg)) if msg == "Invalid job type"
        ));
    }

    #[test]
    fn list_limit_bounds() {
        let query = |limit| JobListQuery {
            status: None,
            job_type: None,
            limit,
        };
        assert_eq!(list_limit(&query(None), 50, 100).unwrap(), 50);
        assert_eq!(list_limit(&query(Some(100)), 50, 100).unwrap(), 100);
        assert!(list_limit(&query(Some(0)), 50, 100).is_err());
        assert!(list_limit(&query(Some(101)), 50, 100).is_err());
    }
}
