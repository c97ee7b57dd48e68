use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::AppError;

pub const CANCELLED_BY_USER: &str = "Job cancelled by user";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    AudioExtraction,
    AudioAnalysis,
    DrumDetection,
}

impl JobType {
    pub const ALL: [JobType; 3] = [
        JobType::AudioExtraction,
        JobType::AudioAnalysis,
        JobType::DrumDetection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::AudioExtraction => "audio_extraction",
            JobType::AudioAnalysis => "audio_analysis",
            JobType::DrumDetection => "drum_detection",
        }
    }
}

impl Display for JobType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio_extraction" => Ok(JobType::AudioExtraction),
            "audio_analysis" => Ok(JobType::AudioAnalysis),
            "drum_detection" => Ok(JobType::DrumDetection),
            _ => Err(anyhow::anyhow!("Invalid job type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "job_status", rename_all = "lowercase")
)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// A processing job row. Status changes are plain writes issued by request handlers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessingJob {
    pub id: Uuid,
    pub video_id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    pub progress: f64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for ProcessingJob {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(ProcessingJob {
            id: row.try_get("id")?,
            video_id: row.try_get("video_id")?,
            job_type: row.try_get::<String, _>("job_type")?.parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse job_type: {}", e).into())
            })?,
            status: row.try_get("status")?,
            progress: row.try_get("progress")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            started_at: row.try_get("started_at")?,
            finished_at: row.try_get("finished_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

impl ProcessingJob {
    pub fn can_cancel(&self) -> bool {
        self.status.is_active()
    }

    pub fn can_retry(&self) -> bool {
        self.status == JobStatus::Failed
    }

    /// Seconds between start and finish (or `now` while still running), rounded to 2 places.
    pub fn duration_seconds(&self, now: DateTime<Utc>) -> Option<f64> {
        let started = self.started_at?;
        let end = self.finished_at.unwrap_or(now);
        let millis = end.signed_duration_since(started).num_milliseconds().max(0);
        Some((millis as f64 / 10.0).round() / 100.0)
    }

    pub fn mark_started(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Running;
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.progress = 100.0;
        self.started_at.get_or_insert(now);
        self.finished_at = Some(now);
        self.error_message = None;
    }

    pub fn mark_failed(&mut self, error_message: impl Into<String>, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error_message.into());
        self.finished_at = Some(now);
    }

    pub fn update_progress(&mut self, progress: f64) {
        self.progress = if progress.is_finite() {
            progress.clamp(0.0, 100.0)
        } else {
            0.0
        };
    }

    /// Apply a client status write, enforcing the allowed transitions.
    pub fn apply_update(&mut self, update: &JobUpdate, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::BadRequest(format!(
                "Cannot update job with status: {}",
                self.status
            )));
        }

        if let Some(progress) = update.progress {
            self.update_progress(progress);
        }
        if let Some(ref message) = update.error_message {
            self.error_message = Some(message.clone());
        }

        match update.status {
            None | Some(JobStatus::Pending) if self.status == JobStatus::Pending => {}
            None => {}
            Some(JobStatus::Pending) => {
                return Err(AppError::BadRequest(
                    "Cannot move a running job back to pending".to_string(),
                ));
            }
            Some(JobStatus::Running) => self.mark_started(now),
            Some(JobStatus::Completed) => self.mark_completed(now),
            Some(JobStatus::Failed) => {
                let message = update
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Job failed".to_string());
                self.mark_failed(message, now);
            }
        }

        self.updated_at = now;
        Ok(())
    }

    pub fn reset_for_retry(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if !self.can_retry() {
            return Err(AppError::BadRequest(
                "Can only retry failed jobs".to_string(),
            ));
        }
        self.status = JobStatus::Pending;
        self.progress = 0.0;
        self.error_message = None;
        self.started_at = None;
        self.finished_at = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if !self.can_cancel() {
            return Err(AppError::BadRequest(format!(
                "Cannot cancel job with status: {}",
                self.status
            )));
        }
        self.mark_failed(CANCELLED_BY_USER, now);
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct JobCreate {
    pub video_id: Uuid,
    pub job_type: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct JobUpdate {
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
    pub job_type: Option<JobType>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: ProcessingJob,
    pub duration_seconds: Option<f64>,
    pub can_cancel: bool,
    pub can_retry: bool,
    pub video_filename: Option<String>,
}

impl JobDetail {
    pub fn new(job: ProcessingJob, video_filename: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            duration_seconds: job.duration_seconds(now),
            can_cancel: job.can_cancel(),
            can_retry: job.can_retry(),
            video_filename,
            job,
        }
    }
}

/// Raw counters collected by the repository.
#[derive(Debug, Clone, Default)]
pub struct JobCounts {
    pub by_status: BTreeMap<String, i64>,
    pub by_type: BTreeMap<String, i64>,
    pub average_processing_seconds: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobStatistics {
    pub status_counts: BTreeMap<String, i64>,
    pub type_counts: BTreeMap<String, i64>,
    pub total_jobs: i64,
    pub average_processing_time: Option<f64>,
    pub success_rate: f64,
    pub pending_jobs: i64,
    pub running_jobs: i64,
}

impl From<JobCounts> for JobStatistics {
    fn from(counts: JobCounts) -> Self {
        let get = |s: JobStatus| counts.by_status.get(&s.to_string()).copied().unwrap_or(0);
        let total_jobs: i64 = counts.by_status.values().sum();
        let completed = get(JobStatus::Completed);
        let success_rate = if total_jobs > 0 {
            ((completed as f64 / total_jobs as f64) * 100.0 * 100.0).round() / 100.0
        } else {
            0.0
        };
        Self {
            pending_jobs: get(JobStatus::Pending),
            running_jobs: get(JobStatus::Running),
            total_jobs,
            success_rate,
            average_processing_time: counts
                .average_processing_seconds
                .map(|s| (s * 100.0).round() / 100.0),
            status_counts: counts.by_status,
            type_counts: counts.by_type,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueueStatus {
    /// Counts for the caller's own videos.
    pub pending_jobs: i64,
    pub running_jobs: i64,
    /// System-wide counts.
    pub total_pending: i64,
    pub total_running: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(status: JobStatus) -> ProcessingJob {
        let now = Utc::now();
        ProcessingJob {
            id: Uuid::new_v4(),
            video_id: Uuid::new_v4(),
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
    }

    #[test]
    fn test_job_type_round_trip_strings() {
        for t in JobType::ALL {
            assert_eq!(t.to_string().parse::<JobType>().unwrap(), t);
        }
        assert!("transcode".parse::<JobType>().is_err());
    }

    #[test]
    fn test_job_status_from_str() {
        assert_eq!("running".parse::<JobStatus>().unwrap(), JobStatus::Running);
        assert!("cancelled".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut j = job(JobStatus::Running);
        j.update_progress(140.0);
        assert_eq!(j.progress, 100.0);
        j.update_progress(-3.0);
        assert_eq!(j.progress, 0.0);
        j.update_progress(f64::NAN);
        assert_eq!(j.progress, 0.0);
    }

    #[test]
    fn test_running_sets_started_at_once() {
        let now = Utc::now();
        let mut j = job(JobStatus::Pending);
        j.apply_update(
            &JobUpdate {
                status: Some(JobStatus::Running),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        assert_eq!(j.status, JobStatus::Running);
        assert_eq!(j.started_at, Some(now));

        let later = now + Duration::seconds(5);
        j.apply_update(
            &JobUpdate {
                status: Some(JobStatus::Running),
                progress: Some(40.0),
                ..Default::default()
            },
            later,
        )
        .unwrap();
        assert_eq!(j.started_at, Some(now));
        assert_eq!(j.progress, 40.0);
    }

    #[test]
    fn test_completed_forces_full_progress() {
        let now = Utc::now();
        let mut j = job(JobStatus::Running);
        j.apply_update(
            &JobUpdate {
                status: Some(JobStatus::Completed),
                progress: Some(12.0),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        assert_eq!(j.progress, 100.0);
        assert_eq!(j.finished_at, Some(now));
        assert!(j.started_at.is_some());
    }

    #[test]
    fn test_terminal_jobs_reject_updates() {
        let mut j = job(JobStatus::Completed);
        let err = j
            .apply_update(
                &JobUpdate {
                    progress: Some(50.0),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("completed"));
    }

    #[test]
    fn test_running_cannot_return_to_pending() {
        let mut j = job(JobStatus::Running);
        let update = JobUpdate {
            status: Some(JobStatus::Pending),
            ..Default::default()
        };
        assert!(j.apply_update(&update, Utc::now()).is_err());
    }

    #[test]
    fn test_retry_only_failed() {
        let now = Utc::now();
        let mut j = job(JobStatus::Running);
        assert!(j.reset_for_retry(now).is_err());

        j.mark_failed("boom", now);
        j.progress = 70.0;
        j.reset_for_retry(now).unwrap();
        assert_eq!(j.status, JobStatus::Pending);
        assert_eq!(j.progress, 0.0);
        assert!(j.error_message.is_none());
        assert!(j.started_at.is_none() && j.finished_at.is_none());
    }

    #[test]
    fn test_cancel_marks_failed() {
        let now = Utc::now();
        let mut j = job(JobStatus::Pending);
        j.cancel(now).unwrap();
        assert_eq!(j.status, JobStatus::Failed);
        assert_eq!(j.error_message.as_deref(), Some(CANCELLED_BY_USER));

        let err = j.cancel(now).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad request: Cannot cancel job with status: failed"
        );
    }

    #[test]
    fn test_duration_uses_now_when_unfinished() {
        let start = Utc::now();
        let mut j = job(JobStatus::Running);
        assert_eq!(j.duration_seconds(start), None);
        j.started_at = Some(start);
        assert_eq!(
            j.duration_seconds(start + Duration::milliseconds(2_345)),
            Some(2.35)
        );
        j.finished_at = Some(start + Duration::seconds(1));
        assert_eq!(j.duration_seconds(start + Duration::hours(1)), Some(1.0));
    }

    #[test]
    fn test_statistics_success_rate() {
        let mut counts = JobCounts::default();
        counts.by_status.insert("completed".to_string(), 3);
        counts.by_status.insert("failed".to_string(), 1);
        counts.by_status.insert("pending".to_string(), 2);
        let stats = JobStatistics::from(counts);
        assert_eq!(stats.total_jobs, 6);
        assert_eq!(stats.success_rate, 50.0);
        assert_eq!(stats.pending_jobs, 2);
        assert_eq!(stats.running_jobs, 0);
    }
}
