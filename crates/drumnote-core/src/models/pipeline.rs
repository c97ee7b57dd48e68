//! Processing pipeline view over a video's jobs
//!
//! The pipeline is derived, never stored: each stage reflects the most recently
//! created job of its type, and the next action is the first stage not yet started.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::job::{JobStatus, JobType, ProcessingJob};

pub const STAGE_PROGRESS_STEP: f64 = 33.3;
pub const NOTATION_GENERATION: &str = "notation_generation";

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct StageStatus {
    /// A job status, or `not_started` when no job of this type exists.
    pub status: String,
    pub progress: f64,
    pub latest_job_id: Option<Uuid>,
    pub error_message: Option<String>,
}

impl StageStatus {
    fn not_started() -> Self {
        Self {
            status: "not_started".to_string(),
            progress: 0.0,
            latest_job_id: None,
            error_message: None,
        }
    }

    fn from_job(job: &ProcessingJob) -> Self {
        Self {
            status: job.status.to_string(),
            progress: job.progress,
            latest_job_id: Some(job.id),
            error_message: job.error_message.clone(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed.to_string()
    }

    pub fn is_not_started(&self) -> bool {
        self.latest_job_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PipelineStages {
    pub audio_extraction: StageStatus,
    pub audio_analysis: StageStatus,
    pub drum_detection: StageStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PipelineStatus {
    pub video_id: Uuid,
    pub video_filename: String,
    pub pipeline_stages: PipelineStages,
    pub overall_progress: f64,
    pub next_available_action: Option<String>,
}

fn latest_stage(jobs: &[ProcessingJob], job_type: JobType) -> StageStatus {
    jobs.iter()
        .filter(|j| j.job_type == job_type)
        .max_by_key(|j| j.created_at)
        .map(StageStatus::from_job)
        .unwrap_or_else(StageStatus::not_started)
}

impl PipelineStatus {
    pub fn compute(video_id: Uuid, video_filename: String, jobs: &[ProcessingJob]) -> Self {
        let extraction = latest_stage(jobs, JobType::AudioExtraction);
        let analysis = latest_stage(jobs, JobType::AudioAnalysis);
        let detection = latest_stage(jobs, JobType::DrumDetection);

        let mut overall_progress = 0.0;
        let mut next = None;

        if extraction.is_completed() {
            overall_progress += STAGE_PROGRESS_STEP;
            if analysis.is_not_started() {
                next = Some(JobType::AudioAnalysis.to_string());
            } else if analysis.is_completed() {
                overall_progress += STAGE_PROGRESS_STEP;
                if detection.is_not_started() {
                    next = Some(JobType::DrumDetection.to_string());
                } else if detection.is_completed() {
                    overall_progress = 100.0;
                    next = Some(NOTATION_GENERATION.to_string());
                }
            }
        } else if extraction.is_not_started() {
            next = Some(JobType::AudioExtraction.to_string());
        }

        Self {
            video_id,
            video_filename,
            pipeline_stages: PipelineStages {
                audio_extraction: extraction,
                audio_analysis: analysis,
                drum_detection: detection,
            },
            overall_progress: (overall_progress * 10.0_f64).round() / 10.0,
            next_available_action: next,
        }
    }
}
