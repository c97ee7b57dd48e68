use std::collections::BTreeMap;

use drumnote_core::{
    models::{JobCounts, JobListQuery, JobStatus, JobType, ProcessingJob},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "processing_jobs", db.operation = "insert"))]
    pub async fn create(&self, video_id: Uuid, job_type: JobType) -> Result<ProcessingJob, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(
            r#"
            INSERT INTO processing_jobs (id, video_id, job_type, status, progress)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(video_id)
        .bind(job_type.as_str())
        .bind(JobStatus::Pending)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, video_id = %video_id, job_type = %job_type, "Failed to insert job");
            AppError::Database(e)
        })?;

        tracing::info!(job_id = %job.id, video_id = %video_id, job_type = %job_type, "Job created");
        Ok(job)
    }

    #[tracing::instrument(skip(self), fields(db.table = "processing_jobs", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<ProcessingJob>, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(
            "SELECT * FROM processing_jobs WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Persist a status transition computed from a job read with status `expected`.
    ///
    /// The write only applies while the row still has that status, so two
    /// conflicting transitions cannot both succeed.
    #[tracing::instrument(skip(self, job), fields(db.table = "processing_jobs", db.operation = "update", db.record_id = %job.id))]
    pub async fn save(
        &self,
        job: &ProcessingJob,
        expected: JobStatus,
    ) -> Result<ProcessingJob, AppError> {
        let saved = sqlx::query_as::<Postgres, ProcessingJob>(
            r#"
            UPDATE processing_jobs
            SET status = $2,
                progress = $3,
                error_message = $4,
                started_at = $5,
                finished_at = $6,
                updated_at = $7
            WHERE id = $1 AND status = $8 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(job.status)
        .bind(job.progress)
        .bind(&job.error_message)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.updated_at)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;

        match saved {
            Some(saved) => {
                tracing::info!(job_id = %saved.id, status = %saved.status, progress = saved.progress, "Job updated");
                Ok(saved)
            }
            None => {
                let current = self
                    .get_by_id(job.id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;
                tracing::warn!(
                    job_id = %job.id,
                    expected = %expected,
                    current = %current.status,
                    "Job status changed before update"
                );
                Err(AppError::BadRequest(format!(
                    "Cannot update job with status: {}",
                    current.status
                )))
            }
        }
    }

    /// Jobs on the user's live videos, newest first
    #[tracing::instrument(skip(self), fields(db.table = "processing_jobs", db.operation = "select"))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        query: &JobListQuery,
        limit: i64,
    ) -> Result<Vec<ProcessingJob>, AppError> {
        let mut sql = String::from(
            r#"
            SELECT j.* FROM processing_jobs j
            JOIN videos v ON v.id = j.video_id
            WHERE v.user_id = $1 AND v.deleted_at IS NULL AND j.deleted_at IS NULL
            "#,
        );

        let mut bind_count = 2;
        if query.status.is_some() {
            sql.push_str(&format!(" AND j.status = ${}", bind_count));
            bind_count += 1;
        }
        if query.job_type.is_some() {
            sql.push_str(&format!(" AND j.job_type = ${}", bind_count));
            bind_count += 1;
        }
        sql.push_str(&format!(" ORDER BY j.created_at DESC LIMIT ${}", bind_count));

        let mut query_builder = sqlx::query_as::<Postgres, ProcessingJob>(&sql).bind(user_id);
        if let Some(status) = query.status {
            query_builder = query_builder.bind(status);
        }
        if let Some(job_type) = query.job_type {
            query_builder = query_builder.bind(job_type.as_str());
        }

        let jobs = query_builder.bind(limit).fetch_all(&self.pool).await?;
        Ok(jobs)
    }

    #[tracing::instrument(skip(self), fields(db.table = "processing_jobs", db.operation = "select"))]
    pub async fn list_for_video(&self, video_id: Uuid) -> Result<Vec<ProcessingJob>, AppError> {
        let jobs = sqlx::query_as::<Postgres, ProcessingJob>(
            r#"
            SELECT * FROM processing_jobs
            WHERE video_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    #[tracing::instrument(skip(self), fields(db.table = "processing_jobs", db.operation = "select"))]
    pub async fn latest_for_video(
        &self,
        video_id: Uuid,
        job_type: JobType,
    ) -> Result<Option<ProcessingJob>, AppError> {
        let job = sqlx::query_as::<Postgres, ProcessingJob>(
            r#"
            SELECT * FROM processing_jobs
            WHERE video_id = $1 AND job_type = $2 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(video_id)
        .bind(job_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// System-wide counters for the admin statistics view
    #[tracing::instrument(skip(self), fields(db.table = "processing_jobs", db.operation = "select"))]
    pub async fn counts(&self) -> Result<JobCounts, AppError> {
        let by_status: Vec<(JobStatus, i64)> = sqlx::query_as::<Postgres, (JobStatus, i64)>(
            "SELECT status, COUNT(*) FROM processing_jobs WHERE deleted_at IS NULL GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let by_type: Vec<(String, i64)> = sqlx::query_as::<Postgres, (String, i64)>(
            "SELECT job_type, COUNT(*) FROM processing_jobs WHERE deleted_at IS NULL GROUP BY job_type",
        )
        .fetch_all(&self.pool)
        .await?;

        let average_processing_seconds = sqlx::query_scalar::<Postgres, Option<f64>>(
            r#"
            SELECT AVG(EXTRACT(EPOCH FROM (finished_at - started_at)))::DOUBLE PRECISION
            FROM processing_jobs
            WHERE status = 'completed' AND started_at IS NOT NULL AND finished_at IS NOT NULL
              AND deleted_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let mut status_counts: BTreeMap<String, i64> = [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ]
        .iter()
        .map(|s| (s.to_string(), 0))
        .collect();
        for (status, count) in by_status {
            status_counts.insert(status.to_string(), count);
        }

        let mut type_counts: BTreeMap<String, i64> =
            JobType::ALL.iter().map(|t| (t.to_string(), 0)).collect();
        type_counts.extend(by_type);

        Ok(JobCounts {
            by_status: status_counts,
            by_type: type_counts,
            average_processing_seconds,
        })
    }

    /// `(pending, running)` counts, restricted to one user's videos when given
    #[tracing::instrument(skip(self), fields(db.table = "processing_jobs", db.operation = "select"))]
    pub async fn active_counts(&self, user_id: Option<Uuid>) -> Result<(i64, i64), AppError> {
        let counts = sqlx::query_as::<Postgres, (i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE j.status = 'pending'),
                COUNT(*) FILTER (WHERE j.status = 'running')
            FROM processing_jobs j
            JOIN videos v ON v.id = j.video_id
            WHERE j.deleted_at IS NULL AND ($1::uuid IS NULL OR v.user_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    /// Soft-delete finished jobs created more than `days_old` days ago
    #[tracing::instrument(skip(self), fields(db.table = "processing_jobs", db.operation = "update"))]
    pub async fn delete_finished_older_than(&self, days_old: i32) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE deleted_at IS NULL
              AND status IN ('completed', 'failed')
              AND created_at < NOW() - make_interval(days => $1)
            "#,
        )
        .bind(days_old)
        .execute(&self.pool)
        .await?;

        tracing::info!(deleted = result.rows_affected(), days_old = days_old, "Old jobs cleaned up");
        Ok(result.rows_affected())
    }

    /// Round-trip used by the jobs health probe
    #[tracing::instrument(skip(self), fields(db.table = "processing_jobs", db.operation = "select"))]
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM processing_jobs LIMIT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
