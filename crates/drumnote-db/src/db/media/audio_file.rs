use drumnote_core::{
    models::{AudioFile, AudioFileMetadata},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[derive(Clone)]
pub struct AudioFileRepository {
    pool: PgPool,
}

impl AudioFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, metadata), fields(db.table = "audio_files", db.operation = "insert"))]
    pub async fn create(
        &self,
        id: Uuid,
        video_id: Uuid,
        metadata: &AudioFileMetadata,
        storage_path: &str,
        file_size_bytes: i64,
    ) -> Result<AudioFile, AppError> {
        let audio = sqlx::query_as::<Postgres, AudioFile>(
            r#"
            INSERT INTO audio_files (
                id, video_id, sample_rate, channels, duration_seconds, storage_path, file_size_bytes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(video_id)
        .bind(metadata.sample_rate)
        .bind(metadata.channels)
        .bind(metadata.duration_seconds)
        .bind(storage_path)
        .bind(file_size_bytes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, video_id = %video_id, "Failed to insert audio file");
            AppError::Database(e)
        })?;

        tracing::info!(audio_file_id = %audio.id, video_id = %video_id, "Audio file registered");
        Ok(audio)
    }

    #[tracing::instrument(skip(self), fields(db.table = "audio_files", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<AudioFile>, AppError> {
        let audio = sqlx::query_as::<Postgres, AudioFile>(
            "SELECT * FROM audio_files WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(audio)
    }

    #[tracing::instrument(skip(self), fields(db.table = "audio_files", db.operation = "select"))]
    pub async fn list_for_video(&self, video_id: Uuid) -> Result<Vec<AudioFile>, AppError> {
        let files = sqlx::query_as::<Postgres, AudioFile>(
            r#"
            SELECT * FROM audio_files
            WHERE video_id = $1 AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    #[tracing::instrument(skip(self), fields(db.table = "audio_files", db.operation = "select"))]
    pub async fn count_for_video(&self, video_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM audio_files WHERE video_id = $1 AND deleted_at IS NULL",
        )
        .bind(video_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "audio_files", db.operation = "update", db.record_id = %id))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE audio_files SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Storage keys of a video's audio files, soft-deleted ones included
    #[tracing::instrument(skip(self), fields(db.table = "audio_files", db.operation = "select"))]
    pub async fn storage_paths_for_video(&self, video_id: Uuid) -> Result<Vec<String>, AppError> {
        let paths = sqlx::query_scalar::<Postgres, String>(
            "SELECT storage_path FROM audio_files WHERE video_id = $1",
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(paths)
    }

    #[tracing::instrument(skip(self), fields(db.table = "audio_files", db.operation = "select"))]
    pub async fn all_storage_paths(&self) -> Result<Vec<String>, AppError> {
        let paths = sqlx::query_scalar::<Postgres, String>("SELECT storage_path FROM audio_files")
            .fetch_all(&self.pool)
            .await?;

        Ok(paths)
    }
}
