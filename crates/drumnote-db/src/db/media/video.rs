use drumnote_core::{
    models::{Video, VideoAggregates},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Fields of a freshly stored upload.
#[derive(Debug, Clone)]
pub struct NewVideo<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: &'a str,
    pub storage_path: &'a str,
    pub content_type: &'a str,
    pub file_size_bytes: i64,
}

#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, video), fields(db.table = "videos", db.operation = "insert"))]
    pub async fn create(&self, video: NewVideo<'_>) -> Result<Video, AppError> {
        let created = sqlx::query_as::<Postgres, Video>(
            r#"
            INSERT INTO videos (id, user_id, filename, storage_path, content_type, file_size_bytes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(video.id)
        .bind(video.user_id)
        .bind(video.filename)
        .bind(video.storage_path)
        .bind(video.content_type)
        .bind(video.file_size_bytes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %video.user_id, "Failed to insert video");
            AppError::Database(e)
        })?;

        tracing::info!(
            video_id = %created.id,
            user_id = %created.user_id,
            size_bytes = created.file_size_bytes,
            "Video created"
        );
        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<Postgres, Video>(
            "SELECT * FROM videos WHERE id = $1 AND ($2 OR deleted_at IS NULL)",
        )
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(video)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Video>, AppError> {
        let videos = sqlx::query_as::<Postgres, Video>(
            r#"
            SELECT * FROM videos
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(videos)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM videos WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Whether the user has another live video with this filename
    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    pub async fn filename_exists(
        &self,
        user_id: Uuid,
        filename: &str,
        exclude_video_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM videos
                WHERE user_id = $1 AND filename = $2 AND deleted_at IS NULL
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(user_id)
        .bind(filename)
        .bind(exclude_video_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Bytes of live videos and their live audio files owned by the user
    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    pub async fn storage_used_by_user(&self, user_id: Uuid) -> Result<i64, AppError> {
        let used = sqlx::query_scalar::<Postgres, i64>(
            r#"
            SELECT
                COALESCE((SELECT SUM(file_size_bytes) FROM videos
                          WHERE user_id = $1 AND deleted_at IS NULL), 0)::BIGINT
              + COALESCE((SELECT SUM(a.file_size_bytes) FROM audio_files a
                          JOIN videos v ON v.id = a.video_id
                          WHERE v.user_id = $1 AND v.deleted_at IS NULL
                            AND a.deleted_at IS NULL), 0)::BIGINT
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(used)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "update", db.record_id = %id))]
    pub async fn update_filename(&self, id: Uuid, filename: &str) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<Postgres, Video>(
            r#"
            UPDATE videos SET filename = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        Ok(video)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "update", db.record_id = %id))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE videos SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete the row; audio files, jobs and notations go with it by cascade
    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "delete", db.record_id = %id))]
    pub async fn hard_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "update", db.record_id = %id))]
    pub async fn restore(&self, id: Uuid, user_id: Uuid) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<Postgres, Video>(
            r#"
            UPDATE videos SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NOT NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(video)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    pub async fn aggregates_for_user(&self, user_id: Uuid) -> Result<VideoAggregates, AppError> {
        let aggregates = sqlx::query_as::<Postgres, VideoAggregates>(
            r#"
            SELECT
                COUNT(*) AS total_videos,
                COALESCE(SUM(v.file_size_bytes), 0)::BIGINT AS total_size_bytes,
                SUM(v.duration_seconds) AS total_duration_seconds,
                COUNT(*) FILTER (WHERE EXISTS(
                    SELECT 1 FROM audio_files a
                    WHERE a.video_id = v.id AND a.deleted_at IS NULL
                )) AS videos_with_audio,
                COUNT(*) FILTER (WHERE EXISTS(
                    SELECT 1 FROM notations n
                    WHERE n.video_id = v.id AND n.deleted_at IS NULL
                )) AS videos_with_notation
            FROM videos v
            WHERE v.user_id = $1 AND v.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(aggregates)
    }

    /// Storage keys of every video row, soft-deleted ones included
    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    pub async fn all_storage_paths(&self) -> Result<Vec<String>, AppError> {
        let paths = sqlx::query_scalar::<Postgres, String>("SELECT storage_path FROM videos")
            .fetch_all(&self.pool)
            .await?;

        Ok(paths)
    }
}
