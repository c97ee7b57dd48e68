use drumnote_core::{
    models::{ConfidenceDistribution, Notation, NotationListQuery, NotationStats, TimeSignatureCount},
    AppError,
};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Columns of a notation insert.
#[derive(Debug, Clone)]
pub struct NewNotation {
    pub video_id: Uuid,
    pub tempo: Option<i32>,
    pub time_signature: Option<String>,
    pub notation_json: JsonValue,
    pub model_version: Option<String>,
    pub confidence_score: Option<f64>,
}

#[derive(Clone)]
pub struct NotationRepository {
    pool: PgPool,
}

impl NotationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, notation), fields(db.table = "notations", db.operation = "insert"))]
    pub async fn create(&self, notation: NewNotation) -> Result<Notation, AppError> {
        let created = sqlx::query_as::<Postgres, Notation>(
            r#"
            INSERT INTO notations (
                id, video_id, tempo, time_signature, notation_json, model_version, confidence_score
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notation.video_id)
        .bind(notation.tempo)
        .bind(&notation.time_signature)
        .bind(&notation.notation_json)
        .bind(&notation.model_version)
        .bind(notation.confidence_score)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, video_id = %notation.video_id, "Failed to insert notation");
            AppError::Database(e)
        })?;

        tracing::info!(notation_id = %created.id, video_id = %created.video_id, "Notation created");
        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "notations", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<Notation>, AppError> {
        let notation = sqlx::query_as::<Postgres, Notation>(
            "SELECT * FROM notations WHERE id = $1 AND ($2 OR deleted_at IS NULL)",
        )
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notation)
    }

    /// Live notations on the user's live videos matching the filters, with the total match count
    #[tracing::instrument(skip(self), fields(db.table = "notations", db.operation = "select"))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        query: &NotationListQuery,
    ) -> Result<(Vec<Notation>, i64), AppError> {
        let mut conditions = String::from(
            r#"
            FROM notations n
            JOIN videos v ON v.id = n.video_id
            WHERE v.user_id = $1 AND v.deleted_at IS NULL AND n.deleted_at IS NULL
            "#,
        );

        let mut bind_count = 2;
        if query.video_id.is_some() {
            conditions.push_str(&format!(" AND n.video_id = ${}", bind_count));
            bind_count += 1;
        }
        if query.tempo_min.is_some() {
            conditions.push_str(&format!(" AND n.tempo >= ${}", bind_count));
            bind_count += 1;
        }
        if query.tempo_max.is_some() {
            conditions.push_str(&format!(" AND n.tempo <= ${}", bind_count));
            bind_count += 1;
        }
        if query.time_signature.is_some() {
            conditions.push_str(&format!(" AND n.time_signature = ${}", bind_count));
            bind_count += 1;
        }

        let list_sql = format!(
            "SELECT n.* {} ORDER BY n.created_at DESC LIMIT ${} OFFSET ${}",
            conditions,
            bind_count,
            bind_count + 1
        );
        let count_sql = format!("SELECT COUNT(*) {}", conditions);

        let mut list_query = sqlx::query_as::<Postgres, Notation>(&list_sql).bind(user_id);
        let mut count_query = sqlx::query_scalar::<Postgres, i64>(&count_sql).bind(user_id);
        if let Some(video_id) = query.video_id {
            list_query = list_query.bind(video_id);
            count_query = count_query.bind(video_id);
        }
        if let Some(tempo_min) = query.tempo_min {
            list_query = list_query.bind(tempo_min);
            count_query = count_query.bind(tempo_min);
        }
        if let Some(tempo_max) = query.tempo_max {
            list_query = list_query.bind(tempo_max);
            count_query = count_query.bind(tempo_max);
        }
        if let Some(ref time_signature) = query.time_signature {
            list_query = list_query.bind(time_signature.clone());
            count_query = count_query.bind(time_signature.clone());
        }

        let notations = list_query
            .bind(query.limit())
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = count_query.fetch_one(&self.pool).await?;

        Ok((notations, total))
    }

    #[tracing::instrument(skip(self, notation_json), fields(db.table = "notations", db.operation = "update", db.record_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        tempo: Option<i32>,
        time_signature: Option<&str>,
        notation_json: Option<&JsonValue>,
    ) -> Result<Option<Notation>, AppError> {
        let notation = sqlx::query_as::<Postgres, Notation>(
            r#"
            UPDATE notations
            SET tempo = COALESCE($2, tempo),
                time_signature = COALESCE($3, time_signature),
                notation_json = COALESCE($4, notation_json),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tempo)
        .bind(time_signature)
        .bind(notation_json)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notation)
    }

    #[tracing::instrument(skip(self), fields(db.table = "notations", db.operation = "update", db.record_id = %id))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE notations SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "notations", db.operation = "update", db.record_id = %id))]
    pub async fn restore(&self, id: Uuid) -> Result<Option<Notation>, AppError> {
        let notation = sqlx::query_as::<Postgres, Notation>(
            r#"
            UPDATE notations SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NOT NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notation)
    }

    /// Overview statistics across the user's live notations
    #[tracing::instrument(skip(self), fields(db.table = "notations", db.operation = "select"))]
    pub async fn stats_for_user(&self, user_id: Uuid) -> Result<NotationStats, AppError> {
        let (total_notations, total_events, avg_tempo) =
            sqlx::query_as::<Postgres, (i64, i64, Option<f64>)>(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM((n.notation_json->'metadata'->>'total_events')::BIGINT), 0)::BIGINT,
                    AVG(n.tempo)::DOUBLE PRECISION
                FROM notations n
                JOIN videos v ON v.id = n.video_id
                WHERE v.user_id = $1 AND v.deleted_at IS NULL AND n.deleted_at IS NULL
                "#,
            )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let common_time_signatures = sqlx::query_as::<Postgres, (String, i64)>(
            r#"
            SELECT n.time_signature, COUNT(*) AS count
            FROM notations n
            JOIN videos v ON v.id = n.video_id
            WHERE v.user_id = $1 AND v.deleted_at IS NULL AND n.deleted_at IS NULL
              AND n.time_signature IS NOT NULL
            GROUP BY n.time_signature
            ORDER BY count DESC, n.time_signature ASC
            LIMIT 5
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(time_signature, count)| TimeSignatureCount {
            time_signature,
            count,
        })
        .collect();

        let instruments_detected = sqlx::query_scalar::<Postgres, String>(
            r#"
            SELECT DISTINCT instrument FROM (
                SELECT jsonb_array_elements_text(
                    n.notation_json->'musical_structure'->'instruments_detected'
                ) AS instrument
                FROM notations n
                JOIN videos v ON v.id = n.video_id
                WHERE v.user_id = $1 AND v.deleted_at IS NULL AND n.deleted_at IS NULL
                  AND jsonb_typeof(n.notation_json->'musical_structure'->'instruments_detected') = 'array'
            ) instruments
            ORDER BY instrument
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let (high, medium, low) = sqlx::query_as::<Postgres, (i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE n.confidence_score >= 0.8),
                COUNT(*) FILTER (WHERE n.confidence_score >= 0.5 AND n.confidence_score < 0.8),
                COUNT(*) FILTER (WHERE n.confidence_score < 0.5)
            FROM notations n
            JOIN videos v ON v.id = n.video_id
            WHERE v.user_id = $1 AND v.deleted_at IS NULL AND n.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(NotationStats {
            total_notations,
            total_events,
            avg_tempo: avg_tempo.map(|t| (t * 10.0).round() / 10.0),
            common_time_signatures,
            instruments_detected,
            confidence_distribution: ConfidenceDistribution { high, medium, low },
        })
    }
}
