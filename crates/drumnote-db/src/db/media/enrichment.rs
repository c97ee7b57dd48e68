use drumnote_core::{models::Enrichment, AppError};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Cache of LLM outputs keyed by `(notation_id, prompt_hash)`.
#[derive(Clone)]
pub struct EnrichmentRepository {
    pool: PgPool,
}

impl EnrichmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "openai_enrichments", db.operation = "select"))]
    pub async fn find(
        &self,
        notation_id: Uuid,
        prompt_hash: &str,
    ) -> Result<Option<Enrichment>, AppError> {
        let enrichment = sqlx::query_as::<Postgres, Enrichment>(
            r#"
            SELECT * FROM openai_enrichments
            WHERE notation_id = $1 AND prompt_hash = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(notation_id)
        .bind(prompt_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(enrichment)
    }

    /// Store an output. When another request stored the same key first, its row wins.
    /// A soft-deleted row under the same key is revived with the new output.
    #[tracing::instrument(skip(self, input_json, output_json), fields(db.table = "openai_enrichments", db.operation = "insert"))]
    pub async fn insert(
        &self,
        notation_id: Uuid,
        prompt_hash: &str,
        enhancement_type: &str,
        model: &str,
        input_json: &JsonValue,
        output_json: &JsonValue,
    ) -> Result<Enrichment, AppError> {
        let inserted = sqlx::query_as::<Postgres, Enrichment>(
            r#"
            INSERT INTO openai_enrichments (
                id, notation_id, prompt_hash, enhancement_type, model, input_json, output_json
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (notation_id, prompt_hash) DO UPDATE
            SET enhancement_type = EXCLUDED.enhancement_type,
                model = EXCLUDED.model,
                input_json = EXCLUDED.input_json,
                output_json = EXCLUDED.output_json,
                updated_at = NOW(),
                deleted_at = NULL
            WHERE openai_enrichments.deleted_at IS NOT NULL
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notation_id)
        .bind(prompt_hash)
        .bind(enhancement_type)
        .bind(model)
        .bind(input_json)
        .bind(output_json)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(enrichment) => {
                tracing::info!(
                    notation_id = %notation_id,
                    enhancement_type = %enhancement_type,
                    "Enrichment cached"
                );
                Ok(enrichment)
            }
            None => self.find(notation_id, prompt_hash).await?.ok_or_else(|| {
                AppError::Internal("Cached enrichment vanished after conflict".to_string())
            }),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "openai_enrichments", db.operation = "select"))]
    pub async fn list_for_notation(&self, notation_id: Uuid) -> Result<Vec<Enrichment>, AppError> {
        let enrichments = sqlx::query_as::<Postgres, Enrichment>(
            r#"
            SELECT * FROM openai_enrichments
            WHERE notation_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(notation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(enrichments)
    }
}
