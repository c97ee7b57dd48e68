//! Notation enrichment with an LLM, cached per request input.

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::enrichment::EnrichmentService;
use crate::services::ownership::owned_notation;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use drumnote_core::models::{
    AiStatus, EnhanceRequest, EnhancementRead, NotationAnalysisResponse, NotationWithEnhancements,
    VariationsRequest,
};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/notations/{id}/enhance",
    tag = "enrichment",
    params(("id" = Uuid, Path, description = "Notation ID")),
    request_body = EnhanceRequest,
    responses(
        (status = 200, description = "Requested analysis sections", body = NotationAnalysisResponse),
        (status = 400, description = "Unknown enhancement type", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Notation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), notation_id = %id, operation = "enhance_notation"))]
pub async fn enhance_notation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<EnhanceRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let notation = owned_notation(&state.db, &auth, id, false).await?;

    let response = EnrichmentService::new(&state.db, &state.insights)
        .enhance(&notation, payload.enhancement_type)
        .await?;

    tracing::info!(
        notation_id = %id,
        enhancement_type = %payload.enhancement_type,
        cached = response.metadata.cached,
        "Notation enhanced"
    );
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/notations/{id}/variations",
    tag = "enrichment",
    params(("id" = Uuid, Path, description = "Notation ID")),
    request_body = VariationsRequest,
    responses(
        (status = 200, description = "Practice variations", body = NotationAnalysisResponse),
        (status = 400, description = "Unknown difficulty level", body = ErrorResponse),
        (status = 404, description = "Notation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), notation_id = %id, operation = "notation_variations"))]
pub async fn notation_variations(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<VariationsRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let notation = owned_notation(&state.db, &auth, id, false).await?;

    let response = EnrichmentService::new(&state.db, &state.insights)
        .variations(&notation, payload.difficulty_level)
        .await?;

    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/notations/{id}/with-enhancements",
    tag = "enrichment",
    params(("id" = Uuid, Path, description = "Notation ID")),
    responses(
        (status = 200, description = "Notation and every cached enhancement", body = NotationWithEnhancements),
        (status = 404, description = "Notation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), notation_id = %id, operation = "notation_with_enhancements"))]
pub async fn notation_with_enhancements(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let notation = owned_notation(&state.db, &auth, id, false).await?;
    let ai_enhancements = state
        .db
        .enrichment_repository
        .list_for_notation(id)
        .await?
        .into_iter()
        .map(EnhancementRead::from)
        .collect();

    Ok(Json(NotationWithEnhancements {
        notation,
        ai_enhancements,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/ai/status",
    tag = "enrichment",
    responses((status = 200, description = "LLM integration status", body = AiStatus))
)]
pub async fn ai_status(State(state): State<Arc<AppState>>, _auth: AuthUser) -> impl IntoResponse {
    Json(state.insights.status())
}
