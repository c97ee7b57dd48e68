use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::ownership::{owned_notation, owned_video};
use crate::state::AppState;
use crate::utils::download::content_disposition;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use drumnote_core::models::{
    ExportFormat, ExportQuery, Notation, NotationCreate, NotationDetail, NotationFromEvents,
    NotationList, NotationListQuery, NotationStats, NotationUpdate, NotationValidationReport,
    TimelineQuery,
};
use drumnote_core::notation::{
    build_notation, export_document, export_filename, filter_timeline, validate_notation,
    NotationOptions,
};
use drumnote_core::AppError;
use drumnote_db::NewNotation;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

const NOTATION_NOT_FOUND: &str = "Notation not found";

#[utoipa::path(
    post,
    path = "/api/v1/notations",
    tag = "notations",
    request_body = NotationCreate,
    responses(
        (status = 201, description = "Notation stored", body = Notation),
        (status = 400, description = "Invalid tempo, time signature or confidence", body = ErrorResponse),
        (status = 403, description = "Not the owner of the video", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), video_id = %payload.video_id, operation = "create_notation"))]
pub async fn create_notation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<NotationCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    payload.validate()?;
    owned_video(&state.db, &auth, payload.video_id, "create notation for this video").await?;

    let notation = state
        .db
        .notation_repository
        .create(NewNotation {
            video_id: payload.video_id,
            tempo: payload.tempo,
            time_signature: payload.time_signature,
            notation_json: payload.notation_json,
            model_version: payload.model_version,
            confidence_score: payload.confidence_score,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(notation)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notations/from-events",
    tag = "notations",
    request_body = NotationFromEvents,
    responses(
        (status = 201, description = "Notation built from drum events", body = Notation),
        (status = 400, description = "No events or invalid event values", body = ErrorResponse),
        (status = 403, description = "Not the owner of the video", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), video_id = %payload.video_id, events = payload.events.len(), operation = "create_notation_from_events"))]
pub async fn create_notation_from_events(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<NotationFromEvents>,
) -> Result<impl IntoResponse, HttpAppError> {
    payload.validate()?;
    owned_video(&state.db, &auth, payload.video_id, "create notation for this video").await?;

    let options = NotationOptions {
        tempo: payload.tempo,
        time_signature: payload.time_signature.clone(),
        quantization_level: payload.quantization_level.clone(),
    };
    let built = build_notation(&payload.events, &options, Utc::now())?;

    let notation = state
        .db
        .notation_repository
        .create(NewNotation {
            video_id: payload.video_id,
            tempo: Some(built.tempo),
            time_signature: Some(built.time_signature),
            notation_json: built.notation_json,
            model_version: payload.model_version.clone(),
            confidence_score: payload.mean_confidence(),
        })
        .await?;

    tracing::info!(notation_id = %notation.id, tempo = built.tempo, "Notation built from events");
    Ok((StatusCode::CREATED, Json(notation)))
}

#[utoipa::path(
    get,
    path = "/api/v1/notations",
    tag = "notations",
    params(
        ("video_id" = Option<Uuid>, Query, description = "Only notations of this video"),
        ("tempo_min" = Option<i32>, Query, description = "Minimum tempo"),
        ("tempo_max" = Option<i32>, Query, description = "Maximum tempo"),
        ("time_signature" = Option<String>, Query, description = "Exact time signature"),
        ("limit" = Option<i64>, Query, description = "Page size (1-100, default 50)"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Page of the caller's notations", body = NotationList),
        (status = 400, description = "Invalid filters", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), operation = "list_notations"))]
pub async fn list_notations(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<NotationListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    query.validate()?;

    let (notations, total) = state
        .db
        .notation_repository
        .list_for_user(auth.id(), &query)
        .await?;

    Ok(Json(NotationList::new(
        notations,
        total,
        query.limit(),
        query.offset(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/notations/{id}",
    tag = "notations",
    params(("id" = Uuid, Path, description = "Notation ID")),
    responses(
        (status = 200, description = "Notation with measures and metadata", body = NotationDetail),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Notation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), notation_id = %id, operation = "get_notation"))]
pub async fn get_notation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let notation = owned_notation(&state.db, &auth, id, false).await?;
    Ok(Json(NotationDetail::from(notation)))
}

#[utoipa::path(
    put,
    path = "/api/v1/notations/{id}",
    tag = "notations",
    params(("id" = Uuid, Path, description = "Notation ID")),
    request_body = NotationUpdate,
    responses(
        (status = 200, description = "Notation updated", body = Notation),
        (status = 400, description = "Invalid tempo or time signature", body = ErrorResponse),
        (status = 404, description = "Notation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), notation_id = %id, operation = "update_notation"))]
pub async fn update_notation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<NotationUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    payload.validate()?;
    owned_notation(&state.db, &auth, id, false).await?;

    let notation = state
        .db
        .notation_repository
        .update(
            id,
            payload.tempo,
            payload.time_signature.as_deref(),
            payload.notation_json.as_ref(),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(NOTATION_NOT_FOUND.to_string()))?;

    Ok(Json(notation))
}

#[utoipa::path(
    delete,
    path = "/api/v1/notations/{id}",
    tag = "notations",
    params(("id" = Uuid, Path, description = "Notation ID")),
    responses(
        (status = 204, description = "Notation soft-deleted"),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Notation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), notation_id = %id, operation = "delete_notation"))]
pub async fn delete_notation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    owned_notation(&state.db, &auth, id, false).await?;
    if !state.db.notation_repository.soft_delete(id).await? {
        return Err(AppError::NotFound(NOTATION_NOT_FOUND.to_string()).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/notations/{id}/restore",
    tag = "notations",
    params(("id" = Uuid, Path, description = "Notation ID")),
    responses(
        (status = 200, description = "Notation restored", body = Notation),
        (status = 404, description = "Notation not found or not deleted", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), notation_id = %id, operation = "restore_notation"))]
pub async fn restore_notation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    owned_notation(&state.db, &auth, id, true).await?;

    let notation = state
        .db
        .notation_repository
        .restore(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Notation not found or not deleted".to_string()))?;

    Ok(Json(notation))
}

#[utoipa::path(
    get,
    path = "/api/v1/notations/{id}/timeline",
    tag = "notations",
    params(
        ("id" = Uuid, Path, description = "Notation ID"),
        ("start_time" = Option<f64>, Query, description = "Earliest timestamp in seconds"),
        ("end_time" = Option<f64>, Query, description = "Latest timestamp in seconds")
    ),
    responses(
        (status = 200, description = "Timeline entries in range", content_type = "application/json"),
        (status = 400, description = "start_time after end_time", body = ErrorResponse),
        (status = 404, description = "Notation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), notation_id = %id, operation = "notation_timeline"))]
pub async fn notation_timeline(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<TimelineQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    if let (Some(start), Some(end)) = (query.start_time, query.end_time) {
        if start > end {
            return Err(
                AppError::InvalidInput("start_time must not be after end_time".to_string()).into(),
            );
        }
    }

    let notation = owned_notation(&state.db, &auth, id, false).await?;
    let entries: Vec<JsonValue> =
        filter_timeline(notation.timeline(), query.start_time, query.end_time);
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/api/v1/notations/{id}/export",
    tag = "notations",
    params(
        ("id" = Uuid, Path, description = "Notation ID"),
        ("format_type" = Option<String>, Query, description = "json (default); musicxml and midi are not available yet")
    ),
    responses(
        (status = 200, description = "Notation export file", content_type = "application/json"),
        (status = 400, description = "Unsupported export format", body = ErrorResponse),
        (status = 404, description = "Notation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), notation_id = %id, operation = "export_notation"))]
pub async fn export_notation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let format: ExportFormat = query.format_type.parse()?;
    let notation = owned_notation(&state.db, &auth, id, false).await?;

    match format {
        ExportFormat::Json => {
            let disposition = content_disposition(&export_filename(&notation));
            let document = export_document(&notation, Utc::now());
            Ok((
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                Json(document),
            ))
        }
        ExportFormat::MusicXml | ExportFormat::Midi => Err(AppError::InvalidInput(format!(
            "Export format '{}' is not supported yet",
            query.format_type
        ))
        .into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/notations/{id}/validate",
    tag = "notations",
    params(("id" = Uuid, Path, description = "Notation ID")),
    responses(
        (status = 200, description = "Validation report", body = NotationValidationReport),
        (status = 404, description = "Notation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), notation_id = %id, operation = "validate_notation"))]
pub async fn validate_stored_notation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let notation = owned_notation(&state.db, &auth, id, false).await?;
    Ok(Json(validate_notation(&notation)))
}

#[utoipa::path(
    get,
    path = "/api/v1/notations/stats/overview",
    tag = "notations",
    responses((status = 200, description = "Statistics across the caller's notations", body = NotationStats))
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "notation_stats"))]
pub async fn notation_stats(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let stats = state.db.notation_repository.stats_for_user(auth.id()).await?;
    Ok(Json(stats))
}
