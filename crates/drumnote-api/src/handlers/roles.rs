//! Role management and user-role assignment.

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::accounts::user_read;
use crate::state::{AppState, DbState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use drumnote_core::models::{
    CountQuery, ListQuery, MessageResponse, Role, RoleCheck, RoleCount, RoleCreate, RoleRemoval,
    RoleUpdate, UserRead, UserRole,
};
use drumnote_core::AppError;
use drumnote_db::map_unique_violation;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const ROLE_NOT_FOUND: &str = "Role not found";
const ROLE_NAME_TAKEN: &str = "Role name already exists";

async fn live_role(db: &DbState, role_id: Uuid) -> Result<Role, AppError> {
    db.role_repository
        .get_by_id(role_id, false)
        .await?
        .ok_or_else(|| AppError::NotFound(ROLE_NOT_FOUND.to_string()))
}

async fn ensure_live_user(db: &DbState, user_id: Uuid) -> Result<(), AppError> {
    db.user_repository
        .get_by_id(user_id, false)
        .await?
        .map(drop)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/v1/roles",
    tag = "roles",
    request_body = RoleCreate,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 400, description = "Invalid input or duplicate name", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), operation = "create_role"))]
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<RoleCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;
    payload.validate()?;

    let repo = &state.db.role_repository;
    if repo.name_exists(&payload.name, None).await? {
        return Err(AppError::BadRequest(ROLE_NAME_TAKEN.to_string()).into());
    }

    let role = repo
        .create(&payload.name, payload.description.as_deref())
        .await
        .map_err(|e| map_unique_violation(e, ROLE_NAME_TAKEN))?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    tag = "roles",
    params(
        ("skip" = Option<i64>, Query, description = "Rows to skip"),
        ("limit" = Option<i64>, Query, description = "Page size (1-1000, default 100)"),
        ("include_deleted" = Option<bool>, Query, description = "Include soft-deleted roles")
    ),
    responses((status = 200, description = "Roles", body = Vec<Role>))
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), operation = "list_roles"))]
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (skip, limit) = query.bounds()?;
    let roles = state
        .db
        .role_repository
        .list(skip, limit, query.include_deleted)
        .await?;
    Ok(Json(roles))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/count",
    tag = "roles",
    params(("include_deleted" = Option<bool>, Query, description = "Include soft-deleted roles")),
    responses((status = 200, description = "Role count", body = RoleCount))
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), operation = "count_roles"))]
pub async fn count_roles(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<CountQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let total_roles = state.db.role_repository.count(query.include_deleted).await?;
    Ok(Json(RoleCount { total_roles }))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role found", body = Role),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), role_id = %id, operation = "get_role"))]
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(live_role(&state.db, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/name/{name}",
    tag = "roles",
    params(("name" = String, Path, description = "Role name")),
    responses(
        (status = 200, description = "Role found", body = Role),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "get_role_by_name"))]
pub async fn get_role_by_name(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let role = state
        .db
        .role_repository
        .get_by_name(&name)
        .await?
        .ok_or_else(|| AppError::NotFound(ROLE_NOT_FOUND.to_string()))?;
    Ok(Json(role))
}

#[utoipa::path(
    put,
    path = "/api/v1/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = RoleUpdate,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 400, description = "Invalid input or duplicate name", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), role_id = %id, operation = "update_role"))]
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RoleUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;
    payload.validate()?;

    let repo = &state.db.role_repository;
    if let Some(ref name) = payload.name {
        if repo.name_exists(name, Some(id)).await? {
            return Err(AppError::BadRequest(ROLE_NAME_TAKEN.to_string()).into());
        }
    }

    let role = repo
        .update(id, payload.name.as_deref(), payload.description.as_deref())
        .await
        .map_err(|e| map_unique_violation(e, ROLE_NAME_TAKEN))?
        .ok_or_else(|| AppError::NotFound(ROLE_NOT_FOUND.to_string()))?;
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role soft-deleted", body = MessageResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), role_id = %id, operation = "delete_role"))]
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;
    if !state.db.role_repository.soft_delete(id).await? {
        return Err(AppError::NotFound(ROLE_NOT_FOUND.to_string()).into());
    }
    Ok(Json(MessageResponse::new("Role deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/api/v1/roles/{id}/restore",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role restored", body = Role),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Role not found or not deleted", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), role_id = %id, operation = "restore_role"))]
pub async fn restore_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;
    let role = state
        .db
        .role_repository
        .restore(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Role not found or not deleted".to_string()))?;
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}/permanent",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role permanently deleted", body = MessageResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), role_id = %id, operation = "hard_delete_role"))]
pub async fn hard_delete_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;
    if !state.db.role_repository.hard_delete(id).await? {
        return Err(AppError::NotFound(ROLE_NOT_FOUND.to_string()).into());
    }
    Ok(Json(MessageResponse::new("Role permanently deleted")))
}

#[utoipa::path(
    post,
    path = "/api/v1/roles/{role_id}/users/{user_id}",
    tag = "roles",
    params(
        ("role_id" = Uuid, Path, description = "Role ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Role assigned (or already held)", body = UserRole),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Role or user not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "assign_role"))]
pub async fn assign_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((role_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;
    live_role(&state.db, role_id).await?;
    ensure_live_user(&state.db, user_id).await?;

    let assignment = state.db.role_repository.assign(user_id, role_id).await?;
    Ok(Json(assignment))
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{role_id}/users/{user_id}",
    tag = "roles",
    params(
        ("role_id" = Uuid, Path, description = "Role ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Assignment removed, or was not present", body = RoleRemoval),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), operation = "remove_role"))]
pub async fn remove_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((role_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;

    let removed = state.db.role_repository.remove(user_id, role_id).await?;
    let message = if removed {
        "Role removed from user"
    } else {
        "User did not have this role"
    };
    Ok(Json(RoleRemoval {
        message: message.to_string(),
        removed,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}/users",
    tag = "roles",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Users holding the role, by email", body = Vec<UserRead>),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), role_id = %id, operation = "users_with_role"))]
pub async fn users_with_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    live_role(&state.db, id).await?;

    let users = state.db.role_repository.users_with_role(id).await?;
    let mut responses = Vec::with_capacity(users.len());
    for user in users {
        responses.push(user_read(&state.db, user).await?);
    }
    Ok(Json(responses))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/users/{user_id}",
    tag = "roles",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Roles of the user, by name", body = Vec<Role>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), target_user_id = %user_id, operation = "roles_for_user"))]
pub async fn roles_for_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    ensure_live_user(&state.db, user_id).await?;
    let roles = state.db.role_repository.roles_for_user(user_id).await?;
    Ok(Json(roles))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/users/{user_id}/check/{role_name}",
    tag = "roles",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("role_name" = String, Path, description = "Role name")
    ),
    responses((status = 200, description = "Whether the user holds the role", body = RoleCheck))
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), target_user_id = %user_id, operation = "check_role"))]
pub async fn check_user_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((user_id, role_name)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let has_role = state
        .db
        .role_repository
        .user_has_role(user_id, &role_name)
        .await?;
    Ok(Json(RoleCheck {
        user_id,
        role_name,
        has_role,
    }))
}
