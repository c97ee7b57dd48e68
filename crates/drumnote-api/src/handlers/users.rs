//! User account endpoints. Reads and edits are allowed for the account owner or an
//! admin; listing, restore and hard delete are admin-only.

use crate::auth::password::{hash_password, verify_password};
use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::accounts::{create_account, user_read, EMAIL_TAKEN};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use drumnote_core::models::{
    CountQuery, ListQuery, MessageResponse, PasswordChange, UserCount, UserCreate, UserRead,
    UserUpdate,
};
use drumnote_core::AppError;
use drumnote_db::map_unique_violation;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const USER_NOT_FOUND: &str = "User not found";

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user", body = UserRead),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(auth), fields(user_id = %auth.id(), operation = "get_me"))]
pub async fn get_me(auth: AuthUser) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(auth.user))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/me/password",
    tag = "users",
    request_body = PasswordChange,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Incorrect current password", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), operation = "change_password"))]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<PasswordChange>,
) -> Result<impl IntoResponse, HttpAppError> {
    payload.validate()?;

    let repo = &state.db.user_repository;
    let user = repo
        .get_by_id(auth.id(), false)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        return Err(AppError::BadRequest("Incorrect current password".to_string()).into());
    }

    let password_hash = hash_password(&payload.new_password)?;
    repo.update(user.id, None, Some(&password_hash))
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserRead),
        (status = 400, description = "Invalid input or email already registered", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), operation = "create_user"))]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<UserCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;
    let user = create_account(&state, &payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(
        ("skip" = Option<i64>, Query, description = "Rows to skip"),
        ("limit" = Option<i64>, Query, description = "Page size (1-1000, default 100)"),
        ("include_deleted" = Option<bool>, Query, description = "Include soft-deleted users")
    ),
    responses(
        (status = 200, description = "Users, newest first", body = Vec<UserRead>),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), operation = "list_users"))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;
    let (skip, limit) = query.bounds()?;

    let users = state
        .db
        .user_repository
        .list(skip, limit, query.include_deleted)
        .await?;

    let mut responses = Vec::with_capacity(users.len());
    for user in users {
        responses.push(user_read(&state.db, user).await?);
    }

    Ok(Json(responses))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/count",
    tag = "users",
    params(("include_deleted" = Option<bool>, Query, description = "Include soft-deleted users")),
    responses(
        (status = 200, description = "User count", body = UserCount),
        (status = 403, description = "Admin access required", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(user_id = %auth.id(), operation = "count_users"))]
pub async fn count_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<CountQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;
    let total_users = state.db.user_repository.count(query.include_deleted).await?;
    Ok(Json(UserCount { total_users }))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserRead),
        (status = 403, description = "Not authorized to access this user", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), target_user_id = %id, operation = "get_user"))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_self_or_admin(id)?;

    let user = state
        .db
        .user_repository
        .get_by_id(id, false)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    Ok(Json(user_read(&state.db, user).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "User updated", body = UserRead),
        (status = 400, description = "Invalid input or email already registered", body = ErrorResponse),
        (status = 403, description = "Not authorized to access this user", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(user_id = %auth.id(), target_user_id = %id, operation = "update_user"))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UserUpdate>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_self_or_admin(id)?;
    payload.validate()?;

    let repo = &state.db.user_repository;
    if let Some(ref email) = payload.email {
        if repo.email_exists(email, Some(id)).await? {
            return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()).into());
        }
    }

    let password_hash = payload
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;

    let user = repo
        .update(id, payload.email.as_deref(), password_hash.as_deref())
        .await
        .map_err(|e| map_unique_violation(e, EMAIL_TAKEN))?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    Ok(Json(user_read(&state.db, user).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User soft-deleted", body = MessageResponse),
        (status = 403, description = "Not authorized to access this user", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), target_user_id = %id, operation = "delete_user"))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_self_or_admin(id)?;

    if !state.db.user_repository.soft_delete(id).await? {
        return Err(AppError::NotFound(USER_NOT_FOUND.to_string()).into());
    }
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/restore",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User restored", body = UserRead),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "User not found or not deleted", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), target_user_id = %id, operation = "restore_user"))]
pub async fn restore_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;

    let user = state
        .db
        .user_repository
        .restore(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found or not deleted".to_string()))?;

    Ok(Json(user_read(&state.db, user).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}/permanent",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User permanently deleted", body = MessageResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %auth.id(), target_user_id = %id, operation = "hard_delete_user"))]
pub async fn hard_delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    auth.require_admin()?;

    if !state.db.user_repository.hard_delete(id).await? {
        return Err(AppError::NotFound(USER_NOT_FOUND.to_string()).into());
    }
    Ok(Json(MessageResponse::new("User permanently deleted")))
}
