use crate::auth::jwt::{encode_token, Claims};
use crate::auth::password::verify_password;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::accounts::create_account;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use drumnote_core::models::{LoginRequest, Token, UserCreate, UserRead};
use drumnote_core::AppError;
use std::sync::Arc;
use validator::Validate;

const BAD_CREDENTIALS: &str = "Incorrect email or password";

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User registered", body = UserRead),
        (status = 400, description = "Invalid input or email already registered", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(operation = "register"))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<UserCreate>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = create_account(&state, &payload).await?;
    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token issued", body = Token),
        (status = 400, description = "Inactive user", body = ErrorResponse),
        (status = 401, description = "Incorrect email or password", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(operation = "login"))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    payload.validate()?;

    let user = state
        .db
        .user_repository
        .get_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Password mismatch");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()).into());
    }
    if !user.is_active {
        return Err(AppError::BadRequest("Inactive user".to_string()).into());
    }

    let expiry_hours = state.security.jwt_expiry_hours;
    let claims = Claims::new(user.id, &user.email, expiry_hours, Utc::now());
    let token = encode_token(&claims, &state.security.jwt_secret)?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(Token::bearer(token, expiry_hours * 3600)))
}
