use crate::auth::jwt::decode_token;
use crate::auth::models::AuthUser;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use drumnote_core::models::UserRead;
use drumnote_core::AppError;
use std::sync::Arc;

const CREDENTIALS_ERROR: &str = "Could not validate credentials";

fn unauthorized() -> Response {
    HttpAppError(AppError::Unauthorized(CREDENTIALS_ERROR.to_string())).into_response()
}

/// Resolve the bearer token into an [`AuthUser`] or short-circuit with 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            tracing::debug!("Missing authorization header");
            return unauthorized();
        }
    };

    let token = match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => token.trim(),
        _ => {
            tracing::debug!("Authorization header is not a bearer token");
            return unauthorized();
        }
    };

    let claims = match decode_token(token, &state.security.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => return unauthorized(),
    };

    let user = match state.db.user_repository.get_by_id(claims.sub, false).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!(user_id = %claims.sub, "Token subject not found");
            return unauthorized();
        }
        Err(e) => return HttpAppError(e).into_response(),
    };

    if !user.is_active {
        return HttpAppError(AppError::BadRequest("Inactive user".to_string())).into_response();
    }

    let roles = match state.db.role_repository.roles_for_user(user.id).await {
        Ok(roles) => roles,
        Err(e) => return HttpAppError(e).into_response(),
    };

    tracing::debug!(user_id = %user.id, "Request authenticated");
    request.extensions_mut().insert(AuthUser {
        user: UserRead::from_user(user, roles),
    });

    next.run(request).await
}
