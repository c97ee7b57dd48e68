//! Account creation shared by registration and the admin user endpoints.

use drumnote_core::constants::ADMIN_ROLE;
use drumnote_core::models::{User, UserCreate, UserRead};
use drumnote_core::AppError;
use drumnote_db::map_unique_violation;
use validator::Validate;

use crate::auth::password::hash_password;
use crate::constants::ADMIN_ROLE_DESCRIPTION;
use crate::state::{AppState, DbState};

pub const EMAIL_TAKEN: &str = "Email already registered";

/// Attach the user's live roles.
pub async fn user_read(db: &DbState, user: User) -> Result<UserRead, AppError> {
    let roles = db.role_repository.roles_for_user(user.id).await?;
    Ok(UserRead::from_user(user, roles))
}

/// Create an account. Emails listed as admin emails get the admin role in the same
/// transaction, creating the role if needed.
#[tracing::instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn create_account(state: &AppState, payload: &UserCreate) -> Result<UserRead, AppError> {
    payload.validate()?;

    let db = &state.db;
    if db.user_repository.email_exists(&payload.email, None).await? {
        return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let bootstrap = state
        .security
        .is_admin_email(&payload.email)
        .then_some((ADMIN_ROLE, ADMIN_ROLE_DESCRIPTION));

    let user = db
        .user_repository
        .create(&payload.email, &password_hash, bootstrap)
        .await
        .map_err(|e| map_unique_violation(e, EMAIL_TAKEN))?;

    user_read(db, user).await
}
