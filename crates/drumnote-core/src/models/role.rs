use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Row of the `user_roles` join table
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RoleCreate {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Role name must be between 1 and 50 characters"
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Description must be at most 255 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RoleUpdate {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 50,
        message = "Role name must be between 1 and 50 characters"
    ))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255, message = "Description must be at most 255 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleCount {
    pub total_roles: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleRemoval {
    pub message: String,
    /// False when the user did not hold the role.
    pub removed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleCheck {
    pub user_id: Uuid,
    pub role_name: String,
    pub has_role: bool,
}
