use drumnote_core::{
    models::{Role, User, UserRole},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "roles", db.operation = "insert"))]
    pub async fn create(&self, name: &str, description: Option<&str>) -> Result<Role, AppError> {
        let role = sqlx::query_as::<Postgres, Role>(
            r#"
            INSERT INTO roles (id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create role");
            AppError::Database(e)
        })?;

        tracing::info!(role_id = %role.id, name = %role.name, "Role created");
        Ok(role)
    }

    #[tracing::instrument(skip(self), fields(db.table = "roles", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<Postgres, Role>(
            "SELECT * FROM roles WHERE id = $1 AND ($2 OR deleted_at IS NULL)",
        )
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    #[tracing::instrument(skip(self), fields(db.table = "roles", db.operation = "select"))]
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<Postgres, Role>(
            "SELECT * FROM roles WHERE name = $1 AND deleted_at IS NULL",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    #[tracing::instrument(skip(self), fields(db.table = "roles", db.operation = "select"))]
    pub async fn list(
        &self,
        skip: i64,
        limit: i64,
        include_deleted: bool,
    ) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<Postgres, Role>(
            r#"
            SELECT * FROM roles
            WHERE ($1 OR deleted_at IS NULL)
            ORDER BY name ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(include_deleted)
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    #[tracing::instrument(skip(self), fields(db.table = "roles", db.operation = "select"))]
    pub async fn count(&self, include_deleted: bool) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM roles WHERE ($1 OR deleted_at IS NULL)",
        )
        .bind(include_deleted)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Whether a role other than `exclude_role_id` already uses `name` (soft-deleted roles included)
    #[tracing::instrument(skip(self), fields(db.table = "roles", db.operation = "select"))]
    pub async fn name_exists(
        &self,
        name: &str,
        exclude_role_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude_role_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[tracing::instrument(skip(self), fields(db.table = "roles", db.operation = "update", db.record_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<Postgres, Role>(
            r#"
            UPDATE roles
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    #[tracing::instrument(skip(self), fields(db.table = "roles", db.operation = "update", db.record_id = %id))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE roles SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "roles", db.operation = "delete", db.record_id = %id))]
    pub async fn hard_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "roles", db.operation = "update", db.record_id = %id))]
    pub async fn restore(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<Postgres, Role>(
            r#"
            UPDATE roles SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NOT NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    /// Grant a role. An existing assignment is returned unchanged.
    #[tracing::instrument(skip(self), fields(db.table = "user_roles", db.operation = "insert"))]
    pub async fn assign(&self, user_id: Uuid, role_id: Uuid) -> Result<UserRole, AppError> {
        let inserted = sqlx::query_as::<Postgres, UserRole>(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role_id) DO NOTHING
            RETURNING user_id, role_id, assigned_at
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(assignment) = inserted {
            tracing::info!(user_id = %user_id, role_id = %role_id, "Role assigned");
            return Ok(assignment);
        }

        let existing = sqlx::query_as::<Postgres, UserRole>(
            "SELECT user_id, role_id, assigned_at FROM user_roles WHERE user_id = $1 AND role_id = $2",
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(existing)
    }

    /// Revoke a role. Returns false when the user did not hold it.
    #[tracing::instrument(skip(self), fields(db.table = "user_roles", db.operation = "delete"))]
    pub async fn remove(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_roles", db.operation = "select"))]
    pub async fn users_with_role(&self, role_id: Uuid) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<Postgres, User>(
            r#"
            SELECT u.* FROM users u
            JOIN user_roles ur ON ur.user_id = u.id
            WHERE ur.role_id = $1 AND u.deleted_at IS NULL
            ORDER BY u.email ASC
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_roles", db.operation = "select"))]
    pub async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<Postgres, Role>(
            r#"
            SELECT r.* FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1 AND r.deleted_at IS NULL
            ORDER BY r.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_roles", db.operation = "select"))]
    pub async fn user_has_role(&self, user_id: Uuid, role_name: &str) -> Result<bool, AppError> {
        let has_role = sqlx::query_scalar::<Postgres, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_roles ur
                JOIN roles r ON r.id = ur.role_id
                WHERE ur.user_id = $1 AND r.name = $2 AND r.deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(role_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(has_role)
    }
}
