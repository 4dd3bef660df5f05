use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use leasora_application::PermissionOverrideRepository;
use leasora_core::{AppError, AppResult};
use leasora_domain::{PermissionId, UserId};

/// PostgreSQL-backed override store.
///
/// Both operations are idempotent at the store level: an `add` for a present
/// row and a `remove` for an absent row both succeed.
#[derive(Clone)]
pub struct PostgresPermissionOverrideRepository {
    pool: PgPool,
}

impl PostgresPermissionOverrideRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionOverrideRepository for PostgresPermissionOverrideRepository {
    async fn apply_override(&self, user_id: UserId, permission_id: PermissionId) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permission_overrides (user_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, permission_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to apply override: {error}")))?;

        debug!(%user_id, %permission_id, "applied permission override");
        Ok(())
    }

    async fn remove_override(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM permission_overrides
            WHERE user_id = $1 AND permission_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove override: {error}")))?;

        debug!(%user_id, %permission_id, "removed permission override");
        Ok(())
    }
}
