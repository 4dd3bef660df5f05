use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use leasora_application::{OverrideAuditEntry, OverrideAuditEvent, OverrideAuditRepository};
use leasora_core::{AppError, AppResult};
use leasora_domain::UserId;

/// PostgreSQL-backed repository for the override audit trail.
#[derive(Clone)]
pub struct PostgresOverrideAuditRepository {
    pool: PgPool,
}

impl PostgresOverrideAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditRow {
    event_id: uuid::Uuid,
    user_id: uuid::Uuid,
    permission_code: String,
    action: String,
    detail: Option<String>,
    created_at: String,
}

#[async_trait]
impl OverrideAuditRepository for PostgresOverrideAuditRepository {
    async fn append_event(&self, event: OverrideAuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO override_audit_events
                (user_id, permission_id, permission_code, action, detail)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.user_id.as_uuid())
        .bind(event.permission_id.as_uuid())
        .bind(event.permission_code)
        .bind(event.action.as_str())
        .bind(event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        Ok(())
    }

    async fn list_recent_events(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<OverrideAuditEntry>> {
        let capped_limit = limit.clamp(1, 200) as i64;
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT
                id AS event_id,
                user_id,
                permission_code,
                action,
                detail,
                to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
            FROM override_audit_events
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(capped_limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit events: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|row| OverrideAuditEntry {
                event_id: row.event_id.to_string(),
                user_id: UserId::from_uuid(row.user_id),
                permission_code: row.permission_code,
                action: row.action,
                detail: row.detail,
                created_at: row.created_at,
            })
            .collect())
    }
}
