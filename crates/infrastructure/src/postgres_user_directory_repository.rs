use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use leasora_application::UserDirectoryRepository;
use leasora_core::{AppError, AppResult};
use leasora_domain::{RoleId, UserAccount, UserId};

/// PostgreSQL-backed user directory for the administration console.
#[derive(Clone)]
pub struct PostgresUserDirectoryRepository {
    pool: PgPool,
}

impl PostgresUserDirectoryRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: uuid::Uuid,
    user_name: String,
    role_id: Option<uuid::Uuid>,
}

#[async_trait]
impl UserDirectoryRepository for PostgresUserDirectoryRepository {
    async fn list_users(&self) -> AppResult<Vec<UserAccount>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                users.id AS user_id,
                users.name AS user_name,
                user_roles.role_id
            FROM users
            LEFT JOIN user_roles
                ON user_roles.user_id = users.id
            ORDER BY users.name, users.id, user_roles.assigned_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list users: {error}")))?;

        aggregate_users(rows)
    }

    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                users.id AS user_id,
                users.name AS user_name,
                user_roles.role_id
            FROM users
            LEFT JOIN user_roles
                ON user_roles.user_id = users.id
            WHERE users.id = $1
            ORDER BY user_roles.assigned_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user: {error}")))?;

        Ok(aggregate_users(rows)?.into_iter().next())
    }
}

fn aggregate_users(rows: Vec<UserRow>) -> AppResult<Vec<UserAccount>> {
    let mut ordered: Vec<(uuid::Uuid, String, Vec<RoleId>)> = Vec::new();

    for row in rows {
        if ordered.last().is_none_or(|(id, _, _)| id != &row.user_id) {
            ordered.push((row.user_id, row.user_name.clone(), Vec::new()));
        }

        if let (Some(role_id), Some((_, _, role_ids))) = (row.role_id, ordered.last_mut()) {
            role_ids.push(RoleId::from_uuid(role_id));
        }
    }

    ordered
        .into_iter()
        .map(|(user_id, name, role_ids)| {
            UserAccount::new(UserId::from_uuid(user_id), name, role_ids)
                .map_err(|error| AppError::Internal(format!("failed to decode user row: {error}")))
        })
        .collect()
}
