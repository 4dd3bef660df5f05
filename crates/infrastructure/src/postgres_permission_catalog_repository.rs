use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use leasora_application::PermissionCatalogRepository;
use leasora_core::{AppError, AppResult};
use leasora_domain::{Permission, PermissionCode, PermissionId, Role, RoleId};

/// PostgreSQL-backed repository for the permission and role catalogs.
#[derive(Clone)]
pub struct PostgresPermissionCatalogRepository {
    pool: PgPool,
}

impl PostgresPermissionCatalogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    code: String,
    description: String,
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role_id: uuid::Uuid,
    role_name: String,
    permission_code: Option<String>,
}

#[async_trait]
impl PermissionCatalogRepository for PostgresPermissionCatalogRepository {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, code, description
            FROM permissions
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        rows.into_iter()
            .map(|row| {
                Permission::new(PermissionId::from_uuid(row.id), row.code, row.description)
                    .map_err(|error| {
                        AppError::Internal(format!("failed to decode permission row: {error}"))
                    })
            })
            .collect()
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT
                roles.id AS role_id,
                roles.name AS role_name,
                grants.permission_code
            FROM roles
            LEFT JOIN role_grants AS grants
                ON grants.role_id = roles.id
            ORDER BY roles.name, grants.permission_code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        aggregate_roles(rows)
    }
}

fn aggregate_roles(rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
    let mut ordered: Vec<(uuid::Uuid, String, BTreeSet<PermissionCode>)> = Vec::new();

    for row in rows {
        if ordered.last().is_none_or(|(id, _, _)| id != &row.role_id) {
            ordered.push((row.role_id, row.role_name.clone(), BTreeSet::new()));
        }

        if let Some(raw_code) = row.permission_code {
            let decoded = PermissionCode::new(raw_code.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "failed to decode role grant '{raw_code}': {error}"
                ))
            })?;
            if let Some((_, _, codes)) = ordered.last_mut() {
                codes.insert(decoded);
            }
        }
    }

    ordered
        .into_iter()
        .map(|(role_id, name, codes)| {
            Role::new(RoleId::from_uuid(role_id), name, codes)
                .map_err(|error| AppError::Internal(format!("failed to decode role row: {error}")))
        })
        .collect()
}
