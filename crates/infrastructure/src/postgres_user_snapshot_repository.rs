use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use leasora_application::{UserGrants, UserSnapshotRepository};
use leasora_core::{AppError, AppResult};
use leasora_domain::{PermissionCode, Role, RoleId, UserId};

/// PostgreSQL-backed repository for per-user grant snapshots.
#[derive(Clone)]
pub struct PostgresUserSnapshotRepository {
    pool: PgPool,
}

impl PostgresUserSnapshotRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssignedRoleRow {
    role_id: uuid::Uuid,
    role_name: String,
    permission_code: Option<String>,
}

#[derive(Debug, FromRow)]
struct OverrideRow {
    permission_code: String,
}

#[async_trait]
impl UserSnapshotRepository for PostgresUserSnapshotRepository {
    async fn fetch_user_grants(&self, user_id: UserId) -> AppResult<UserGrants> {
        let role_rows = sqlx::query_as::<_, AssignedRoleRow>(
            r#"
            SELECT
                roles.id AS role_id,
                roles.name AS role_name,
                grants.permission_code
            FROM user_roles
            INNER JOIN roles
                ON roles.id = user_roles.role_id
            LEFT JOIN role_grants AS grants
                ON grants.role_id = roles.id
            WHERE user_roles.user_id = $1
            ORDER BY user_roles.assigned_at, roles.id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load assigned roles: {error}"))
        })?;

        let override_rows = sqlx::query_as::<_, OverrideRow>(
            r#"
            SELECT permissions.code AS permission_code
            FROM permission_overrides
            INNER JOIN permissions
                ON permissions.id = permission_overrides.permission_id
            WHERE permission_overrides.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load overrides: {error}")))?;

        let roles = aggregate_assigned_roles(role_rows)?;

        let override_codes = override_rows
            .into_iter()
            .map(|row| {
                PermissionCode::new(row.permission_code.as_str()).map_err(|error| {
                    AppError::Internal(format!(
                        "failed to decode override code '{}': {error}",
                        row.permission_code
                    ))
                })
            })
            .collect::<AppResult<BTreeSet<PermissionCode>>>()?;

        Ok(UserGrants {
            roles,
            override_codes,
        })
    }
}

fn aggregate_assigned_roles(rows: Vec<AssignedRoleRow>) -> AppResult<Vec<Role>> {
    // Assignment order must survive aggregation; rows arrive sorted by it.
    let mut order: Vec<uuid::Uuid> = Vec::new();
    let mut names: BTreeMap<uuid::Uuid, String> = BTreeMap::new();
    let mut codes: BTreeMap<uuid::Uuid, BTreeSet<PermissionCode>> = BTreeMap::new();

    for row in rows {
        if !names.contains_key(&row.role_id) {
            order.push(row.role_id);
            names.insert(row.role_id, row.role_name);
            codes.insert(row.role_id, BTreeSet::new());
        }

        if let Some(raw_code) = row.permission_code {
            let decoded = PermissionCode::new(raw_code.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "failed to decode role grant '{raw_code}': {error}"
                ))
            })?;
            codes.entry(row.role_id).or_default().insert(decoded);
        }
    }

    order
        .into_iter()
        .map(|role_id| {
            let name = names.remove(&role_id).unwrap_or_default();
            let granted = codes.remove(&role_id).unwrap_or_default();
            Role::new(RoleId::from_uuid(role_id), name, granted)
                .map_err(|error| AppError::Internal(format!("failed to decode role row: {error}")))
        })
        .collect()
}
