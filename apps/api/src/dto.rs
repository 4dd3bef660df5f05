//! JSON payloads exchanged with the administration console frontend.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use leasora_domain::{
    Permission, PermissionSource, Role, SourcedPermission, UserAccount, group_by_category,
};

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: &'static str,
}

/// API representation of a catalog permission.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/permission-response.ts"
)]
pub struct PermissionResponse {
    pub permission_id: String,
    pub code: String,
    pub description: String,
    pub category: String,
}

impl From<Permission> for PermissionResponse {
    fn from(value: Permission) -> Self {
        Self {
            permission_id: value.id().to_string(),
            code: value.code().as_str().to_owned(),
            description: value.description().to_owned(),
            category: value.category(),
        }
    }
}

/// One category group of catalog permissions.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/permission-category-response.ts"
)]
pub struct PermissionCategoryResponse {
    pub category: String,
    pub permissions: Vec<PermissionResponse>,
}

/// Builds the grouped catalog projection.
#[must_use]
pub fn grouped_catalog_response(catalog: &[Permission]) -> Vec<PermissionCategoryResponse> {
    group_by_category(catalog)
        .into_iter()
        .map(|(category, permissions)| PermissionCategoryResponse {
            category,
            permissions: permissions.into_iter().map(PermissionResponse::from).collect(),
        })
        .collect()
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub permission_codes: Vec<String>,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            role_id: value.id().to_string(),
            name: value.name().to_owned(),
            permission_codes: value
                .permission_codes()
                .iter()
                .map(|code| code.as_str().to_owned())
                .collect(),
        }
    }
}

/// API representation of a directory user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/user-response.ts"
)]
pub struct UserResponse {
    pub user_id: String,
    pub name: String,
    pub role_ids: Vec<String>,
}

impl From<UserAccount> for UserResponse {
    fn from(value: UserAccount) -> Self {
        Self {
            user_id: value.id().to_string(),
            name: value.name().to_owned(),
            role_ids: value
                .role_ids()
                .iter()
                .map(|role_id| role_id.to_string())
                .collect(),
        }
    }
}

/// One effective permission with attribution.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/sourced-permission-response.ts"
)]
pub struct SourcedPermissionResponse {
    pub code: String,
    pub source: String,
    pub role_name: Option<String>,
}

impl From<SourcedPermission> for SourcedPermissionResponse {
    fn from(value: SourcedPermission) -> Self {
        let (source, role_name) = match value.source {
            PermissionSource::Role { role_name } => ("role".to_owned(), Some(role_name)),
            PermissionSource::Override => ("override".to_owned(), None),
        };

        Self {
            code: value.code.as_str().to_owned(),
            source,
            role_name,
        }
    }
}

/// Effective permission snapshot for one user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/user-permissions-response.ts"
)]
pub struct UserPermissionsResponse {
    pub user_id: String,
    pub permissions: Vec<SourcedPermissionResponse>,
}

/// One proposed toggle in a batched permission update.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/permission-toggle-request.ts"
)]
pub struct PermissionToggleRequest {
    pub permission_id: String,
    pub granted: bool,
}

/// Incoming payload for a batched permission update.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/update-user-permissions-request.ts"
)]
pub struct UpdateUserPermissionsRequest {
    pub changes: Vec<PermissionToggleRequest>,
}

/// Result of a committed permission update.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/commit-summary-response.ts"
)]
pub struct CommitSummaryResponse {
    pub adding: usize,
    pub removing: usize,
    pub permissions: Vec<SourcedPermissionResponse>,
}

/// API representation of an override audit entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/override-audit-entry-response.ts"
)]
pub struct OverrideAuditEntryResponse {
    pub event_id: String,
    pub permission_code: String,
    pub action: String,
    pub detail: Option<String>,
    pub created_at: String,
}
