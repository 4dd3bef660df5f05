use std::collections::BTreeSet;

use async_trait::async_trait;

use leasora_core::AppResult;
use leasora_domain::{
    OverrideAction, Permission, PermissionCode, PermissionId, Role, UserAccount, UserId,
};

/// Raw grant inputs for one user, as stored.
///
/// The snapshot is derived from these parts; sourcing is never read back from
/// a materialized echo, so a role definition change cannot drift against a
/// cached per-user attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGrants {
    /// Roles assigned to the user, in assignment order.
    pub roles: Vec<Role>,
    /// Permission codes granted by standing overrides.
    pub override_codes: BTreeSet<PermissionCode>,
}

/// Repository port for the permission and role catalogs.
#[async_trait]
pub trait PermissionCatalogRepository: Send + Sync {
    /// Lists the full permission catalog in stable catalog order.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Lists all role definitions.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;
}

/// Repository port for per-user grant snapshots.
#[async_trait]
pub trait UserSnapshotRepository: Send + Sync {
    /// Fetches the user's assigned roles and standing override codes.
    async fn fetch_user_grants(&self, user_id: UserId) -> AppResult<UserGrants>;
}

/// Repository port for the override store.
///
/// Both operations are idempotent: re-applying an `add` for a present
/// override, or a `remove` for an absent one, succeeds without error.
#[async_trait]
pub trait PermissionOverrideRepository: Send + Sync {
    /// Upserts an override row for `(user_id, permission_id)`.
    async fn apply_override(&self, user_id: UserId, permission_id: PermissionId) -> AppResult<()>;

    /// Deletes the override row for `(user_id, permission_id)`.
    async fn remove_override(&self, user_id: UserId, permission_id: PermissionId)
    -> AppResult<()>;
}

/// Repository port for the console's user directory.
#[async_trait]
pub trait UserDirectoryRepository: Send + Sync {
    /// Lists all users visible to the console.
    async fn list_users(&self) -> AppResult<Vec<UserAccount>>;

    /// Finds one user by identifier.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserAccount>>;
}

/// Audit event recorded for each committed override operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideAuditEvent {
    /// User whose overrides changed.
    pub user_id: UserId,
    /// Target permission.
    pub permission_id: PermissionId,
    /// Resolved permission code at commit time.
    pub permission_code: String,
    /// Applied store action.
    pub action: OverrideAction,
    /// Optional event detail.
    pub detail: Option<String>,
}

/// Audit log entry projection for administrative views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideAuditEntry {
    /// Stable event identifier.
    pub event_id: String,
    /// User whose overrides changed.
    pub user_id: UserId,
    /// Permission code recorded at commit time.
    pub permission_code: String,
    /// Stable action identifier.
    pub action: String,
    /// Optional event detail.
    pub detail: Option<String>,
    /// Event timestamp in RFC3339.
    pub created_at: String,
}

/// Repository port for the override audit trail.
#[async_trait]
pub trait OverrideAuditRepository: Send + Sync {
    /// Appends one audit event.
    async fn append_event(&self, event: OverrideAuditEvent) -> AppResult<()>;

    /// Lists the most recent audit entries for a user, newest first.
    async fn list_recent_events(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<OverrideAuditEntry>>;
}
