use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use leasora_application::{
    OverrideAuditEntry, OverrideAuditEvent, OverrideAuditRepository, PermissionCatalogRepository,
    PermissionOverrideRepository, UserDirectoryRepository, UserGrants, UserSnapshotRepository,
};
use leasora_core::{AppError, AppResult};
use leasora_domain::{Permission, PermissionCode, PermissionId, Role, UserAccount, UserId};

struct StoredAuditEvent {
    event_id: Uuid,
    event: OverrideAuditEvent,
    created_at: DateTime<Utc>,
}

/// In-memory implementation of every permission-administration port.
///
/// Used by tests and local development seeding; mutations through the
/// override port are visible to subsequent snapshot fetches, mirroring the
/// PostgreSQL adapters.
#[derive(Default)]
pub struct InMemoryPermissionStore {
    catalog: RwLock<Vec<Permission>>,
    roles: RwLock<Vec<Role>>,
    users: RwLock<Vec<UserAccount>>,
    overrides: RwLock<BTreeSet<(UserId, PermissionId)>>,
    events: RwLock<Vec<StoredAuditEvent>>,
}

impl InMemoryPermissionStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a permission to the catalog.
    pub async fn add_permission(&self, permission: Permission) {
        self.catalog.write().await.push(permission);
    }

    /// Adds a role definition.
    pub async fn add_role(&self, role: Role) {
        self.roles.write().await.push(role);
    }

    /// Adds a user to the directory.
    pub async fn add_user(&self, user: UserAccount) {
        self.users.write().await.push(user);
    }

    /// Seeds a standing override row.
    pub async fn seed_override(&self, user_id: UserId, permission_id: PermissionId) {
        self.overrides.write().await.insert((user_id, permission_id));
    }

    /// Returns whether an override row exists.
    pub async fn has_override(&self, user_id: UserId, permission_id: PermissionId) -> bool {
        self.overrides
            .read()
            .await
            .contains(&(user_id, permission_id))
    }

    async fn code_of(&self, permission_id: PermissionId) -> Option<PermissionCode> {
        self.catalog
            .read()
            .await
            .iter()
            .find(|permission| permission.id() == permission_id)
            .map(|permission| permission.code().clone())
    }
}

#[async_trait]
impl PermissionCatalogRepository for InMemoryPermissionStore {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.catalog.read().await.clone())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.roles.read().await.clone())
    }
}

#[async_trait]
impl UserSnapshotRepository for InMemoryPermissionStore {
    async fn fetch_user_grants(&self, user_id: UserId) -> AppResult<UserGrants> {
        let user = self
            .users
            .read()
            .await
            .iter()
            .find(|user| user.id() == user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}'")))?;

        let roles = self.roles.read().await;
        let assigned_roles: Vec<Role> = user
            .role_ids()
            .iter()
            .filter_map(|role_id| roles.iter().find(|role| role.id() == *role_id).cloned())
            .collect();

        let mut override_codes = BTreeSet::new();
        for (stored_user_id, permission_id) in self.overrides.read().await.iter() {
            if stored_user_id != &user_id {
                continue;
            }
            if let Some(stored_code) = self.code_of(*permission_id).await {
                override_codes.insert(stored_code);
            }
        }

        Ok(UserGrants {
            roles: assigned_roles,
            override_codes,
        })
    }
}

#[async_trait]
impl PermissionOverrideRepository for InMemoryPermissionStore {
    async fn apply_override(&self, user_id: UserId, permission_id: PermissionId) -> AppResult<()> {
        // Insert on a set: re-applying a present override succeeds unchanged.
        self.overrides.write().await.insert((user_id, permission_id));
        Ok(())
    }

    async fn remove_override(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.overrides.write().await.remove(&(user_id, permission_id));
        Ok(())
    }
}

#[async_trait]
impl UserDirectoryRepository for InMemoryPermissionStore {
    async fn list_users(&self) -> AppResult<Vec<UserAccount>> {
        Ok(self.users.read().await.clone())
    }

    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| user.id() == user_id)
            .cloned())
    }
}

#[async_trait]
impl OverrideAuditRepository for InMemoryPermissionStore {
    async fn append_event(&self, event: OverrideAuditEvent) -> AppResult<()> {
        self.events.write().await.push(StoredAuditEvent {
            event_id: Uuid::new_v4(),
            event,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_recent_events(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<OverrideAuditEntry>> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .rev()
            .filter(|stored| stored.event.user_id == user_id)
            .take(limit)
            .map(|stored| OverrideAuditEntry {
                event_id: stored.event_id.to_string(),
                user_id: stored.event.user_id,
                permission_code: stored.event.permission_code.clone(),
                action: stored.event.action.as_str().to_owned(),
                detail: stored.event.detail.clone(),
                created_at: stored.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use leasora_application::{PermissionAdminService, PermissionOverrideRepository};
    use leasora_domain::{
        Permission, PermissionCode, PermissionId, PermissionSource, Role, RoleId, ToggleOutcome,
        UserAccount, UserId,
    };

    use super::InMemoryPermissionStore;

    fn permission(code: &str) -> Permission {
        Permission::new(PermissionId::new(), code, format!("grants {code}"))
            .unwrap_or_else(|_| panic!("valid permission"))
    }

    fn code(value: &str) -> PermissionCode {
        PermissionCode::new(value).unwrap_or_else(|_| panic!("valid code"))
    }

    async fn seeded_store() -> (Arc<InMemoryPermissionStore>, UserAccount, Permission, Permission, Permission)
    {
        let store = Arc::new(InMemoryPermissionStore::new());

        let view = permission("user.view");
        let edit = permission("user.edit.all");
        let delete = permission("user.delete.all");
        store.add_permission(view.clone()).await;
        store.add_permission(edit.clone()).await;
        store.add_permission(delete.clone()).await;

        let viewer = Role::new(RoleId::new(), "Viewer", BTreeSet::from([code("user.view")]))
            .unwrap_or_else(|_| panic!("valid role"));
        store.add_role(viewer.clone()).await;

        let admin = UserAccount::new(UserId::new(), "alice", vec![viewer.id()])
            .unwrap_or_else(|_| panic!("valid user"));
        store.add_user(admin.clone()).await;
        store.seed_override(admin.id(), delete.id()).await;

        (store, admin, view, edit, delete)
    }

    fn service_over(store: Arc<InMemoryPermissionStore>) -> PermissionAdminService {
        PermissionAdminService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
        )
    }

    #[tokio::test]
    async fn apply_and_remove_override_are_idempotent() {
        let (store, admin, _, edit, delete) = seeded_store().await;

        let first = store.apply_override(admin.id(), edit.id()).await;
        let second = store.apply_override(admin.id(), edit.id()).await;
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert!(store.has_override(admin.id(), edit.id()).await);

        let removed = store.remove_override(admin.id(), delete.id()).await;
        let removed_again = store.remove_override(admin.id(), delete.id()).await;
        assert!(removed.is_ok());
        assert!(removed_again.is_ok());
        assert!(!store.has_override(admin.id(), delete.id()).await);
    }

    #[tokio::test]
    async fn committed_diff_converges_with_refetched_snapshot() {
        let (store, admin, view, edit, delete) = seeded_store().await;
        let service = service_over(store.clone());

        let mut session = service
            .open_session(admin.id())
            .await
            .unwrap_or_else(|_| panic!("session opens"));

        // Role-granted view is locked; edit gets added; override-held delete
        // gets removed.
        assert_eq!(session.toggle(view.id(), false), ToggleOutcome::RoleLocked);
        assert_eq!(session.toggle(edit.id(), true), ToggleOutcome::Staged);
        assert_eq!(session.toggle(delete.id(), false), ToggleOutcome::Staged);

        let summary = service
            .commit(&mut session)
            .await
            .unwrap_or_else(|_| panic!("commit succeeds"));
        assert_eq!(summary.adding, 1);
        assert_eq!(summary.removing, 1);
        assert!(!session.has_unsaved_changes());

        let snapshot = service
            .user_snapshot(admin.id())
            .await
            .unwrap_or_else(|_| panic!("snapshot loads"));

        assert_eq!(
            snapshot.source_of(edit.id()),
            Some(&PermissionSource::Override)
        );
        assert!(!snapshot.effective_state(delete.id()));
        assert!(snapshot.is_role_locked(view.id()));
    }

    #[tokio::test]
    async fn audit_trail_is_newest_first_and_scoped_to_user() {
        let (store, admin, _, edit, delete) = seeded_store().await;
        let service = service_over(store);

        let mut session = service
            .open_session(admin.id())
            .await
            .unwrap_or_else(|_| panic!("session opens"));
        session.toggle(edit.id(), true);
        session.toggle(delete.id(), false);
        let committed = service.commit(&mut session).await;
        assert!(committed.is_ok());

        let trail = service
            .audit_trail(admin.id(), 10)
            .await
            .unwrap_or_else(|_| panic!("trail loads"));
        assert_eq!(trail.len(), 2);

        let other_trail = service.audit_trail(UserId::new(), 10).await;
        assert!(other_trail.is_err());
    }
}
