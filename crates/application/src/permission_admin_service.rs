use std::sync::Arc;

use futures::future::join_all;

use leasora_core::{AppError, AppResult};
use leasora_domain::{
    ChangesSummary, OverrideAction, OverrideOperation, OverrideSession, Permission, Role,
    UserAccount, UserId, UserPermissionSnapshot,
};

use crate::{
    OverrideAuditEntry, OverrideAuditEvent, OverrideAuditRepository, PermissionCatalogRepository,
    PermissionOverrideRepository, UserDirectoryRepository, UserSnapshotRepository,
};

/// Application service for the unified permission administration console.
///
/// Orchestrates snapshot loading, session opening, batched commits against
/// the override store, and the audit trail.
#[derive(Clone)]
pub struct PermissionAdminService {
    catalog_repository: Arc<dyn PermissionCatalogRepository>,
    snapshot_repository: Arc<dyn UserSnapshotRepository>,
    override_repository: Arc<dyn PermissionOverrideRepository>,
    user_directory: Arc<dyn UserDirectoryRepository>,
    audit_repository: Arc<dyn OverrideAuditRepository>,
}

impl PermissionAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        catalog_repository: Arc<dyn PermissionCatalogRepository>,
        snapshot_repository: Arc<dyn UserSnapshotRepository>,
        override_repository: Arc<dyn PermissionOverrideRepository>,
        user_directory: Arc<dyn UserDirectoryRepository>,
        audit_repository: Arc<dyn OverrideAuditRepository>,
    ) -> Self {
        Self {
            catalog_repository,
            snapshot_repository,
            override_repository,
            user_directory,
            audit_repository,
        }
    }

    /// Returns the full permission catalog.
    ///
    /// A load failure is surfaced as [`AppError::Unavailable`] so callers
    /// render a disabled console instead of treating every permission as
    /// ungranted.
    pub async fn catalog(&self) -> AppResult<Vec<Permission>> {
        self.catalog_repository
            .list_permissions()
            .await
            .map_err(|error| AppError::Unavailable(format!("permission catalog: {error}")))
    }

    /// Returns all role definitions.
    pub async fn roles(&self) -> AppResult<Vec<Role>> {
        self.catalog_repository
            .list_roles()
            .await
            .map_err(|error| AppError::Unavailable(format!("role catalog: {error}")))
    }

    /// Lists users visible to the console.
    pub async fn list_users(&self) -> AppResult<Vec<UserAccount>> {
        self.user_directory.list_users().await
    }

    /// Finds one user by identifier.
    pub async fn find_user(&self, user_id: UserId) -> AppResult<UserAccount> {
        self.user_directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}'")))
    }

    /// Returns the current sourced snapshot for one user.
    pub async fn user_snapshot(&self, user_id: UserId) -> AppResult<UserPermissionSnapshot> {
        self.find_user(user_id).await?;
        self.load_snapshot(user_id).await
    }

    /// Opens a permission-management session over a fresh snapshot.
    pub async fn open_session(&self, user_id: UserId) -> AppResult<OverrideSession> {
        let snapshot = self.user_snapshot(user_id).await?;
        Ok(OverrideSession::open(snapshot))
    }

    /// Commits the session's pending changes as a batch of idempotent
    /// override operations.
    ///
    /// The diff is computed against a snapshot re-fetched at commit time, not
    /// the one cached at toggle time. Operations are issued concurrently;
    /// each override is an independent row keyed by `(user_id,
    /// permission_id)`, so there is no cross-permission ordering dependency.
    /// On any operation failure the whole batch reports [`AppError::CommitFailed`]
    /// and pending changes are preserved so a retry re-sends the same diff.
    /// On success pending is cleared and the snapshot re-fetched; the local
    /// view is never patched from the diff.
    pub async fn commit(&self, session: &mut OverrideSession) -> AppResult<ChangesSummary> {
        let user_id = session.user_id();
        let fresh = self.load_snapshot(user_id).await?;
        let operations = session.diff_against(&fresh);
        let summary = ChangesSummary::of(&operations);

        if operations.is_empty() {
            session.complete(fresh);
            return Ok(summary);
        }

        let results = join_all(
            operations
                .iter()
                .map(|operation| self.apply_operation(user_id, *operation)),
        )
        .await;

        let failures: Vec<String> = results
            .into_iter()
            .filter_map(Result::err)
            .map(|error| error.to_string())
            .collect();

        if !failures.is_empty() {
            return Err(AppError::CommitFailed(format!(
                "{} of {} override operations failed: {}",
                failures.len(),
                operations.len(),
                failures.join("; ")
            )));
        }

        for operation in &operations {
            let permission_code = fresh
                .code_of(operation.permission_id)
                .map(|code| code.as_str().to_owned())
                .unwrap_or_else(|| operation.permission_id.to_string());

            self.audit_repository
                .append_event(OverrideAuditEvent {
                    user_id,
                    permission_id: operation.permission_id,
                    permission_code: permission_code.clone(),
                    action: operation.action,
                    detail: Some(format!(
                        "{} override for '{permission_code}'",
                        match operation.action {
                            OverrideAction::Add => "applied",
                            OverrideAction::Remove => "removed",
                        }
                    )),
                })
                .await?;
        }

        let refreshed = self.load_snapshot(user_id).await?;
        session.complete(refreshed);

        Ok(summary)
    }

    /// Returns the most recent override audit entries for a user.
    pub async fn audit_trail(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<OverrideAuditEntry>> {
        self.find_user(user_id).await?;
        self.audit_repository
            .list_recent_events(user_id, limit)
            .await
    }

    async fn apply_operation(&self, user_id: UserId, operation: OverrideOperation) -> AppResult<()> {
        match operation.action {
            OverrideAction::Add => {
                self.override_repository
                    .apply_override(user_id, operation.permission_id)
                    .await
            }
            OverrideAction::Remove => {
                self.override_repository
                    .remove_override(user_id, operation.permission_id)
                    .await
            }
        }
    }

    async fn load_snapshot(&self, user_id: UserId) -> AppResult<UserPermissionSnapshot> {
        let catalog = self.catalog().await?;
        let grants = self
            .snapshot_repository
            .fetch_user_grants(user_id)
            .await
            .map_err(|error| AppError::Unavailable(format!("user snapshot: {error}")))?;

        Ok(UserPermissionSnapshot::derive(
            user_id,
            &catalog,
            &grants.roles,
            &grants.override_codes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use leasora_core::{AppError, AppResult};
    use leasora_domain::{
        Permission, PermissionCode, PermissionId, Role, RoleId, ToggleOutcome, UserAccount,
        UserId,
    };

    use crate::{
        OverrideAuditEntry, OverrideAuditEvent, OverrideAuditRepository,
        PermissionCatalogRepository, PermissionOverrideRepository, UserDirectoryRepository,
        UserGrants, UserSnapshotRepository,
    };

    use super::PermissionAdminService;

    fn permission(code: &str) -> Permission {
        Permission::new(PermissionId::new(), code, format!("grants {code}"))
            .unwrap_or_else(|_| panic!("valid permission"))
    }

    fn code(value: &str) -> PermissionCode {
        PermissionCode::new(value).unwrap_or_else(|_| panic!("valid code"))
    }

    /// One fake backing every port, so override mutations are visible to
    /// subsequent snapshot fetches.
    struct FakeStore {
        catalog: Vec<Permission>,
        roles_by_user: HashMap<UserId, Vec<Role>>,
        users: Vec<UserAccount>,
        overrides: Mutex<BTreeSet<(UserId, PermissionCode)>>,
        events: Mutex<Vec<OverrideAuditEvent>>,
        fail_catalog: AtomicBool,
        fail_overrides: AtomicBool,
    }

    impl FakeStore {
        fn new(catalog: Vec<Permission>, users: Vec<UserAccount>) -> Self {
            Self {
                catalog,
                roles_by_user: HashMap::new(),
                users,
                overrides: Mutex::new(BTreeSet::new()),
                events: Mutex::new(Vec::new()),
                fail_catalog: AtomicBool::new(false),
                fail_overrides: AtomicBool::new(false),
            }
        }

        fn code_of(&self, permission_id: PermissionId) -> AppResult<PermissionCode> {
            self.catalog
                .iter()
                .find(|entry| entry.id() == permission_id)
                .map(|entry| entry.code().clone())
                .ok_or_else(|| AppError::NotFound(format!("permission '{permission_id}'")))
        }
    }

    #[async_trait]
    impl PermissionCatalogRepository for FakeStore {
        async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
            if self.fail_catalog.load(Ordering::SeqCst) {
                return Err(AppError::Internal("catalog query failed".to_owned()));
            }
            Ok(self.catalog.clone())
        }

        async fn list_roles(&self) -> AppResult<Vec<Role>> {
            Ok(self
                .roles_by_user
                .values()
                .flat_map(|roles| roles.iter().cloned())
                .collect())
        }
    }

    #[async_trait]
    impl UserSnapshotRepository for FakeStore {
        async fn fetch_user_grants(&self, user_id: UserId) -> AppResult<UserGrants> {
            let override_codes = self
                .overrides
                .lock()
                .await
                .iter()
                .filter_map(|(stored_user_id, stored_code)| {
                    (stored_user_id == &user_id).then(|| stored_code.clone())
                })
                .collect();

            Ok(UserGrants {
                roles: self.roles_by_user.get(&user_id).cloned().unwrap_or_default(),
                override_codes,
            })
        }
    }

    #[async_trait]
    impl PermissionOverrideRepository for FakeStore {
        async fn apply_override(
            &self,
            user_id: UserId,
            permission_id: PermissionId,
        ) -> AppResult<()> {
            if self.fail_overrides.load(Ordering::SeqCst) {
                return Err(AppError::Internal("override upsert failed".to_owned()));
            }
            let stored_code = self.code_of(permission_id)?;
            self.overrides.lock().await.insert((user_id, stored_code));
            Ok(())
        }

        async fn remove_override(
            &self,
            user_id: UserId,
            permission_id: PermissionId,
        ) -> AppResult<()> {
            if self.fail_overrides.load(Ordering::SeqCst) {
                return Err(AppError::Internal("override delete failed".to_owned()));
            }
            let stored_code = self.code_of(permission_id)?;
            self.overrides.lock().await.remove(&(user_id, stored_code));
            Ok(())
        }
    }

    #[async_trait]
    impl UserDirectoryRepository for FakeStore {
        async fn list_users(&self) -> AppResult<Vec<UserAccount>> {
            Ok(self.users.clone())
        }

        async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserAccount>> {
            Ok(self
                .users
                .iter()
                .find(|user| user.id() == user_id)
                .cloned())
        }
    }

    #[async_trait]
    impl OverrideAuditRepository for FakeStore {
        async fn append_event(&self, event: OverrideAuditEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }

        async fn list_recent_events(
            &self,
            user_id: UserId,
            limit: usize,
        ) -> AppResult<Vec<OverrideAuditEntry>> {
            Ok(self
                .events
                .lock()
                .await
                .iter()
                .rev()
                .filter(|event| event.user_id == user_id)
                .take(limit)
                .enumerate()
                .map(|(index, event)| OverrideAuditEntry {
                    event_id: index.to_string(),
                    user_id: event.user_id,
                    permission_code: event.permission_code.clone(),
                    action: event.action.as_str().to_owned(),
                    detail: event.detail.clone(),
                    created_at: "2026-01-01T00:00:00Z".to_owned(),
                })
                .collect())
        }
    }

    fn service_over(store: Arc<FakeStore>) -> PermissionAdminService {
        PermissionAdminService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
        )
    }

    fn user(name: &str) -> UserAccount {
        UserAccount::new(UserId::new(), name, Vec::new())
            .unwrap_or_else(|_| panic!("valid user"))
    }

    #[tokio::test]
    async fn open_session_surfaces_catalog_unavailable() {
        let admin = user("alice");
        let store = Arc::new(FakeStore::new(
            vec![permission("user.view")],
            vec![admin.clone()],
        ));
        store.fail_catalog.store(true, Ordering::SeqCst);
        let service = service_over(store);

        let result = service.open_session(admin.id()).await;

        assert!(matches!(result, Err(AppError::Unavailable(_))));
    }

    #[tokio::test]
    async fn open_session_for_unknown_user_is_not_found() {
        let store = Arc::new(FakeStore::new(vec![permission("user.view")], Vec::new()));
        let service = service_over(store);

        let result = service.open_session(UserId::new()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn commit_applies_diff_and_converges_session() {
        let edit = permission("user.edit.all");
        let delete = permission("user.delete.all");
        let admin = user("alice");
        let store = Arc::new(FakeStore::new(
            vec![edit.clone(), delete.clone()],
            vec![admin.clone()],
        ));
        store
            .overrides
            .lock()
            .await
            .insert((admin.id(), code("user.delete.all")));
        let service = service_over(store.clone());

        let mut session = service
            .open_session(admin.id())
            .await
            .unwrap_or_else(|_| panic!("session opens"));
        assert_eq!(session.toggle(edit.id(), true), ToggleOutcome::Staged);
        assert_eq!(session.toggle(delete.id(), false), ToggleOutcome::Staged);

        let summary = service
            .commit(&mut session)
            .await
            .unwrap_or_else(|_| panic!("commit succeeds"));

        assert_eq!(summary.adding, 1);
        assert_eq!(summary.removing, 1);
        assert!(!session.has_unsaved_changes());
        assert!(session.effective_state(edit.id()));
        assert!(!session.effective_state(delete.id()));
        assert_eq!(store.events.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn commit_failure_preserves_pending_for_retry() {
        let edit = permission("user.edit.all");
        let admin = user("alice");
        let store = Arc::new(FakeStore::new(vec![edit.clone()], vec![admin.clone()]));
        let service = service_over(store.clone());

        let mut session = service
            .open_session(admin.id())
            .await
            .unwrap_or_else(|_| panic!("session opens"));
        session.toggle(edit.id(), true);

        store.fail_overrides.store(true, Ordering::SeqCst);
        let failed = service.commit(&mut session).await;
        assert!(matches!(failed, Err(AppError::CommitFailed(_))));
        assert!(session.has_unsaved_changes());
        assert!(store.events.lock().await.is_empty());

        store.fail_overrides.store(false, Ordering::SeqCst);
        let retried = service.commit(&mut session).await;
        assert!(retried.is_ok_and(|summary| summary.adding == 1));
        assert!(!session.has_unsaved_changes());
    }

    #[tokio::test]
    async fn commit_rechecks_effective_state_against_fresh_snapshot() {
        let edit = permission("user.edit.all");
        let admin = user("alice");
        let store = Arc::new(FakeStore::new(vec![edit.clone()], vec![admin.clone()]));
        let service = service_over(store.clone());

        let mut session = service
            .open_session(admin.id())
            .await
            .unwrap_or_else(|_| panic!("session opens"));
        session.toggle(edit.id(), true);

        // Another admin granted the same override between toggle and commit.
        store
            .overrides
            .lock()
            .await
            .insert((admin.id(), code("user.edit.all")));

        let summary = service
            .commit(&mut session)
            .await
            .unwrap_or_else(|_| panic!("commit succeeds"));

        assert_eq!(summary.adding, 0);
        assert_eq!(summary.removing, 0);
        assert!(store.events.lock().await.is_empty());
        assert!(!session.has_unsaved_changes());
        assert!(session.effective_state(edit.id()));
    }

    #[tokio::test]
    async fn audit_trail_lists_committed_operations() {
        let edit = permission("user.edit.all");
        let admin = user("alice");
        let store = Arc::new(FakeStore::new(vec![edit.clone()], vec![admin.clone()]));
        let service = service_over(store);

        let mut session = service
            .open_session(admin.id())
            .await
            .unwrap_or_else(|_| panic!("session opens"));
        session.toggle(edit.id(), true);
        let committed = service.commit(&mut session).await;
        assert!(committed.is_ok());

        let trail = service
            .audit_trail(admin.id(), 10)
            .await
            .unwrap_or_else(|_| panic!("trail loads"));

        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].permission_code, "user.edit.all");
        assert_eq!(trail[0].action, "add");
    }
}
