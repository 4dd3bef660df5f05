//! Per-user effective permission snapshot with source attribution.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Permission, PermissionCode, PermissionId, Role, UserId};

/// Why a permission is present in a user's effective set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PermissionSource {
    /// Granted by an assigned role; never individually revocable.
    Role {
        /// Name of the granting role.
        role_name: String,
    },
    /// Granted by a standing per-user override.
    Override,
}

impl PermissionSource {
    /// Returns whether this source is a role grant.
    #[must_use]
    pub fn is_role(&self) -> bool {
        matches!(self, Self::Role { .. })
    }
}

/// One effective permission with its attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedPermission {
    /// The granted permission code.
    pub code: PermissionCode,
    /// Why the permission is in effect.
    pub source: PermissionSource,
}

/// The materialized effective-permission view for one user.
///
/// Derived from the catalog, the user's assigned roles, and the raw set of
/// override codes. Role definitions are the only authority for role-sourcing,
/// and role attribution wins when a code is granted by both a role and an
/// override (removing the override would be a no-op for display purposes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPermissionSnapshot {
    user_id: UserId,
    catalog_order: Vec<PermissionId>,
    codes_by_id: BTreeMap<PermissionId, PermissionCode>,
    sources: BTreeMap<PermissionId, PermissionSource>,
}

impl UserPermissionSnapshot {
    /// Derives the snapshot for a user.
    ///
    /// Override codes that do not resolve against the catalog are dropped:
    /// the catalog is the authority for which permissions exist.
    #[must_use]
    pub fn derive(
        user_id: UserId,
        catalog: &[Permission],
        roles: &[Role],
        override_codes: &BTreeSet<PermissionCode>,
    ) -> Self {
        let mut catalog_order = Vec::with_capacity(catalog.len());
        let mut codes_by_id = BTreeMap::new();
        let mut sources = BTreeMap::new();

        for permission in catalog {
            catalog_order.push(permission.id());
            codes_by_id.insert(permission.id(), permission.code().clone());

            let role_grant = roles.iter().find(|role| role.grants(permission.code()));
            if let Some(role) = role_grant {
                sources.insert(
                    permission.id(),
                    PermissionSource::Role {
                        role_name: role.name().to_owned(),
                    },
                );
            } else if override_codes.contains(permission.code()) {
                sources.insert(permission.id(), PermissionSource::Override);
            }
        }

        Self {
            user_id,
            catalog_order,
            codes_by_id,
            sources,
        }
    }

    /// Returns the user this snapshot belongs to.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns whether the permission exists in the catalog.
    #[must_use]
    pub fn contains(&self, permission_id: PermissionId) -> bool {
        self.codes_by_id.contains_key(&permission_id)
    }

    /// Returns the code for a catalog permission.
    #[must_use]
    pub fn code_of(&self, permission_id: PermissionId) -> Option<&PermissionCode> {
        self.codes_by_id.get(&permission_id)
    }

    /// Returns whether the user currently holds the permission.
    ///
    /// This is the single source of truth for effective grant state; role
    /// definitions must not be inspected directly by callers.
    #[must_use]
    pub fn effective_state(&self, permission_id: PermissionId) -> bool {
        self.sources.contains_key(&permission_id)
    }

    /// Returns the attribution for a currently held permission.
    #[must_use]
    pub fn source_of(&self, permission_id: PermissionId) -> Option<&PermissionSource> {
        self.sources.get(&permission_id)
    }

    /// Returns whether the permission is held via a role grant and therefore
    /// cannot be toggled through the override mechanism.
    #[must_use]
    pub fn is_role_locked(&self, permission_id: PermissionId) -> bool {
        self.sources
            .get(&permission_id)
            .is_some_and(PermissionSource::is_role)
    }

    /// Returns the held permissions with attribution, in catalog order.
    #[must_use]
    pub fn sourced_permissions(&self) -> Vec<SourcedPermission> {
        self.catalog_order
            .iter()
            .filter_map(|permission_id| {
                let source = self.sources.get(permission_id)?;
                let code = self.codes_by_id.get(permission_id)?;
                Some(SourcedPermission {
                    code: code.clone(),
                    source: source.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{PermissionSource, UserPermissionSnapshot};
    use crate::{Permission, PermissionCode, PermissionId, Role, RoleId, UserId};

    fn permission(code: &str) -> Permission {
        Permission::new(PermissionId::new(), code, format!("grants {code}"))
            .unwrap_or_else(|_| panic!("valid permission"))
    }

    fn code(value: &str) -> PermissionCode {
        PermissionCode::new(value).unwrap_or_else(|_| panic!("valid code"))
    }

    fn viewer_role(codes: &[&str]) -> Role {
        let granted: BTreeSet<PermissionCode> = codes.iter().map(|value| code(value)).collect();
        Role::new(RoleId::new(), "Viewer", granted).unwrap_or_else(|_| panic!("valid role"))
    }

    #[test]
    fn role_attribution_wins_over_override() {
        let view = permission("user.view");
        let catalog = vec![view.clone()];
        let roles = vec![viewer_role(&["user.view"])];
        let overrides = BTreeSet::from([code("user.view")]);

        let snapshot = UserPermissionSnapshot::derive(UserId::new(), &catalog, &roles, &overrides);

        assert!(matches!(
            snapshot.source_of(view.id()),
            Some(PermissionSource::Role { role_name }) if role_name == "Viewer"
        ));
        assert!(snapshot.is_role_locked(view.id()));
    }

    #[test]
    fn override_only_grant_is_override_sourced() {
        let delete = permission("user.delete.all");
        let catalog = vec![delete.clone()];
        let overrides = BTreeSet::from([code("user.delete.all")]);

        let snapshot = UserPermissionSnapshot::derive(UserId::new(), &catalog, &[], &overrides);

        assert_eq!(
            snapshot.source_of(delete.id()),
            Some(&PermissionSource::Override)
        );
        assert!(!snapshot.is_role_locked(delete.id()));
    }

    #[test]
    fn ungranted_permission_has_no_effective_state() {
        let edit = permission("user.edit.all");
        let snapshot =
            UserPermissionSnapshot::derive(UserId::new(), &[edit.clone()], &[], &BTreeSet::new());

        assert!(!snapshot.effective_state(edit.id()));
        assert!(snapshot.source_of(edit.id()).is_none());
        assert!(snapshot.contains(edit.id()));
    }

    #[test]
    fn override_code_outside_catalog_is_dropped() {
        let view = permission("user.view");
        let overrides = BTreeSet::from([code("ghost.permission")]);

        let snapshot = UserPermissionSnapshot::derive(UserId::new(), &[view], &[], &overrides);

        assert!(snapshot.sourced_permissions().is_empty());
    }

    #[test]
    fn sourced_permissions_follow_catalog_order() {
        let first = permission("agreement.view");
        let second = permission("user.view");
        let catalog = vec![first.clone(), second.clone()];
        let overrides = BTreeSet::from([code("user.view"), code("agreement.view")]);

        let snapshot = UserPermissionSnapshot::derive(UserId::new(), &catalog, &[], &overrides);
        let listed: Vec<String> = snapshot
            .sourced_permissions()
            .into_iter()
            .map(|entry| entry.code.as_str().to_owned())
            .collect();

        assert_eq!(listed, vec!["agreement.view", "user.view"]);
    }
}
