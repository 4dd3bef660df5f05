//! Role definitions: named, reusable bundles of permission codes.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use leasora_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PermissionCode;

/// Unique identifier for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A named bundle of permission codes assignable to users.
///
/// The permission set is unordered; membership is what matters. The role
/// definition is the only authority for whether a user's grant is
/// role-sourced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
    permission_codes: BTreeSet<PermissionCode>,
}

impl Role {
    /// Creates a validated role definition.
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        permission_codes: BTreeSet<PermissionCode>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            permission_codes,
        })
    }

    /// Returns the stable role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the permission codes granted by this role.
    #[must_use]
    pub fn permission_codes(&self) -> &BTreeSet<PermissionCode> {
        &self.permission_codes
    }

    /// Returns whether this role grants the given permission code.
    #[must_use]
    pub fn grants(&self, code: &PermissionCode) -> bool {
        self.permission_codes.contains(code)
    }
}
