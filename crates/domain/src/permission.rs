//! Permission catalog types and category derivation.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use leasora_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a catalog permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
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

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated dotted permission code, e.g. `agreement.edit.all`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionCode(String);

impl PermissionCode {
    /// Creates a validated permission code.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "permission code must not be empty".to_owned(),
            ));
        }

        if trimmed.split('.').any(|segment| segment.is_empty()) {
            return Err(AppError::Validation(format!(
                "permission code '{trimmed}' must not contain empty dot-segments"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying code string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the display category: the first dot-segment, upper-cased.
    ///
    /// A code without any dot yields the whole code as its category.
    #[must_use]
    pub fn category(&self) -> String {
        self.0
            .split('.')
            .next()
            .unwrap_or(self.0.as_str())
            .to_uppercase()
    }
}

impl Display for PermissionCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<PermissionCode> for String {
    fn from(value: PermissionCode) -> Self {
        value.0
    }
}

/// A catalog permission: an atomic capability identified by a dotted code.
///
/// Permissions are globally unique by id and by code; both are stable and
/// never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    code: PermissionCode,
    description: String,
}

impl Permission {
    /// Creates a validated catalog permission.
    pub fn new(id: PermissionId, code: impl Into<String>, description: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            code: PermissionCode::new(code)?,
            description: description.into(),
        })
    }

    /// Returns the stable permission identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the dotted permission code.
    #[must_use]
    pub fn code(&self) -> &PermissionCode {
        &self.code
    }

    /// Returns the human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the display category derived from the code.
    #[must_use]
    pub fn category(&self) -> String {
        self.code.category()
    }
}

/// Groups catalog permissions by derived category.
///
/// Grouping is stable: catalog order is preserved within each category.
#[must_use]
pub fn group_by_category(permissions: &[Permission]) -> BTreeMap<String, Vec<Permission>> {
    let mut groups: BTreeMap<String, Vec<Permission>> = BTreeMap::new();

    for permission in permissions {
        groups
            .entry(permission.category())
            .or_default()
            .push(permission.clone());
    }

    groups
}
