//! The override reconciliation session.
//!
//! Translates a sequence of toggle intents into a live effective-state view
//! and a minimal diff of override operations. The session is pure and
//! UI-agnostic: a presentation layer owns only open/closed state and renders
//! the [`PendingSummary`] this module produces.

use std::collections::BTreeMap;
use std::str::FromStr;

use leasora_core::AppError;
use serde::{Deserialize, Serialize};

use crate::{PermissionId, UserId, UserPermissionSnapshot};

/// Override store operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideAction {
    /// Upsert an override row.
    Add,
    /// Delete an override row.
    Remove,
}

impl OverrideAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl FromStr for OverrideAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            _ => Err(AppError::Validation(format!(
                "unknown override action '{value}'"
            ))),
        }
    }
}

/// One operation the override store must apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideOperation {
    /// Target permission.
    pub permission_id: PermissionId,
    /// Store action to perform.
    pub action: OverrideAction,
}

/// Count of diff operations by action, for confirmation dialogs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesSummary {
    /// Number of `add` operations.
    pub adding: usize,
    /// Number of `remove` operations.
    pub removing: usize,
}

impl ChangesSummary {
    /// Counts operations by action.
    #[must_use]
    pub fn of(operations: &[OverrideOperation]) -> Self {
        let adding = operations
            .iter()
            .filter(|operation| operation.action == OverrideAction::Add)
            .count();

        Self {
            adding,
            removing: operations.len() - adding,
        }
    }
}

/// UI-facing summary surface, recomputed after every toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSummary {
    /// Number of staged pending changes.
    pub pending_count: usize,
    /// Number of `add` operations the current diff would emit.
    pub adding: usize,
    /// Number of `remove` operations the current diff would emit.
    pub removing: usize,
    /// Whether any pending change is staged.
    pub has_unsaved_changes: bool,
}

/// Result of a toggle intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The proposed state differs from the effective state and was staged.
    Staged,
    /// The proposed state matches the effective state; any staged entry was
    /// pruned.
    Cleared,
    /// The permission is role-sourced and cannot be toggled here.
    RoleLocked,
    /// The permission is not in the catalog; the intent was ignored.
    UnknownPermission,
}

/// One permission-management editing session for a single user.
///
/// Holds the snapshot taken when the session opened and the map of pending
/// proposed states. Pending entries exist only for permissions whose proposed
/// state differs from the current effective state, which keeps the unsaved
/// changes count exact.
#[derive(Debug, Clone)]
pub struct OverrideSession {
    snapshot: UserPermissionSnapshot,
    pending: BTreeMap<PermissionId, bool>,
}

impl OverrideSession {
    /// Opens a session over a freshly loaded snapshot.
    #[must_use]
    pub fn open(snapshot: UserPermissionSnapshot) -> Self {
        Self {
            snapshot,
            pending: BTreeMap::new(),
        }
    }

    /// Returns the user being edited.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.snapshot.user_id()
    }

    /// Returns the snapshot the session is working against.
    #[must_use]
    pub fn snapshot(&self) -> &UserPermissionSnapshot {
        &self.snapshot
    }

    /// Applies a toggle intent.
    ///
    /// Role-sourced permissions are rejected at the point of input, not at
    /// diff time, so a role-locked code never reaches the pending map.
    /// Proposing the current effective state prunes any staged entry, so the
    /// final pending state depends only on the latest proposed value per
    /// permission.
    pub fn toggle(&mut self, permission_id: PermissionId, proposed: bool) -> ToggleOutcome {
        if !self.snapshot.contains(permission_id) {
            return ToggleOutcome::UnknownPermission;
        }

        if self.snapshot.is_role_locked(permission_id) {
            return ToggleOutcome::RoleLocked;
        }

        if proposed == self.snapshot.effective_state(permission_id) {
            self.pending.remove(&permission_id);
            return ToggleOutcome::Cleared;
        }

        self.pending.insert(permission_id, proposed);
        ToggleOutcome::Staged
    }

    /// Returns the state a toggle control should display: the pending
    /// proposal if one is staged, else the snapshot's effective state.
    #[must_use]
    pub fn effective_state(&self, permission_id: PermissionId) -> bool {
        self.pending
            .get(&permission_id)
            .copied()
            .unwrap_or_else(|| self.snapshot.effective_state(permission_id))
    }

    /// Returns whether any change is staged.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns the number of staged pending changes.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Computes the diff against an arbitrary snapshot.
    ///
    /// Commit uses this with a freshly fetched snapshot so the diff never
    /// acts on state that changed underneath the session. An `add` is emitted
    /// only when the user lacks the permission; a `remove` only when the
    /// permission is held via an override (a role grant has no override row
    /// to delete). Everything else emits nothing.
    #[must_use]
    pub fn diff_against(&self, snapshot: &UserPermissionSnapshot) -> Vec<OverrideOperation> {
        self.pending
            .iter()
            .filter_map(|(&permission_id, &proposed)| {
                let currently_held = snapshot.effective_state(permission_id);

                if proposed && !currently_held {
                    return Some(OverrideOperation {
                        permission_id,
                        action: OverrideAction::Add,
                    });
                }

                if !proposed
                    && currently_held
                    && snapshot
                        .source_of(permission_id)
                        .is_some_and(|source| !source.is_role())
                {
                    return Some(OverrideOperation {
                        permission_id,
                        action: OverrideAction::Remove,
                    });
                }

                None
            })
            .collect()
    }

    /// Computes the diff against the session's own snapshot.
    #[must_use]
    pub fn compute_diff(&self) -> Vec<OverrideOperation> {
        self.diff_against(&self.snapshot)
    }

    /// Returns the add/remove counts the current diff would produce.
    #[must_use]
    pub fn changes_summary(&self) -> ChangesSummary {
        ChangesSummary::of(&self.compute_diff())
    }

    /// Returns the UI-facing summary surface.
    #[must_use]
    pub fn summary(&self) -> PendingSummary {
        let ChangesSummary { adding, removing } = self.changes_summary();

        PendingSummary {
            pending_count: self.pending.len(),
            adding,
            removing,
            has_unsaved_changes: !self.pending.is_empty(),
        }
    }

    /// Discards all staged changes.
    pub fn cancel(&mut self) {
        self.pending.clear();
    }

    /// Finishes a successful commit: clears pending changes and installs the
    /// refetched snapshot. The snapshot is always server truth, never a local
    /// patch from the applied diff.
    pub fn complete(&mut self, refreshed: UserPermissionSnapshot) {
        self.pending.clear();
        self.snapshot = refreshed;
    }
}
