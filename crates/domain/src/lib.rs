//! Domain entities and the permission-override reconciliation engine.

#![forbid(unsafe_code)]

mod permission;
mod role;
mod session;
mod snapshot;
mod user;

pub use permission::{Permission, PermissionCode, PermissionId, group_by_category};
pub use role::{Role, RoleId};
pub use session::{
    ChangesSummary, OverrideAction, OverrideOperation, OverrideSession, PendingSummary,
    ToggleOutcome,
};
pub use snapshot::{PermissionSource, SourcedPermission, UserPermissionSnapshot};
pub use user::{UserAccount, UserId};
