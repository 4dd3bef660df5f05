//! Application services and ports for permission administration.

#![forbid(unsafe_code)]

mod permission_admin_ports;
mod permission_admin_service;

pub use permission_admin_ports::{
    OverrideAuditEntry, OverrideAuditEvent, OverrideAuditRepository, PermissionCatalogRepository,
    PermissionOverrideRepository, UserDirectoryRepository, UserGrants, UserSnapshotRepository,
};
pub use permission_admin_service::PermissionAdminService;
