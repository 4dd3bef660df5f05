//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_permission_store;
mod postgres_override_audit_repository;
mod postgres_permission_catalog_repository;
mod postgres_permission_override_repository;
mod postgres_user_directory_repository;
mod postgres_user_snapshot_repository;

pub use in_memory_permission_store::InMemoryPermissionStore;
pub use postgres_override_audit_repository::PostgresOverrideAuditRepository;
pub use postgres_permission_catalog_repository::PostgresPermissionCatalogRepository;
pub use postgres_permission_override_repository::PostgresPermissionOverrideRepository;
pub use postgres_user_directory_repository::PostgresUserDirectoryRepository;
pub use postgres_user_snapshot_repository::PostgresUserSnapshotRepository;
