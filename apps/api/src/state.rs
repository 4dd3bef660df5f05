use leasora_application::PermissionAdminService;
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub permission_admin_service: PermissionAdminService,
    pub postgres_pool: PgPool,
}
