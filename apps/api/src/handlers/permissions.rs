use axum::Json;
use axum::extract::State;

use crate::dto::{
    PermissionCategoryResponse, PermissionResponse, RoleResponse, grouped_catalog_response,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_permissions_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let catalog = state
        .permission_admin_service
        .catalog()
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(catalog))
}

pub async fn grouped_permissions_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PermissionCategoryResponse>>> {
    let catalog = state.permission_admin_service.catalog().await?;

    Ok(Json(grouped_catalog_response(&catalog)))
}

pub async fn list_roles_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .permission_admin_service
        .roles()
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}
