use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use leasora_core::AppError;
use leasora_domain::{PermissionId, UserId};

use crate::dto::{
    CommitSummaryResponse, OverrideAuditEntryResponse, SourcedPermissionResponse,
    UpdateUserPermissionsRequest, UserPermissionsResponse, UserResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_users_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state
        .permission_admin_service
        .list_users()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn user_permissions_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserPermissionsResponse>> {
    let user_id = UserId::from_uuid(user_id);
    let snapshot = state
        .permission_admin_service
        .user_snapshot(user_id)
        .await?;

    Ok(Json(UserPermissionsResponse {
        user_id: user_id.to_string(),
        permissions: snapshot
            .sourced_permissions()
            .into_iter()
            .map(SourcedPermissionResponse::from)
            .collect(),
    }))
}

/// Opens a session over the current snapshot, replays the proposed toggles,
/// and commits the resulting diff in one batch. Role-locked and no-op toggles
/// are ignored by the engine rather than rejected, matching the disabled
/// controls the console renders.
pub async fn update_user_permissions_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserPermissionsRequest>,
) -> ApiResult<Json<CommitSummaryResponse>> {
    let user_id = UserId::from_uuid(user_id);
    let mut session = state
        .permission_admin_service
        .open_session(user_id)
        .await?;

    for change in payload.changes {
        let permission_id = Uuid::parse_str(change.permission_id.as_str()).map_err(|error| {
            AppError::Validation(format!(
                "invalid permission id '{}': {error}",
                change.permission_id
            ))
        })?;
        session.toggle(PermissionId::from_uuid(permission_id), change.granted);
    }

    let summary = state.permission_admin_service.commit(&mut session).await?;

    Ok(Json(CommitSummaryResponse {
        adding: summary.adding,
        removing: summary.removing,
        permissions: session
            .snapshot()
            .sourced_permissions()
            .into_iter()
            .map(SourcedPermissionResponse::from)
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

pub async fn user_permission_audit_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<OverrideAuditEntryResponse>>> {
    let entries = state
        .permission_admin_service
        .audit_trail(UserId::from_uuid(user_id), query.limit.unwrap_or(50))
        .await?
        .into_iter()
        .map(|entry| OverrideAuditEntryResponse {
            event_id: entry.event_id,
            permission_code: entry.permission_code,
            action: entry.action,
            detail: entry.detail,
            created_at: entry.created_at,
        })
        .collect();

    Ok(Json(entries))
}
