use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::info;

use super::{grantable, sorted_roles};
use crate::auth::Role;
use crate::middleware::{ApiResponse, ApiResult, CallerToken};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleParam {
    #[serde(default = "super::default_role")]
    pub role: Role,
}

/// GET /admin/user/:username/roles - Sorted VBR roles assigned to a user
pub async fn user_roles_get(
    State(state): State<AppState>,
    CallerToken(token): CallerToken,
    Path(username): Path<String>,
) -> ApiResult<Vec<String>> {
    Ok(ApiResponse::success(sorted_roles(&state, &token, &username).await?))
}

/// PUT /admin/user/:username/roles?role=VBR_WRITE_PUBLIC - Grant a role
pub async fn user_roles_put(
    State(state): State<AppState>,
    CallerToken(token): CallerToken,
    Path(username): Path<String>,
    Query(param): Query<RoleParam>,
) -> ApiResult<Vec<String>> {
    let role = grantable(param.role)?;
    state.provider.grant_role(&token, &username, role.as_str()).await?;
    info!("Granted {} to {}", role, username);
    Ok(ApiResponse::success(sorted_roles(&state, &token, &username).await?))
}

/// DELETE /admin/user/:username/roles/:role - Revoke a role
pub async fn user_role_delete(
    State(state): State<AppState>,
    CallerToken(token): CallerToken,
    Path((username, role)): Path<(String, Role)>,
) -> ApiResult<Vec<String>> {
    let role = grantable(role)?;
    state.provider.revoke_role(&token, &username, role.as_str()).await?;
    info!("Revoked {} from {}", role, username);
    Ok(ApiResponse::success(sorted_roles(&state, &token, &username).await?))
}
