use axum::extract::State;

use crate::auth::Role;
use crate::middleware::{ApiResponse, ApiResult, CallerToken};
use crate::provider::RoleInfo;
use crate::state::AppState;

/// GET /admin/roles - VBR roles known to the identity provider
///
/// Platform roles unrelated to VBR are left out.
///
/// Expected Output:
/// ```json
/// {"success": true, "data": [{"name": "VBR_ADMIN", "description": "VBR Administrator", "owner": "vbr_service"}]}
/// ```
pub async fn roles_list(State(state): State<AppState>, CallerToken(token): CallerToken) -> ApiResult<Vec<RoleInfo>> {
    let names = state.provider.role_names(&token).await?;

    let mut roles = Vec::new();
    for name in names.iter().filter(|name| name.parse::<Role>().is_ok()) {
        roles.push(state.provider.role(&token, name).await?);
    }
    roles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ApiResponse::success(roles))
}
