use axum::extract::State;
use serde::Serialize;

use crate::auth::RoleSet;
use crate::handlers::public::status::{service_status, ServiceStatus};
use crate::middleware::{ApiResponse, Caller};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    #[serde(flatten)]
    pub service: ServiceStatus,
    pub username: String,
    pub roles: RoleSet,
    pub effective_roles: RoleSet,
}

/// GET /status/auth - Status plus the caller as the gate resolved them
///
/// Runs the whole resolver and gate path, so it doubles as a smoke test of
/// the identity provider connection.
pub async fn status_auth(State(state): State<AppState>, Caller(identity): Caller) -> ApiResponse<AuthStatus> {
    ApiResponse::success(AuthStatus {
        service: service_status(&state),
        username: identity.username.clone(),
        roles: identity.roles.clone(),
        effective_roles: identity.effective_roles.clone(),
    })
}
