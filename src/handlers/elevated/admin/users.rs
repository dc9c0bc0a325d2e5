use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{effective_roles, grantable};
use crate::auth::Role;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CallerToken};
use crate::provider::UserProfile;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    #[serde(default = "super::default_role")]
    pub role: Role,
}

/// GET /admin/users - Profiles of everyone holding VBR_USER
pub async fn users_list(State(state): State<AppState>, CallerToken(token): CallerToken) -> ApiResult<Vec<UserProfile>> {
    let usernames = state.provider.users_with_role(&token, Role::User.as_str()).await?;

    let mut profiles = Vec::with_capacity(usernames.len());
    for username in &usernames {
        profiles.push(state.provider.profile(&token, username).await?);
    }
    Ok(ApiResponse::success(profiles))
}

/// POST /admin/users - Enrol a user by granting them a VBR role
///
/// Expected Input:
/// ```json
/// {"username": "tacobot", "role": "VBR_READ_PUBLIC"}
/// ```
/// `role` defaults to VBR_READ_PUBLIC. Returns the user's profile.
pub async fn users_post(
    State(state): State<AppState>,
    CallerToken(token): CallerToken,
    Json(new_user): Json<NewUser>,
) -> ApiResult<UserProfile> {
    let role = grantable(new_user.role)?;
    state.provider.grant_role(&token, &new_user.username, role.as_str()).await?;
    info!("Granted {} to {}", role, new_user.username);

    let profile = state.provider.profile(&token, &new_user.username).await?;
    Ok(ApiResponse::created(profile))
}

/// GET /admin/user/:username - Profile of one VBR user
pub async fn user_get(
    State(state): State<AppState>,
    CallerToken(token): CallerToken,
    Path(username): Path<String>,
) -> ApiResult<UserProfile> {
    if !effective_roles(&state, &token, &username).await?.contains(&Role::User) {
        return Err(ApiError::not_found(format!("{} is not a VBR user", username)));
    }
    let profile = state.provider.profile(&token, &username).await?;
    Ok(ApiResponse::success(profile))
}
