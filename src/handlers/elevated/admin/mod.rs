pub mod roles;
pub mod user_roles;
pub mod users;

pub use roles::roles_list;
pub use user_roles::{user_role_delete, user_roles_get, user_roles_put};
pub use users::{user_get, users_list, users_post};

use crate::auth::{Role, RoleSet};
use crate::error::ApiError;
use crate::state::AppState;

/// Role granted when a request names none.
pub(crate) fn default_role() -> Role {
    Role::ReadPublic
}

/// VBR role names held by `username`, sorted by name.
pub(crate) async fn sorted_roles(state: &AppState, token: &str, username: &str) -> Result<Vec<String>, ApiError> {
    let raw = state.provider.user_roles(token, username).await?;
    let mut names: Vec<String> = Role::parse_set(raw).iter().map(Role::to_string).collect();
    names.sort();
    Ok(names)
}

pub(crate) async fn effective_roles(state: &AppState, token: &str, username: &str) -> Result<RoleSet, ApiError> {
    let raw = state.provider.user_roles(token, username).await?;
    Ok(state.gate.resolve(&Role::parse_set(raw)))
}

pub(crate) fn grantable(role: Role) -> Result<Role, ApiError> {
    if role.is_grantable() {
        Ok(role)
    } else {
        Err(ApiError::bad_request(format!("{} is implied and cannot be granted directly", role)))
    }
}
