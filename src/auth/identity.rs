use serde::Serialize;
use moka::future::Cache;
use std::sync::Arc;
use tracing::debug;

use super::error::AuthError;
use super::role::{Role, RoleHierarchy, RoleSet};
use super::token::check_shape;
use crate::provider::IdentityProvider;

/// Caller resolved from a bearer token by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerIdentity {
    pub username: String,
    /// Roles as assigned by the provider (VBR roles only).
    pub roles: RoleSet,
    /// Closure of `roles` under the role hierarchy.
    pub effective_roles: RoleSet,
}

impl CallerIdentity {
    pub fn new(username: String, roles: RoleSet, hierarchy: &RoleHierarchy) -> Self {
        let effective_roles = hierarchy.resolve(&roles);
        Self {
            username,
            roles,
            effective_roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.effective_roles.contains(&role)
    }
}

/// Token -> identity map with a fixed capacity. Admission and eviction
/// follow moka's TinyLFU policy once the capacity is reached.
pub struct IdentityCache {
    entries: Cache<String, Arc<CallerIdentity>>,
    capacity: usize,
}

impl IdentityCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let entries = Cache::builder().max_capacity(capacity as u64).build();
        Self { entries, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn get(&self, token: &str) -> Option<Arc<CallerIdentity>> {
        self.entries.get(token).await
    }

    /// Insert or replace. Racing inserts for the same token carry the same
    /// identity, so the last writer winning is harmless.
    pub async fn insert(&self, token: String, identity: Arc<CallerIdentity>) {
        self.entries.insert(token, identity).await;
    }

    /// Entry count after pending maintenance has been applied.
    pub async fn len(&self) -> usize {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count() as usize
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }
}

/// Resolves bearer tokens to caller identities.
pub struct TokenIdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    hierarchy: RoleHierarchy,
    cache: IdentityCache,
}

impl TokenIdentityResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>, hierarchy: RoleHierarchy, cache: IdentityCache) -> Self {
        Self {
            provider,
            hierarchy,
            cache,
        }
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub async fn identity_for(&self, token: Option<&str>) -> Result<Arc<CallerIdentity>, AuthError> {
        let token = token.ok_or_else(|| AuthError::unauthenticated("Not authenticated"))?;

        // Runs on every request, cached or not, so an expired token never
        // rides on an earlier cache entry.
        check_shape(token)?;

        if let Some(identity) = self.cache.get(token).await {
            debug!("Identity cache hit for {}", identity.username);
            return Ok(identity);
        }

        let username = self.provider.username(token).await.map_err(AuthError::from)?;
        let role_names = self
            .provider
            .user_roles(token, &username)
            .await
            .map_err(AuthError::from)?;

        let identity = Arc::new(CallerIdentity::new(
            username,
            Role::parse_set(&role_names),
            &self.hierarchy,
        ));
        debug!(
            "Resolved identity {} with roles {:?}",
            identity.username, identity.effective_roles
        );

        self.cache.insert(token.to_string(), identity.clone()).await;
        Ok(identity)
    }
}
