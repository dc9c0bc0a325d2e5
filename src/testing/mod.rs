use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::audit::claims::{decode_token_claims, username_claim};
use crate::audit::MemoryAuditSink;
use crate::auth::{Role, RoleHierarchy};
use crate::config::AppConfig;
use crate::filter::{FilterOperator, FilterQuery};
use crate::provider::{IdentityProvider, IssuedToken, PasswordGrant, ProviderError, RoleInfo, UserProfile};
use crate::state::AppState;
use crate::views::{ViewQuery, ViewQueryError};

pub const SERVICE_USER: &str = "vbr_service";
pub const SERVICE_PASSWORD: &str = "service-secret";

/// Token shaped like the provider's, signed with a throwaway HS256 key.
/// A negative `ttl_secs` yields an already expired token.
pub fn mint_token(username: &str, ttl_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "jti": Uuid::new_v4().to_string(),
        "iss": "https://tacc.tapis.io/v3/tokens",
        "sub": format!("{}@tacc", username),
        "tapis/tenant_id": "tacc",
        "tapis/username": username,
        "tapis/token_type": "access",
        "iat": now,
        "exp": now + ttl_secs,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"not-a-real-key"))
        .expect("test token encodes")
}

fn rejected(message: &str) -> ProviderError {
    ProviderError::Rejected {
        status: 401,
        message: message.to_string(),
    }
}

/// In-memory identity provider. Tokens are mapped to users through their
/// `tapis/username` claim; unknown users are rejected like the real service.
#[derive(Default)]
pub struct StaticProvider {
    users: Mutex<HashMap<String, BTreeSet<String>>>,
    passwords: HashMap<String, String>,
    failing: bool,
    calls: AtomicUsize,
    grants: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: &str, roles: &[&str]) -> Self {
        self.users
            .get_mut()
            .unwrap()
            .insert(username.to_string(), roles.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn with_password(mut self, username: &str, password: &str) -> Self {
        self.passwords.insert(username.to_string(), password.to_string());
        self
    }

    /// Every identity call answers 503.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Identity lookups made so far (username plus role lookups).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn grants(&self) -> usize {
        self.grants.load(Ordering::SeqCst)
    }

    pub fn roles_of(&self, username: &str) -> BTreeSet<String> {
        self.users.lock().unwrap().get(username).cloned().unwrap_or_default()
    }

    fn check_up(&self) -> Result<(), ProviderError> {
        if self.failing {
            return Err(ProviderError::Status {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn holder_of(&self, token: &str) -> Result<String, ProviderError> {
        let username = username_claim(&decode_token_claims(token)).ok_or_else(|| rejected("Invalid token"))?;
        if self.users.lock().unwrap().contains_key(&username) {
            Ok(username)
        } else {
            Err(rejected("Invalid token"))
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticProvider {
    async fn username(&self, token: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        self.holder_of(token)
    }

    async fn user_roles(&self, token: &str, username: &str) -> Result<Vec<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        self.holder_of(token)?;
        Ok(self.roles_of(username).into_iter().collect())
    }

    async fn password_grant(&self, grant: &PasswordGrant) -> Result<IssuedToken, ProviderError> {
        self.grants.fetch_add(1, Ordering::SeqCst);
        match self.passwords.get(&grant.username) {
            Some(password) if *password == grant.password => Ok(IssuedToken {
                access_token: mint_token(&grant.username, 14400),
                expires_at: None,
            }),
            _ => Err(rejected("Invalid username/password combination.")),
        }
    }

    async fn role_names(&self, token: &str) -> Result<Vec<String>, ProviderError> {
        self.holder_of(token)?;
        let mut names: Vec<String> = Role::ALL.iter().map(|r| r.to_string()).collect();
        names.push("PGREST_USER".to_string());
        Ok(names)
    }

    async fn role(&self, token: &str, name: &str) -> Result<RoleInfo, ProviderError> {
        self.holder_of(token)?;
        let description = name
            .parse::<Role>()
            .map(|r| r.description().to_string())
            .unwrap_or_else(|_| "Platform role".to_string());
        Ok(RoleInfo {
            name: name.to_string(),
            description,
            owner: SERVICE_USER.to_string(),
        })
    }

    async fn users_with_role(&self, token: &str, role: &str) -> Result<Vec<String>, ProviderError> {
        self.holder_of(token)?;
        let hierarchy = RoleHierarchy::standard();
        let users = self.users.lock().unwrap();
        let mut holders: Vec<String> = users
            .iter()
            .filter(|(_, roles)| {
                let effective = hierarchy.resolve(&Role::parse_set(roles.iter()));
                effective.iter().any(|r| r.as_str() == role) || roles.contains(role)
            })
            .map(|(name, _)| name.clone())
            .collect();
        holders.sort();
        Ok(holders)
    }

    async fn profile(&self, token: &str, username: &str) -> Result<UserProfile, ProviderError> {
        self.holder_of(token)?;
        if !self.users.lock().unwrap().contains_key(username) {
            return Err(ProviderError::Status {
                status: 404,
                message: format!("User {} not found", username),
            });
        }
        Ok(UserProfile {
            username: username.to_string(),
            name: format!("{} Tester", username),
            email: format!("{}@example.org", username),
        })
    }

    async fn grant_role(&self, token: &str, username: &str, role: &str) -> Result<(), ProviderError> {
        self.holder_of(token)?;
        self.users
            .lock()
            .unwrap()
            .entry(username.to_string())
            .or_default()
            .insert(role.to_string());
        Ok(())
    }

    async fn revoke_role(&self, token: &str, username: &str, role: &str) -> Result<(), ProviderError> {
        self.holder_of(token)?;
        if let Some(roles) = self.users.lock().unwrap().get_mut(username) {
            roles.remove(role);
        }
        Ok(())
    }
}

/// Rows served from memory. `eq` and `like` filters are honoured; every
/// call is recorded.
#[derive(Default)]
pub struct StaticViews {
    rows: HashMap<String, Vec<Value>>,
    seen: Mutex<Vec<(String, String, FilterQuery)>>,
}

impl StaticViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, view: &str, rows: Vec<Value>) -> Self {
        self.rows.insert(view.to_string(), rows);
        self
    }

    /// `(token, view, query)` for every call so far.
    pub fn seen(&self) -> Vec<(String, String, FilterQuery)> {
        self.seen.lock().unwrap().clone()
    }
}

fn cell(row: &Value, field: &str) -> String {
    match row.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl ViewQuery for StaticViews {
    async fn query_view_rows(
        &self,
        token: &str,
        view: &str,
        query: &FilterQuery,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Value>, ViewQueryError> {
        self.seen
            .lock()
            .unwrap()
            .push((token.to_string(), view.to_string(), query.clone()));

        let rows = self.rows.get(view).cloned().unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter(|row| {
                query.iter().all(|(field, expr)| match expr.operator {
                    FilterOperator::Eq => cell(row, field) == expr.value,
                    FilterOperator::Like => cell(row, field).contains(expr.value.trim_matches('%')),
                    _ => true,
                })
            })
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

/// Development config with the service account filled in.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.identity.service_username = SERVICE_USER.to_string();
    config.identity.service_password = SERVICE_PASSWORD.to_string();
    config
}

/// Fully wired state over the in-memory collaborators.
pub fn test_state(provider: Arc<StaticProvider>, views: Arc<StaticViews>, audit: Arc<MemoryAuditSink>) -> AppState {
    AppState::new(test_config(), provider, views, audit)
}
