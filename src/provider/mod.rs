pub mod tapis;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use tapis::TapisClient;

/// Errors from identity-provider calls
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with 401/403 for the presented credential.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Token issued by a password grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: Option<String>,
}

/// Credentials for the password grant.
#[derive(Clone, Deserialize)]
pub struct PasswordGrant {
    pub username: String,
    pub password: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for PasswordGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGrant")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleInfo {
    pub name: String,
    pub description: String,
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub username: String,
    pub name: String,
    pub email: String,
}

/// External service that authenticates tokens and stores role assignments.
///
/// Every call takes the token it should run under, so the same client
/// serves both end-user and service-account calls.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Username owning `token`.
    async fn username(&self, token: &str) -> Result<String, ProviderError>;

    /// Role names assigned to `username`, as visible to `token`.
    async fn user_roles(&self, token: &str, username: &str) -> Result<Vec<String>, ProviderError>;

    async fn password_grant(&self, grant: &PasswordGrant) -> Result<IssuedToken, ProviderError>;

    async fn role_names(&self, token: &str) -> Result<Vec<String>, ProviderError>;

    async fn role(&self, token: &str, name: &str) -> Result<RoleInfo, ProviderError>;

    async fn users_with_role(&self, token: &str, role: &str) -> Result<Vec<String>, ProviderError>;

    async fn profile(&self, token: &str, username: &str) -> Result<UserProfile, ProviderError>;

    async fn grant_role(&self, token: &str, username: &str, role: &str) -> Result<(), ProviderError>;

    async fn revoke_role(&self, token: &str, username: &str, role: &str) -> Result<(), ProviderError>;
}
