use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::IdentityConfig;
use crate::provider::{IdentityProvider, PasswordGrant, ProviderError};

/// Service-account session used for calls that must run with elevated
/// privilege regardless of the end user's own token.
///
/// The token is obtained on first use and kept for the life of the process;
/// concurrent first callers wait on a single password grant.
pub struct ServiceAccount {
    provider: Arc<dyn IdentityProvider>,
    credentials: PasswordGrant,
    token: OnceCell<String>,
}

impl ServiceAccount {
    pub fn new(provider: Arc<dyn IdentityProvider>, credentials: PasswordGrant) -> Self {
        Self {
            provider,
            credentials,
            token: OnceCell::new(),
        }
    }

    pub fn from_config(provider: Arc<dyn IdentityProvider>, config: &IdentityConfig) -> Self {
        Self::new(
            provider,
            PasswordGrant {
                username: config.service_username.clone(),
                password: config.service_password.clone(),
                client_id: None,
                client_secret: None,
            },
        )
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub async fn token(&self) -> Result<&str, ProviderError> {
        self.token
            .get_or_try_init(|| async {
                let issued = self.provider.password_grant(&self.credentials).await?;
                info!("Obtained service account token for {}", self.credentials.username);
                Ok::<_, ProviderError>(issued.access_token)
            })
            .await
            .map(String::as_str)
    }

    pub fn is_initialized(&self) -> bool {
        self.token.initialized()
    }
}
