use thiserror::Error;

use crate::provider::ProviderError;

/// Failures of the authorization pipeline.
///
/// Everything except `Configuration` is reported to the client as a uniform
/// 401; `Configuration` means a route asked for something the deployment
/// cannot answer and is reported as a server error.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token missing, malformed, expired, or rejected by the provider.
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    /// Identity resolved but lacks the required role.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The identity provider could not be reached or answered garbage.
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        AuthError::Unauthenticated(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AuthError::Unauthorized(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        AuthError::Configuration(message.into())
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected { status, message } => {
                AuthError::Unauthenticated(format!("Token was not valid: {} ({})", message, status))
            }
            other => AuthError::IdentityProvider(other.to_string()),
        }
    }
}
