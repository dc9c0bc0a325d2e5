// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::provider::ProviderError;
use crate::views::ViewQueryError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized (authentication and authorization failures alike)
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (identity provider or view-query service misbehaved)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(msg) => ApiError::unauthorized(msg),
            // Do not tell the caller which role they are missing
            AuthError::Unauthorized(_) => ApiError::unauthorized("Not authorized"),
            AuthError::IdentityProvider(msg) => {
                ApiError::unauthorized(format!("Token could not be verified: {}", msg))
            }
            AuthError::Configuration(msg) => {
                tracing::error!("Authorization configuration error: {}", msg);
                ApiError::internal_server_error("Server authorization is misconfigured")
            }
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected { message, .. } => ApiError::unauthorized(message),
            ProviderError::Status { status: 404, message } => ApiError::not_found(message),
            ProviderError::Transport(e) => {
                tracing::error!("Identity provider unreachable: {}", e);
                ApiError::service_unavailable("Identity provider temporarily unavailable")
            }
            other => {
                tracing::error!("Identity provider error: {}", other);
                ApiError::bad_gateway("Identity provider returned an unexpected response")
            }
        }
    }
}

impl From<ViewQueryError> for ApiError {
    fn from(err: ViewQueryError) -> Self {
        match err {
            ViewQueryError::ServiceAccount(e) => {
                tracing::error!("Service account unavailable: {}", e);
                ApiError::service_unavailable("Service temporarily unavailable")
            }
            ViewQueryError::Upstream(e) => {
                // Don't expose upstream details to clients
                tracing::error!("View query failed: {}", e);
                ApiError::bad_gateway("An error occurred while processing your request")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_uniform_401() {
        for err in [
            AuthError::unauthenticated("Token has expired"),
            AuthError::unauthorized("missing capability: admin"),
            AuthError::IdentityProvider("connection refused".to_string()),
        ] {
            assert_eq!(ApiError::from(err).status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn denial_does_not_leak_required_role() {
        let err = ApiError::from(AuthError::unauthorized("missing capability: admin"));
        assert_eq!(err.message(), "Not authorized");
    }

    #[test]
    fn configuration_error_is_server_error() {
        let err = ApiError::from(AuthError::configuration("capability 'admin' has no mapped role"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_json()["code"], "INTERNAL_SERVER_ERROR");
        assert!(!err.message().contains("admin"));
    }
}
