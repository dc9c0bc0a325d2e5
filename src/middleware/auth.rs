use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{extract_token, AuthError, Capability, CallerIdentity};
use crate::error::ApiError;
use crate::state::AppState;

/// Per-route requirement handed to `require_capabilities` as layer state.
#[derive(Clone)]
pub struct Guard {
    state: AppState,
    capabilities: &'static [Capability],
}

impl Guard {
    pub fn new(state: AppState, capabilities: &'static [Capability]) -> Self {
        Self { state, capabilities }
    }

    pub fn capabilities(&self) -> &'static [Capability] {
        self.capabilities
    }
}

/// Capability guard: resolves the caller through the identity provider and
/// checks every declared capability before the handler runs.
///
/// The resolved identity is placed in the request extensions for handlers and
/// in the response extensions so the audit stage can name the caller, even
/// when the request is denied.
pub async fn require_capabilities(State(guard): State<Guard>, mut request: Request, next: Next) -> Response {
    let token = extract_token(request.headers());

    let identity = match guard.state.resolver.identity_for(token.as_deref()).await {
        Ok(identity) => identity,
        Err(e) => {
            debug!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
            return ApiError::from(e).into_response();
        }
    };

    if let Err(denial) = guard.state.gate.check(&identity.effective_roles, guard.capabilities) {
        let err = AuthError::from(denial);
        warn!("Denied {} {} for {}: {}", request.method(), request.uri().path(), identity.username, err);
        let mut response = ApiError::from(err).into_response();
        response.extensions_mut().insert(identity);
        return response;
    }

    request.extensions_mut().insert(identity.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(identity);
    response
}

/// The caller's raw token, for handlers that act on the caller's behalf.
#[derive(Clone)]
pub struct CallerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CallerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_token(&parts.headers)
            .map(CallerToken)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

/// Identity placed by `require_capabilities`.
#[derive(Clone)]
pub struct Caller(pub Arc<CallerIdentity>);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<CallerIdentity>>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| {
                tracing::error!("Route reads the caller but has no capability guard");
                ApiError::internal_server_error("Caller identity unavailable")
            })
    }
}
