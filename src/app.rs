use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{AuthError, Capability};
use crate::config::SecurityConfig;
use crate::handlers::{elevated::admin, protected, protected::containers, public};
use crate::middleware::{audit_requests, correlation_headers, require_capabilities, Guard};
use crate::state::AppState;

/// Put `router` behind a capability guard. Fails when a capability has no
/// role mapped, so a misconfigured gate stops startup.
fn guarded(
    router: Router<AppState>,
    state: &AppState,
    capabilities: &'static [Capability],
) -> Result<Router<AppState>, AuthError> {
    state.gate.validate(capabilities)?;
    Ok(router.route_layer(from_fn_with_state(
        Guard::new(state.clone(), capabilities),
        require_capabilities,
    )))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(public::status))
        .route("/auth/token", post(public::token))
}

fn authenticated_routes(state: &AppState) -> Result<Router<AppState>, AuthError> {
    guarded(
        Router::new().route("/status/auth", get(protected::status_auth)),
        state,
        &[Capability::User],
    )
}

fn container_routes(state: &AppState) -> Result<Router<AppState>, AuthError> {
    guarded(
        Router::new()
            .route("/containers", get(containers::containers_list))
            .route("/containers/tracking/:tracking_id", get(containers::container_by_tracking_id))
            .route("/containers/:container_id", get(containers::container_get)),
        state,
        &[Capability::ReadPublic],
    )
}

fn admin_routes(state: &AppState) -> Result<Router<AppState>, AuthError> {
    guarded(
        Router::new()
            .route("/admin/roles", get(admin::roles_list))
            .route("/admin/users", get(admin::users_list).post(admin::users_post))
            .route("/admin/user/:username", get(admin::user_get))
            .route(
                "/admin/user/:username/roles",
                get(admin::user_roles_get).put(admin::user_roles_put),
            )
            .route("/admin/user/:username/roles/:role", delete(admin::user_role_delete)),
        state,
        &[Capability::Admin],
    )
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Full application router.
///
/// Layers, outermost first: CORS, HTTP trace, correlation headers, audit,
/// then the per-route capability guard in front of each handler.
pub fn router(state: AppState) -> Result<Router, AuthError> {
    let routes = public_routes()
        .merge(authenticated_routes(&state)?)
        .merge(container_routes(&state)?)
        .merge(admin_routes(&state)?)
        .route_layer(from_fn_with_state(state.clone(), audit_requests));

    let app = routes
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(from_fn(correlation_headers))
        .layer(TraceLayer::new_for_http());

    let app = if state.config.security.enable_cors {
        app.layer(cors_layer(&state.config.security))
    } else {
        app
    };

    Ok(app.with_state(state))
}
