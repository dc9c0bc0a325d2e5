use axum::extract::State;
use serde::Serialize;

use crate::middleware::ApiResponse;
use crate::state::AppState;

pub const SERVICE_NAME: &str = "vbr-api";

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub service: &'static str,
    pub version: String,
    pub tenant: String,
    pub status: &'static str,
    pub uptime: i64,
}

/// Package version, suffixed with `BUILD_VERSION` when that is set.
pub fn version() -> String {
    match std::env::var("BUILD_VERSION") {
        Ok(build) if !build.is_empty() => format!("{}-{}", env!("CARGO_PKG_VERSION"), build),
        _ => env!("CARGO_PKG_VERSION").to_string(),
    }
}

pub fn service_status(state: &AppState) -> ServiceStatus {
    ServiceStatus {
        service: SERVICE_NAME,
        version: version(),
        tenant: state.config.identity.tenant_id.clone(),
        status: "OK",
        uptime: state.uptime_secs(),
    }
}

/// GET /status - Liveness and version check
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {"service": "vbr-api", "version": "0.3.0", "tenant": "tacc", "status": "OK", "uptime": 42}
/// }
/// ```
pub async fn status(State(state): State<AppState>) -> ApiResponse<ServiceStatus> {
    ApiResponse::success(service_status(&state))
}
