use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::Value;

use super::query_containers;
use crate::filter::{to_query, ParameterValue};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Optional filters; each value may carry an operator prefix (`!lost`,
/// `*Austin`, `>=10`).
#[derive(Debug, Default, Deserialize)]
pub struct ContainerFilters {
    pub container_id: Option<String>,
    pub container_tracking_id: Option<String>,
    pub container_type: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub project: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// GET /containers - List containers matching the given filters
///
/// Expected Output:
/// ```json
/// {"success": true, "data": [{"container_id": 1, "container_tracking_id": "A0001", "status": "present"}]}
/// ```
pub async fn containers_list(
    State(state): State<AppState>,
    Query(filters): Query<ContainerFilters>,
) -> ApiResult<Vec<Value>> {
    let query = to_query([
        ("container_id", filters.container_id.map(ParameterValue::from)),
        ("container_tracking_id", filters.container_tracking_id.map(ParameterValue::from)),
        ("container_type", filters.container_type.map(ParameterValue::from)),
        ("location", filters.location.map(ParameterValue::from)),
        ("status", filters.status.map(ParameterValue::from)),
        ("project", filters.project.map(ParameterValue::from)),
    ]);

    let limit = filters.limit.unwrap_or(state.config.api.default_page_size);
    let offset = filters.offset.unwrap_or(0);
    let rows = query_containers(&state, &query, limit, offset).await?;
    Ok(ApiResponse::success(rows))
}
