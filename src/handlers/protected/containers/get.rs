use axum::extract::{Path, State};
use serde_json::Value;

use super::query_containers;
use crate::error::ApiError;
use crate::filter::{FilterExpression, FilterQuery};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

async fn single(state: &AppState, field: &str, value: String) -> ApiResult<Value> {
    let query = FilterQuery::from([(field.to_string(), FilterExpression::eq(field, value.clone()))]);
    let row = query_containers(state, &query, 1, 0)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("Container {} not found", value)))?;
    Ok(ApiResponse::success(row))
}

/// GET /containers/:container_id - One container by numeric id
pub async fn container_get(State(state): State<AppState>, Path(container_id): Path<i64>) -> ApiResult<Value> {
    single(&state, "container_id", container_id.to_string()).await
}

/// GET /containers/tracking/:tracking_id - One container by tracking id
pub async fn container_by_tracking_id(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> ApiResult<Value> {
    single(&state, "container_tracking_id", tracking_id).await
}
