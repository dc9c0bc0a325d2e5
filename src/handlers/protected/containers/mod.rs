// handlers/protected/containers - read-only container lookups
//
// Rows come from the `containers_public` view, queried with the service
// account so callers never need view-level grants of their own.
pub mod get;
pub mod list;

pub use get::{container_get, container_by_tracking_id};
pub use list::containers_list;

use serde_json::Value;

use crate::error::ApiError;
use crate::filter::FilterQuery;
use crate::state::AppState;
use crate::views::ViewQueryError;

pub const CONTAINERS_VIEW: &str = "containers_public";

pub(crate) async fn query_containers(
    state: &AppState,
    query: &FilterQuery,
    limit: u32,
    offset: u32,
) -> Result<Vec<Value>, ApiError> {
    let token = state.service.token().await.map_err(ViewQueryError::ServiceAccount)?;
    Ok(state
        .views
        .query_view_rows(token, CONTAINERS_VIEW, query, limit, offset)
        .await?)
}
