pub mod pgrest;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::filter::FilterQuery;
use crate::provider::ProviderError;

pub use pgrest::PgRestClient;

#[derive(Debug, Error)]
pub enum ViewQueryError {
    /// The privileged session could not be established.
    #[error("service account unavailable: {0}")]
    ServiceAccount(ProviderError),

    #[error("view query failed: {0}")]
    Upstream(#[from] ProviderError),
}

/// Read-only access to named relational views.
#[async_trait]
pub trait ViewQuery: Send + Sync {
    async fn query_view_rows(
        &self,
        token: &str,
        view: &str,
        query: &FilterQuery,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Value>, ViewQueryError>;
}
