use async_trait::async_trait;
use serde_json::Value;

use super::{ViewQuery, ViewQueryError};
use crate::filter::FilterQuery;
use crate::provider::TapisClient;

/// Views served by the provider's PgREST endpoint.
#[derive(Debug, Clone)]
pub struct PgRestClient {
    tapis: TapisClient,
}

impl PgRestClient {
    pub fn new(tapis: TapisClient) -> Self {
        Self { tapis }
    }
}

/// `limit`, `offset`, then one `where_<field>.<op>=<value>` pair per expression.
pub fn query_pairs(query: &FilterQuery, limit: u32, offset: u32) -> Vec<(String, String)> {
    let mut pairs = vec![
        ("limit".to_string(), limit.to_string()),
        ("offset".to_string(), offset.to_string()),
    ];
    pairs.extend(query.iter().map(|(field, expression)| {
        (
            format!("where_{}.{}", field, expression.operator),
            expression.value.clone(),
        )
    }));
    pairs
}

#[async_trait]
impl ViewQuery for PgRestClient {
    async fn query_view_rows(
        &self,
        token: &str,
        view: &str,
        query: &FilterQuery,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Value>, ViewQueryError> {
        let url = self.tapis.endpoint(&["pgrest", "views", view])?;
        let request = self.tapis.get(token, url).query(&query_pairs(query, limit, offset));
        tracing::debug!("Querying view {} with {} filters", view, query.len());
        Ok(TapisClient::send::<Vec<Value>>(request).await?)
    }
}
