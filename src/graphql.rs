//! GraphQL client
//!
//! Sends one query per request and folds every outcome into
//! `Result<Value, QueryError>`. Reporting failures to the user is left to
//! the caller.

use crate::config::DashboardConfig;
use crate::credentials::SessionToken;
use crate::error::{QueryError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, warn};
use url::Url;

/// Anything that can run a GraphQL query on behalf of a session
pub trait QueryExecutor {
    /// Run `query` and return its `data` object
    fn execute(
        &self,
        query: &str,
        token: &SessionToken,
    ) -> impl Future<Output = std::result::Result<Value, QueryError>> + Send;
}

/// HTTPS client for the GraphQL endpoint
#[derive(Debug, Clone)]
pub struct GraphQLClient {
    client: reqwest::Client,
    url: Url,
}

impl GraphQLClient {
    /// Create a client for the endpoint named in `config`
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        Self::with_url(config.graphql_url()?)
    }

    /// Create a client posting to an explicit GraphQL URL
    pub fn with_url(url: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("profile-dash/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl QueryExecutor for GraphQLClient {
    async fn execute(
        &self,
        query: &str,
        token: &SessionToken,
    ) -> std::result::Result<Value, QueryError> {
        debug!("POST {}", self.url);

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(token.as_str())
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| {
                warn!("GraphQL request did not complete: {}", e);
                QueryError::Transport(e.to_string())
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let result = classify_response(status, &body);
        if let Err(ref e) = result {
            warn!("GraphQL query failed: {}", e);
        }
        result
    }
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQLErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorEntry {
    #[serde(default)]
    message: String,
}

/// Classify a response by status code and body text.
///
/// A 2xx response with a non-empty `errors` list is a failure even though
/// the transport succeeded.
pub fn classify_response(status: u16, body: &str) -> std::result::Result<Value, QueryError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| body.to_string());

        return Err(QueryError::HttpStatus { status, message });
    }

    let payload: GraphQLResponse = serde_json::from_str(body)
        .map_err(|e| QueryError::Transport(format!("invalid response body: {}", e)))?;

    match payload.errors {
        Some(errors) if !errors.is_empty() => Err(QueryError::GraphQL(
            errors.into_iter().map(|e| e.message).collect(),
        )),
        _ => Ok(payload.data.unwrap_or(Value::Null)),
    }
}
