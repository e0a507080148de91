//! IoT Central query API client
//!
//! Posts query text to `https://<app>/api/query?api-version=1.1-preview`
//! and returns the `results` array of the response.

use serde_json::Value;
use std::sync::Arc;

use super::error::{ClientError, ClientResult};
use super::retry::RetryExecutor;
use super::transport::{QueryBody, QueryRequest, Transport};

/// API version sent with every query call
pub const API_VERSION: &str = "1.1-preview";

/// Client for the IoT Central query API
pub struct IoTCentralClient {
    app_url: String,
    api_token: String,
    transport: Arc<dyn Transport>,
    retry: RetryExecutor,
}

impl IoTCentralClient {
    /// Create a client. `app_url` is the application host without a scheme.
    pub fn new(
        app_url: impl Into<String>,
        api_token: impl Into<String>,
        transport: Arc<dyn Transport>,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            app_url: app_url.into(),
            api_token: api_token.into(),
            transport,
            retry,
        }
    }

    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    /// URL of the query endpoint
    pub fn query_url(&self) -> String {
        format!("https://{}/api/query?api-version={}", self.app_url, API_VERSION)
    }

    /// Build the request for a query text
    pub fn request(&self, query: &str) -> QueryRequest {
        QueryRequest {
            url: self.query_url(),
            authorization: self.api_token.clone(),
            body: QueryBody {
                query: query.to_string(),
            },
        }
    }

    /// Run a query, retrying on throttling, and return its result records
    pub async fn execute(&self, query: &str) -> ClientResult<Vec<Value>> {
        let request = self.request(query);
        let body = self
            .retry
            .execute(|| self.transport.send(&request))
            .await?;
        extract_results(body)
    }
}

/// Pull the `results` array out of a response body
pub fn extract_results(body: Value) -> ClientResult<Vec<Value>> {
    match body {
        Value::Object(mut object) => match object.remove("results") {
            Some(Value::Array(results)) => Ok(results),
            Some(other) => Err(ClientError::MalformedResponse(format!(
                "`results` is not an array: {}",
                other
            ))),
            None => Err(ClientError::MalformedResponse(
                "missing `results` field".to_string(),
            )),
        },
        other => Err(ClientError::MalformedResponse(format!(
            "expected an object, got {}",
            other
        ))),
    }
}
