//! HTTP transport
//!
//! The executor talks to the remote API through the [`Transport`] trait so
//! the retry loop and the result shaping can run against a scripted
//! transport in tests.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use super::error::{ClientError, ClientResult};

/// Body of a query API call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryBody {
    pub query: String,
}

/// Everything needed to issue one query API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub url: String,
    pub authorization: String,
    pub body: QueryBody,
}

/// Sends a query request and returns the decoded JSON response body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &QueryRequest) -> ClientResult<serde_json::Value>;
}

/// [`Transport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport. Without a timeout a hanging call is not time-boxed.
    pub fn new(timeout: Option<Duration>) -> ClientResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ClientError::Request)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &QueryRequest) -> ClientResult<serde_json::Value> {
        let response = self
            .client
            .post(&request.url)
            .header(reqwest::header::AUTHORIZATION, &request.authorization)
            .json(&request.body)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }
}
