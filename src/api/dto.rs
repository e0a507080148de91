//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::Serialize;

use crate::datasource::{DataQueryResponse, TargetResult};
use crate::frame::TabularResult;

// ============================================
// QUERY DTOs
// ============================================

/// Query request body: `{ targets: [{ refId, queryText }], range: { from, to } }`
pub use crate::datasource::DataQueryRequest as QueryRequest;

/// Query response: one entry per target, in request order
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub results: Vec<TargetResultDto>,
}

/// Frame or error for one target
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResultDto {
    pub ref_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<TabularResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<TargetResult> for TargetResultDto {
    fn from(result: TargetResult) -> Self {
        match result.outcome {
            Ok(frame) => Self {
                ref_id: result.ref_id,
                frame: Some(frame),
                error: None,
            },
            Err(e) => Self {
                ref_id: result.ref_id,
                frame: None,
                error: Some(e.to_string()),
            },
        }
    }
}

impl From<DataQueryResponse> for QueryResponse {
    fn from(response: DataQueryResponse) -> Self {
        Self {
            results: response.results.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub version: String,
}
