//! Query Routes
//!
//! - POST /api/v1/query - Run dashboard query targets
//! - POST /api/v1/test  - Datasource connectivity test

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{QueryRequest, QueryResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::datasource::HealthCheck;

/// POST /api/v1/query
///
/// Runs every target concurrently. Failed targets are reported per entry;
/// the request itself still succeeds.
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> ApiResult<Json<QueryResponse>> {
    if req.targets.is_empty() {
        return Err(ApiError::NoTargets);
    }
    if req.range.from > req.range.to {
        return Err(ApiError::InvertedRange {
            from: req.range.from,
            to: req.range.to,
        });
    }

    tracing::info!(targets = req.targets.len(), "Executing query request");

    let response = state.datasource.query(&req).await;
    if response.has_errors() {
        tracing::warn!(
            failed = response.results.iter().filter(|r| r.outcome.is_err()).count(),
            "Some query targets failed"
        );
    }

    Ok(Json(response.into()))
}

/// POST /api/v1/test
pub async fn test_datasource(State(state): State<Arc<AppState>>) -> Json<HealthCheck> {
    Json(state.datasource.test_datasource().await)
}
