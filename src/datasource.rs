//! IoT Central Datasource
//!
//! Runs dashboard query targets against the IoT Central query API.
//!
//! # Pipeline (per target)
//!
//! ```text
//! detect $ts → rewrite window → POST /api/query (retry on 429) → flatten → frame
//! ```
//!
//! All targets of a request run concurrently and share nothing. A failing
//! target yields an error entry in the response; the others are unaffected.
//! Results come back in target order, whatever order they complete in.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::client::{
    ClientError, HttpTransport, IoTCentralClient, RetryExecutor, RetryPolicy, Transport,
};
use crate::frame::{FrameBuilder, FrameError, TabularResult};
use crate::query::{prepare_query, Query, TimeRange};

/// Connection settings for one IoT Central application
#[derive(Debug, Clone)]
pub struct DataSourceSettings {
    /// Application URL, with or without scheme (e.g. "myapp.azureiotcentral.com")
    pub app_url: String,
    /// API token sent verbatim in the `Authorization` header
    pub api_token: String,
    /// Retry limits for throttled calls
    pub retry: RetryPolicy,
    /// Seed for the backoff jitter (entropy when unset)
    pub retry_seed: Option<u64>,
    /// Per-call HTTP timeout (none by default)
    pub request_timeout: Option<Duration>,
}

impl DataSourceSettings {
    pub fn new(app_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into(),
            api_token: api_token.into(),
            retry: RetryPolicy::default(),
            retry_seed: None,
            request_timeout: None,
        }
    }
}

/// A query request from the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQueryRequest {
    pub targets: Vec<Query>,
    pub range: TimeRange,
}

/// Outcome of one target
#[derive(Debug)]
pub struct TargetResult {
    pub ref_id: String,
    pub outcome: Result<TabularResult, DataSourceError>,
}

/// Outcomes of every target, in request order
#[derive(Debug)]
pub struct DataQueryResponse {
    pub results: Vec<TargetResult>,
}

impl DataQueryResponse {
    /// Frames of the targets that succeeded
    pub fn frames(&self) -> impl Iterator<Item = &TabularResult> {
        self.results.iter().filter_map(|r| r.outcome.as_ref().ok())
    }

    /// Whether any target failed
    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|r| r.outcome.is_err())
    }
}

/// Connectivity test result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

/// Errors for a single target
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Query cancelled")]
    Cancelled,
}

/// The datasource: one IoT Central application, many query targets
pub struct DataSource {
    client: IoTCentralClient,
}

impl DataSource {
    /// Create a datasource that talks HTTP
    pub fn new(settings: DataSourceSettings) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(settings.request_timeout)?;
        Ok(Self::with_transport(settings, Arc::new(transport)))
    }

    /// Create a datasource over a custom transport
    pub fn with_transport(settings: DataSourceSettings, transport: Arc<dyn Transport>) -> Self {
        let retry = match settings.retry_seed {
            Some(seed) => RetryExecutor::with_seed(settings.retry, seed),
            None => RetryExecutor::new(settings.retry),
        };
        let app_url = normalize_app_url(&settings.app_url);
        tracing::debug!(app_url = %app_url, "Configured IoT Central datasource");

        Self {
            client: IoTCentralClient::new(app_url, settings.api_token, transport, retry),
        }
    }

    pub fn client(&self) -> &IoTCentralClient {
        &self.client
    }

    /// Run every target of a request concurrently
    pub async fn query(&self, request: &DataQueryRequest) -> DataQueryResponse {
        self.query_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Run every target, stopping pending ones when `cancel` fires
    pub async fn query_with_cancellation(
        &self,
        request: &DataQueryRequest,
        cancel: &CancellationToken,
    ) -> DataQueryResponse {
        let range = request.range;

        let tasks = request.targets.iter().map(|target| {
            let token = cancel.child_token();
            let span = tracing::info_span!("target", ref_id = %target.ref_id);

            async move {
                let outcome = tokio::select! {
                    _ = token.cancelled() => Err(DataSourceError::Cancelled),
                    result = self.run_query(target, &range) => result,
                };

                if let Err(e) = &outcome {
                    tracing::warn!(error = %e, "Query target failed");
                }

                TargetResult {
                    ref_id: target.ref_id.clone(),
                    outcome,
                }
            }
            .instrument(span)
        });

        DataQueryResponse {
            results: join_all(tasks).await,
        }
    }

    /// Run a single target through the full pipeline
    pub async fn run_query(
        &self,
        query: &Query,
        range: &TimeRange,
    ) -> Result<TabularResult, DataSourceError> {
        let text = query.text();
        if text.trim().is_empty() {
            tracing::debug!("Empty query text, returning empty frame");
            return Ok(TabularResult::empty(&query.ref_id));
        }

        let prepared = prepare_query(text, range);
        match &prepared.timestamp_field {
            Some(field) => tracing::debug!(timestamp_field = %field, "Applied time window"),
            None => tracing::debug!("No timestamp projection, sending query unmodified"),
        }

        let records = self.client.execute(&prepared.text).await?;
        let frame = FrameBuilder::new(&query.ref_id, prepared.timestamp_field).build(&records)?;

        tracing::debug!(
            rows = frame.len(),
            columns = frame.columns.len(),
            "Built frame"
        );
        Ok(frame)
    }

    /// Connectivity test. Reports success without contacting the remote API.
    pub async fn test_datasource(&self) -> HealthCheck {
        HealthCheck {
            status: "success".to_string(),
            message: "Success".to_string(),
        }
    }
}

/// Strip the scheme and trailing slash from an application URL
pub fn normalize_app_url(url: &str) -> String {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    let without_scheme = if lower.starts_with("https://") {
        &trimmed["https://".len()..]
    } else if lower.starts_with("http://") {
        &trimmed["http://".len()..]
    } else {
        trimmed
    };
    without_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FieldType;
    use crate::testing::{Reply, ScriptedTransport};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 1, 1, 0, 0).unwrap(),
        )
    }

    fn datasource(transport: Arc<ScriptedTransport>) -> DataSource {
        let mut settings = DataSourceSettings::new("https://app.example.com/", "token");
        settings.retry_seed = Some(9);
        DataSource::with_transport(settings, transport)
    }

    #[test]
    fn test_normalize_app_url() {
        assert_eq!(normalize_app_url("https://a.example.com"), "a.example.com");
        assert_eq!(normalize_app_url("HTTP://a.example.com/"), "a.example.com");
        assert_eq!(normalize_app_url("a.example.com"), "a.example.com");
    }

    #[tokio::test]
    async fn test_run_query_rewrites_and_builds_frame() {
        let transport = Arc::new(ScriptedTransport::new().on(
            "temperature",
            vec![Reply::Ok(json!({"results": [
                {"eventTime": "2023-01-01T00:10:00Z", "temperature": 21.5, "device": {"id": "d1"}},
                {"eventTime": "2023-01-01T00:20:00Z", "temperature": 22.0}
            ]}))],
        ));
        let ds = datasource(transport.clone());

        let frame = ds
            .run_query(
                &Query::new("A", "SELECT $ts AS eventTime, temperature FROM device"),
                &range(),
            )
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].body.query,
            "SELECT $ts AS eventTime, temperature FROM device WHERE WITHIN_WINDOW('2023-01-01T00:00:00.000Z/2023-01-01T01:00:00.000Z')"
        );
        assert_eq!(
            sent[0].url,
            "https://app.example.com/api/query?api-version=1.1-preview"
        );
        assert_eq!(sent[0].authorization, "token");

        assert_eq!(frame.ref_id, "A");
        assert_eq!(frame.columns[0].field_type, FieldType::Time);
        assert_eq!(frame.rows[0][0], json!(1672531800000i64));
        assert_eq!(frame.rows[1][2], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_query_without_timestamp_is_sent_unmodified() {
        let transport = Arc::new(
            ScriptedTransport::new().on("count", vec![Reply::Ok(json!({"results": [{"count": 3}]}))]),
        );
        let ds = datasource(transport.clone());

        let frame = ds
            .run_query(&Query::new("A", "SELECT count() FROM device"), &range())
            .await
            .unwrap();

        assert_eq!(transport.sent()[0].body.query, "SELECT count() FROM device");
        assert!(frame.time_column().is_none());
    }

    #[tokio::test]
    async fn test_empty_query_does_not_call_api() {
        let transport = Arc::new(ScriptedTransport::new());
        let ds = datasource(transport.clone());

        let frame = ds
            .run_query(&Query::new("A", "   "), &range())
            .await
            .unwrap();

        assert!(frame.is_empty());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_response_fails_target() {
        let transport = Arc::new(
            ScriptedTransport::new().on("FROM", vec![Reply::Ok(json!({"value": []}))]),
        );
        let ds = datasource(transport);

        let err = ds
            .run_query(&Query::new("A", "SELECT a FROM b"), &range())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DataSourceError::Client(ClientError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_scalar_results_fail_target() {
        let transport = Arc::new(
            ScriptedTransport::new().on("FROM", vec![Reply::Ok(json!({"results": [1, 2]}))]),
        );
        let ds = datasource(transport);

        let err = ds
            .run_query(&Query::new("A", "SELECT a FROM b"), &range())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DataSourceError::Frame(FrameError::NonObjectRecord { index: 0 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_keeps_order_and_isolates_failures() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(
                    "slow",
                    vec![Reply::Delayed(
                        Duration::from_secs(5),
                        json!({"results": [{"v": 1}]}),
                    )],
                )
                .on("broken", vec![Reply::Status(500)])
                .on("throttled", vec![Reply::RateLimited])
                .on("fast", vec![Reply::Ok(json!({"results": [{"v": 2}]}))]),
        );
        let ds = datasource(transport.clone());

        let request = DataQueryRequest {
            targets: vec![
                Query::new("A", "SELECT v FROM slow"),
                Query::new("B", "SELECT v FROM broken"),
                Query::new("C", "SELECT v FROM throttled"),
                Query::new("D", "SELECT v FROM fast"),
            ],
            range: range(),
        };

        let response = ds.query(&request).await;
        let ref_ids: Vec<&str> = response.results.iter().map(|r| r.ref_id.as_str()).collect();
        assert_eq!(ref_ids, vec!["A", "B", "C", "D"]);

        assert_eq!(response.results[0].outcome.as_ref().unwrap().rows[0][0], json!(1));
        assert!(matches!(
            response.results[1].outcome,
            Err(DataSourceError::Client(ClientError::Api { status: 500, .. }))
        ));
        assert!(matches!(
            response.results[2].outcome,
            Err(DataSourceError::Client(ClientError::RateLimited))
        ));
        assert_eq!(response.results[3].outcome.as_ref().unwrap().rows[0][0], json!(2));

        assert!(response.has_errors());
        assert_eq!(response.frames().count(), 2);
        assert_eq!(transport.count("broken"), 1);
        assert_eq!(transport.count("throttled"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_pending_targets() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on("hang", vec![Reply::Hang])
                .on("fast", vec![Reply::Ok(json!({"results": []}))]),
        );
        let ds = datasource(transport);

        let request = DataQueryRequest {
            targets: vec![
                Query::new("A", "SELECT v FROM hang"),
                Query::new("B", "SELECT v FROM fast"),
            ],
            range: range(),
        };

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let response = ds.query_with_cancellation(&request, &cancel).await;
        assert!(matches!(
            response.results[0].outcome,
            Err(DataSourceError::Cancelled)
        ));
        assert!(response.results[1].outcome.is_ok());
    }

    #[tokio::test]
    async fn test_connectivity_check_does_not_touch_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let ds = datasource(transport.clone());

        let health = ds.test_datasource().await;
        assert_eq!(health.status, "success");
        assert_eq!(health.message, "Success");
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_request_deserializes_from_dashboard_shape() {
        let request: DataQueryRequest = serde_json::from_value(json!({
            "targets": [{"refId": "A", "queryText": "SELECT $ts FROM d"}, {"refId": "B"}],
            "range": {"from": "2023-01-01T00:00:00Z", "to": "2023-01-01T01:00:00Z"}
        }))
        .unwrap();
        assert_eq!(request.targets.len(), 2);
        assert_eq!(request.targets[1].text(), "");
        assert_eq!(request.range, range());
    }
}
