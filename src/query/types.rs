//! Query model types
//!
//! The values a dashboard submits: the query text with its correlation id,
//! and the time window shared by every target of a request.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single query target submitted by the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Caller-assigned identifier used to correlate the response
    pub ref_id: String,
    /// Raw query text (may be missing when the editor is empty)
    #[serde(default)]
    pub query_text: Option<String>,
}

impl Query {
    /// Create a query target
    pub fn new(ref_id: impl Into<String>, query_text: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            query_text: Some(query_text.into()),
        }
    }

    /// Query text, empty when none was supplied
    pub fn text(&self) -> &str {
        self.query_text.as_deref().unwrap_or_default()
    }
}

/// Inclusive time window for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Create a time range
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Time range ending now and covering the given duration
    pub fn last(duration: chrono::Duration) -> Self {
        let to = Utc::now();
        Self {
            from: to - duration,
            to,
        }
    }

    /// `from/to` with millisecond ISO-8601 timestamps, e.g.
    /// `2023-01-01T00:00:00.000Z/2023-01-01T01:00:00.000Z`
    pub fn to_window_literal(&self) -> String {
        format!(
            "{}/{}",
            self.from.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.to.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// The projection that carries the event timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedField {
    /// Name of the output column
    pub name: String,
    /// Reducer wrapping the timestamp, lowercased (e.g. `min`)
    pub aggregator: Option<String>,
}
