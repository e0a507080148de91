//! Query Translation
//!
//! Pattern-based handling of IoT Central query text:
//!
//! - **Detector**: find the projected `$ts` column (possibly aliased or aggregated)
//! - **Rewriter**: inject the dashboard time window as a `WITHIN_WINDOW` predicate
//!
//! This is deliberately not a SQL parser. A small fixed set of shapes is
//! recognised and everything else passes through untouched.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use iotc_datasource::query::{prepare_query, TimeRange};
//!
//! let range = TimeRange::new(
//!     Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2023, 1, 1, 1, 0, 0).unwrap(),
//! );
//! let prepared = prepare_query("SELECT $ts AS eventTime, temperature FROM device", &range);
//!
//! assert_eq!(prepared.timestamp_field.as_deref(), Some("eventTime"));
//! assert!(prepared.text.ends_with(
//!     "WHERE WITHIN_WINDOW('2023-01-01T00:00:00.000Z/2023-01-01T01:00:00.000Z')"
//! ));
//! ```

mod detector;
mod rewriter;
mod types;

pub use detector::{
    detect_timestamp_field, projection_list, timestamp_field_name, TIMESTAMP_MARKER,
};
pub use rewriter::{override_time_window, window_clause};
pub use types::{ProjectedField, Query, TimeRange};

/// Query text ready to be sent, with the detected timestamp column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQuery {
    /// Text to send (rewritten only when a timestamp column was found)
    pub text: String,
    /// Name of the timestamp output column
    pub timestamp_field: Option<String>,
}

/// Detect the timestamp projection and, when found, restrict the query to `range`
pub fn prepare_query(text: &str, range: &TimeRange) -> PreparedQuery {
    match timestamp_field_name(text) {
        Some(field) => PreparedQuery {
            text: override_time_window(text, range),
            timestamp_field: Some(field),
        },
        None => PreparedQuery {
            text: text.to_string(),
            timestamp_field: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 1, 1, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_prepare_with_timestamp() {
        let prepared = prepare_query("SELECT $ts AS eventTime, temperature FROM device", &range());
        assert_eq!(prepared.timestamp_field.as_deref(), Some("eventTime"));
        assert!(prepared
            .text
            .ends_with("WHERE WITHIN_WINDOW('2023-01-01T00:00:00.000Z/2023-01-01T01:00:00.000Z')"));
    }

    #[test]
    fn test_prepare_without_timestamp_leaves_text_alone() {
        let text = "SELECT temperature FROM device WHERE a = 1";
        let prepared = prepare_query(text, &range());
        assert_eq!(prepared.timestamp_field, None);
        assert_eq!(prepared.text, text);
    }
}
