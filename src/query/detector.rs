//! Timestamp Projection Detector
//!
//! Finds the output column that carries the `$ts` event timestamp in the
//! projection list of a query. Detection is lexical: the text between the
//! first `SELECT` and the following `FROM` is split on commas and each
//! candidate is tested against four shapes, in this order:
//!
//! ```text
//! $ts                  -> $ts
//! $ts AS eventTime     -> eventTime
//! MIN($ts)             -> min_$ts
//! MIN($ts) AS first    -> min_first
//! ```
//!
//! Quoting and nested calls are not understood. A candidate such as
//! `max(min($ts))` or `'a,b'` is simply not recognised.

use regex::Regex;
use std::sync::OnceLock;

use crate::query::types::ProjectedField;

/// The special token marking the event timestamp
pub const TIMESTAMP_MARKER: &str = "$ts";

struct Patterns {
    select_from: Regex,
    bare: Regex,
    alias: Regex,
    aggregate: Regex,
    aggregate_alias: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        select_from: Regex::new(r"(?is)\bselect\s+(?P<attributes>.*?)\s+from\b")
            .expect("select/from pattern"),
        bare: Regex::new(r"^\s*\$ts\s*$").expect("bare pattern"),
        alias: Regex::new(r"^\s*\$ts\s+(?i:as)\s+(?P<alias>\S+)\s*$").expect("alias pattern"),
        aggregate: Regex::new(r"^\s*(?P<aggregator>\w+)\(\s*\$ts\s*\)\s*$")
            .expect("aggregate pattern"),
        aggregate_alias: Regex::new(
            r"^\s*(?P<aggregator>\w+)\(\s*\$ts\s*\)\s+(?i:as)\s+(?P<alias>\S+)\s*$",
        )
        .expect("aggregate alias pattern"),
    })
}

/// Return the projection list between `SELECT` and `FROM`, if any
pub fn projection_list(query: &str) -> Option<&str> {
    patterns()
        .select_from
        .captures(query)
        .and_then(|caps| caps.name("attributes"))
        .map(|m| m.as_str())
}

/// Detect the timestamp-bearing projection of a query.
///
/// Returns `None` when the query has no `SELECT ... FROM` boundary or no
/// candidate matches. That is not an error: the query then runs without a
/// time window and without a typed time column.
pub fn detect_timestamp_field(query: &str) -> Option<ProjectedField> {
    let attributes = projection_list(query)?;
    attributes.split(',').find_map(match_candidate)
}

/// Name of the timestamp output column, if one is projected
pub fn timestamp_field_name(query: &str) -> Option<String> {
    detect_timestamp_field(query).map(|field| field.name)
}

fn match_candidate(candidate: &str) -> Option<ProjectedField> {
    let p = patterns();

    if p.bare.is_match(candidate) {
        return Some(ProjectedField {
            name: TIMESTAMP_MARKER.to_string(),
            aggregator: None,
        });
    }

    if let Some(caps) = p.alias.captures(candidate) {
        return Some(ProjectedField {
            name: caps["alias"].to_string(),
            aggregator: None,
        });
    }

    if let Some(caps) = p.aggregate.captures(candidate) {
        let aggregator = caps["aggregator"].to_lowercase();
        return Some(ProjectedField {
            name: format!("{}_{}", aggregator, TIMESTAMP_MARKER),
            aggregator: Some(aggregator),
        });
    }

    if let Some(caps) = p.aggregate_alias.captures(candidate) {
        let aggregator = caps["aggregator"].to_lowercase();
        return Some(ProjectedField {
            name: format!("{}_{}", aggregator, &caps["alias"]),
            aggregator: Some(aggregator),
        });
    }

    None
}
