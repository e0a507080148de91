//! # IoT Central Datasource
//!
//! Translates dashboard queries into IoT Central query API calls and shapes
//! the results into typed tables for time-series visualization.
//!
//! ## Features
//!
//! - **Timestamp detection**: finds the projected `$ts` column, aliased or aggregated
//! - **Time windows**: injects the dashboard range as a `WITHIN_WINDOW` predicate
//! - **Flattening**: nested JSON results become dotted, typed columns
//! - **Resilience**: throttled calls retry with jittered backoff
//! - **Fan-out**: all targets of a request run concurrently, failures stay local
//!
//! ## Modules
//!
//! - [`query`]: Timestamp detection and time-window rewriting
//! - [`frame`]: Result flattening, schema inference and tabular results
//! - [`client`]: HTTP transport and retrying executor
//! - [`datasource`]: Per-target pipeline and concurrent fan-out
//! - [`api`]: HTTP bridge for the dashboard host
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use iotc_datasource::datasource::{DataQueryRequest, DataSource, DataSourceSettings};
//! use iotc_datasource::query::{Query, TimeRange};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let datasource = DataSource::new(DataSourceSettings::new(
//!         "myapp.azureiotcentral.com",
//!         "SharedAccessSignature sr=...",
//!     ))?;
//!
//!     let request = DataQueryRequest {
//!         targets: vec![Query::new("A", "SELECT $ts AS eventTime, temperature FROM dtmi:x:y;1")],
//!         range: TimeRange::last(chrono::Duration::hours(1)),
//!     };
//!
//!     for result in datasource.query(&request).await.results {
//!         match result.outcome {
//!             Ok(frame) => println!("{}: {} rows", frame.ref_id, frame.len()),
//!             Err(e) => eprintln!("{}: {}", result.ref_id, e),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod datasource;
pub mod frame;
pub mod logging;
pub mod query;

#[cfg(test)]
mod testing;

// Re-export top-level types for convenience
pub use query::{
    detect_timestamp_field, override_time_window, prepare_query, PreparedQuery, ProjectedField,
    Query, TimeRange,
};

pub use frame::{
    flatten_record, Column, ColumnSchema, FieldType, FlatRecord, FrameBuilder, FrameError,
    TabularResult,
};

pub use client::{
    ClientError, HttpTransport, IoTCentralClient, QueryRequest, RetryExecutor, RetryPolicy,
    Transport,
};

pub use datasource::{
    DataQueryRequest, DataQueryResponse, DataSource, DataSourceError, DataSourceSettings,
    HealthCheck, TargetResult,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{
    ApiConfig, Config, ConfigError, DataSourceConfig, LoggingConfig, RetryConfig,
};
