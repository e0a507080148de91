//! IoT Central Query Client
//!
//! Executes query text against the remote telemetry API.
//!
//! ## Architecture
//!
//! - **Transport**: one HTTP call (`reqwest`), swappable for tests
//! - **RetryExecutor**: up to 4 attempts, jittered 0.5-2s backoff on HTTP 429
//! - **IoTCentralClient**: builds the request and extracts `results`

mod central;
mod error;
mod retry;
mod transport;

pub use central::{extract_results, IoTCentralClient, API_VERSION};
pub use error::{ClientError, ClientResult};
pub use retry::{RetryExecutor, RetryPolicy};
pub use transport::{HttpTransport, QueryBody, QueryRequest, Transport};
