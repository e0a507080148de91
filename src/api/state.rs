//! Application State
//!
//! Shared state accessible by all API handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::datasource::DataSource;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Datasource that runs query targets
    pub datasource: Arc<DataSource>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(datasource: Arc<DataSource>) -> Self {
        Self {
            datasource,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
