//! IoT Central Datasource Bridge
//!
//! Run with: cargo run --bin iotc-datasource
//!
//! # Configuration
//!
//! Read from the first of `<config dir>/iotc-datasource/config.toml`,
//! `/etc/iotc-datasource/config.toml` or `./config.toml`, then overridden by
//! environment variables:
//! - `IOTC_APP_URL`: IoT Central application URL
//! - `IOTC_API_TOKEN`: API token
//! - `IOTC_RETRY_ATTEMPTS`: Attempts for throttled queries (default: 4)
//! - `IOTC_API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `IOTC_API_PORT`: Port to listen on (default: 8090)
//! - `IOTC_LOG_LEVEL` / `IOTC_LOG_FORMAT`: Logging (default: info / pretty)
//! - `RUST_LOG`: Overrides the log filter

use iotc_datasource::api::{serve, AppState};
use iotc_datasource::config::Config;
use iotc_datasource::datasource::DataSource;
use iotc_datasource::logging::init_logging;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default();
    init_logging(&config.logging)?;

    tracing::info!(
        "Starting IoT Central datasource bridge v{}",
        env!("CARGO_PKG_VERSION")
    );

    config.validate()?;

    let datasource = Arc::new(DataSource::new(config.datasource_settings())?);
    tracing::info!(
        app_url = %datasource.client().app_url(),
        max_attempts = config.retry.max_attempts,
        "Datasource configured"
    );

    serve(AppState::new(datasource), &config.api).await?;

    Ok(())
}
