//! IoT Central Datasource CLI
//!
//! Command-line interface for running dashboard queries directly against an
//! IoT Central application:
//! - Run one or more queries for a time window
//! - Test the datasource configuration
//! - Print a default config file

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::{Parser, Subcommand};
use iotc_datasource::config::{generate_default_config, Config};
use iotc_datasource::datasource::{DataQueryRequest, DataSource};
use iotc_datasource::frame::{FieldType, TabularResult};
use iotc_datasource::logging::init_logging;
use iotc_datasource::query::{Query, TimeRange};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iotc-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run IoT Central queries as time-series tables")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// IoT Central application URL (overrides config)
    #[arg(long, global = true)]
    pub app_url: Option<String>,

    /// API token (overrides config)
    #[arg(long, global = true)]
    pub api_token: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run queries; each one becomes a target A, B, C, ...
    Query {
        /// Query texts
        #[arg(required = true)]
        queries: Vec<String>,
        /// Window ending now (e.g. 15m, 6h, 7d)
        #[arg(short, long, default_value = "1h")]
        last: String,
        /// Window start (RFC 3339), overrides --last
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Window end (RFC 3339)
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Test the datasource configuration
    Test,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        command,
        config,
        app_url,
        api_token,
        format,
    } = Cli::parse();

    match command {
        Commands::Config { output } => write_default_config(output),

        Commands::Test => {
            let datasource = build_datasource(config, app_url, api_token)?;
            let health = datasource.test_datasource().await;
            println!("{}: {}", health.status, health.message);
            Ok(())
        }

        Commands::Query {
            queries,
            last,
            from,
            to,
        } => {
            let datasource = build_datasource(config, app_url, api_token)?;
            let range = match (from, to) {
                (Some(from), Some(to)) => TimeRange::new(parse_instant(&from)?, parse_instant(&to)?),
                _ => TimeRange::last(parse_window(&last)?),
            };

            let request = DataQueryRequest {
                targets: queries
                    .iter()
                    .enumerate()
                    .map(|(i, text)| Query::new(ref_id(i), text.as_str()))
                    .collect(),
                range,
            };

            let response = datasource.query(&request).await;
            let mut failed = 0;

            for result in &response.results {
                match &result.outcome {
                    Ok(frame) => match format.as_str() {
                        "json" => println!("{}", serde_json::to_string_pretty(frame)?),
                        _ => print_table(frame),
                    },
                    Err(e) => {
                        failed += 1;
                        eprintln!("[{}] error: {}", result.ref_id, e);
                    }
                }
            }

            if failed > 0 {
                bail!("{} of {} queries failed", failed, response.results.len());
            }
            Ok(())
        }
    }
}

fn write_default_config(output: Option<PathBuf>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(&path, content)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Config written to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Load config, apply command-line overrides and build the datasource
fn build_datasource(
    path: Option<PathBuf>,
    app_url: Option<String>,
    api_token: Option<String>,
) -> anyhow::Result<DataSource> {
    let mut config = match path {
        Some(path) => Config::load_with_env(&path)?,
        None => Config::load_default(),
    };
    if let Some(app_url) = app_url {
        config.datasource.app_url = app_url;
    }
    if let Some(token) = api_token {
        config.datasource.api_token = token;
    }

    init_logging(&config.logging)?;
    config.validate()?;

    Ok(DataSource::new(config.datasource_settings())?)
}

/// Target ids A..Z, then AA, AB, ...
fn ref_id(index: usize) -> String {
    let mut n = index;
    let mut id = Vec::new();
    loop {
        id.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    id.reverse();
    String::from_utf8_lossy(&id).into_owned()
}

fn parse_instant(s: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(ms) = s.parse::<i64>() {
        if let Some(dt) = Utc.timestamp_millis_opt(ms).single() {
            return Ok(dt);
        }
    }
    bail!("Invalid timestamp: {}", s)
}

fn parse_window(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let (num, unit) = match s.char_indices().last() {
        Some((i, _)) => s.split_at(i),
        None => bail!("Empty window"),
    };
    let n: i64 = num
        .parse()
        .with_context(|| format!("Invalid window: {}", s))?;

    match unit {
        "s" => Ok(Duration::seconds(n)),
        "m" => Ok(Duration::minutes(n)),
        "h" => Ok(Duration::hours(n)),
        "d" => Ok(Duration::days(n)),
        "w" => Ok(Duration::weeks(n)),
        _ => bail!("Invalid window unit in {} (use s, m, h, d, w)", s),
    }
}

fn print_table(frame: &TabularResult) {
    println!("[{}] {} rows", frame.ref_id, frame.len());
    if frame.columns.is_empty() {
        return;
    }

    let header: Vec<&str> = frame.columns.iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join("\t"));

    for row in &frame.rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&frame.columns)
            .map(|(value, column)| match (column.field_type, value) {
                (FieldType::Time, serde_json::Value::Number(n)) => n
                    .as_i64()
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| n.to_string()),
                (_, serde_json::Value::Null) => String::new(),
                (_, serde_json::Value::String(s)) => s.clone(),
                (_, other) => other.to_string(),
            })
            .collect();
        println!("{}", cells.join("\t"));
    }
    println!();
}
