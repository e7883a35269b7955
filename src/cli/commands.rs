//! CLI command implementations
//!
//! `init` writes a starter config, `start` boots the HTTP server, and
//! `query` runs one filter request against the data file and prints
//! the NDJSON event stream to stdout.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::http_server::{HttpServer, HttpServerConfig};
use crate::observability::Logger;
use crate::scanner::{RecordScanner, ScanEvent, ScanRequest};
use crate::store::{MemoryStore, TreeStore};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the JSON survey data file (required)
    pub data_file: String,

    /// Cutover timestamp separating phase 1 from phase 2 (RFC3339)
    pub cutover: String,

    /// HTTP bind host (optional, default "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port (optional, default 7321)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins (optional, empty = permissive)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7321
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> CliResult<()> {
        if self.data_file.is_empty() {
            return Err(CliError::config_error("data_file must not be empty"));
        }
        if self.port == 0 {
            return Err(CliError::config_error("port must be > 0"));
        }
        self.cutover_millis()?;
        Ok(())
    }

    /// Cutover as epoch millis
    pub fn cutover_millis(&self) -> CliResult<i64> {
        DateTime::parse_from_rfc3339(&self.cutover)
            .map(|dt| dt.timestamp_millis())
            .map_err(|e| {
                CliError::config_error(format!(
                    "cutover is not a valid RFC3339 timestamp: {}",
                    e
                ))
            })
    }

    /// HTTP server section of this config
    pub fn http_config(&self) -> HttpServerConfig {
        HttpServerConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
        }
    }

    /// Starter configuration written by `init`
    fn starter() -> Self {
        Self {
            data_file: "./survey.json".to_string(),
            cutover: "2021-06-01T00:00:00Z".to_string(),
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Dispatch a parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Init { config } => init(&config),
        Command::Start { config } => start(&config),
        Command::Query { config, request } => query(&config, &request),
    }
}

/// Write a starter configuration file
pub fn init(path: &Path) -> CliResult<()> {
    if path.exists() {
        return Err(CliError::already_initialized(format!(
            "{} already exists",
            path.display()
        )));
    }
    let content = serde_json::to_string_pretty(&Config::starter())
        .map_err(|e| CliError::io_error(e.to_string()))?;
    fs::write(path, content).map_err(|e| CliError::io_error(e.to_string()))?;
    Logger::info("CONFIG_WRITTEN", &[("path", &path.display().to_string())]);
    Ok(())
}

/// Boot the HTTP server and serve until interrupted
pub fn start(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let cutover = config.cutover_millis()?;
    let store = load_store(&config)?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("runtime: {}", e)))?;
    runtime.block_on(async move {
        let server = HttpServer::new(config.http_config(), store, cutover);
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(e.to_string()))
    })
}

/// Run one filter request and print the event stream to stdout
pub fn query(config_path: &Path, request_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let cutover = config.cutover_millis()?;
    let store = load_store(&config)?;

    let content = fs::read_to_string(request_path)
        .map_err(|e| CliError::io_error(format!("Failed to read request: {}", e)))?;
    let request: ScanRequest = serde_json::from_str(&content)
        .map_err(|e| CliError::io_error(format!("Invalid request JSON: {}", e)))?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("runtime: {}", e)))?;
    runtime.block_on(async move {
        let scanner = RecordScanner::new(store, cutover);
        let (tx, mut rx) = mpsc::channel::<ScanEvent>(64);

        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                print!("{}", event.to_ndjson());
            }
        });

        let result = scanner.scan(&request, &tx).await;
        drop(tx);
        let _ = printer.await;
        result
            .map(|_| ())
            .map_err(|e| CliError::io_error(e.to_string()))
    })
}

fn load_store(config: &Config) -> CliResult<Arc<dyn TreeStore>> {
    let store = MemoryStore::load(Path::new(&config.data_file))
        .map_err(|e| CliError::boot_failed(format!("data file: {}", e)))?;
    Ok(Arc::new(store))
}
