//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub consul: ConsulConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
    #[serde(default)]
    pub topology: TopologyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deadline for a whole request; in-flight backend calls are cancelled past it
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: Option<u64>,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> Option<u64> {
    Some(30)
}

/// Consul HTTP API connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsulConfig {
    #[serde(default = "default_consul_url")]
    pub url: String,
    /// Datacenter to query; the agent's own datacenter when unset
    #[serde(default)]
    pub datacenter: Option<String>,
    /// ACL token sent as `X-Consul-Token`
    #[serde(default)]
    pub token: Option<String>,
    /// Timeout in seconds (supports both timeout_secs and timeout field names)
    #[serde(default = "default_timeout", alias = "timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,
    /// CA bundle used to verify an HTTPS Consul endpoint
    #[serde(default)]
    pub ssl_ca: Option<PathBuf>,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            url: default_consul_url(),
            datacenter: None,
            token: None,
            timeout_secs: default_timeout(),
            ssl_verify: default_ssl_verify(),
            ssl_ca: None,
        }
    }
}

fn default_consul_url() -> String {
    "http://127.0.0.1:8500".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_ssl_verify() -> bool {
    true
}

/// Per-node check agent configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChecksConfig {
    /// Port the agent listens on when it cannot be resolved through the catalog
    #[serde(default = "default_checks_port")]
    pub port: u16,
    /// Consul service the agents register under; enables catalog resolution
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default = "default_checks_timeout")]
    pub timeout_secs: u64,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            port: default_checks_port(),
            service_name: None,
            timeout_secs: default_checks_timeout(),
        }
    }
}

fn default_checks_port() -> u16 {
    8700
}

fn default_checks_timeout() -> u64 {
    5
}

/// Topology loading configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopologyConfig {
    /// Maximum concurrent per-node health lookups
    #[serde(default = "default_health_concurrency")]
    pub health_concurrency: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            health_concurrency: default_health_concurrency(),
        }
    }
}

fn default_health_concurrency() -> usize {
    (num_cpus::get() * 4).clamp(4, 32)
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix (default: "trento-web")
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation (default: true for production)
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation - recommended for production
    File,
    /// Log to both console and file
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/trento/web")
}

fn default_log_prefix() -> String {
    "trento-web".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        // Check for config path override from environment
        let config_path = std::env::var("TRENTO_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                Self::from_file(path)?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}, using defaults", path);
                AppConfig::default()
            }
            None => {
                eprintln!("[CONFIG] No config file found, using defaults");
                AppConfig::default()
            }
        };

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Parse a YAML configuration file without applying overrides
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            // Current directory
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            // System config directory
            PathBuf::from("/etc/trento-web/config.yaml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("trento-web/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = var("TRENTO_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("TRENTO_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Consul overrides, same names the consul CLI reads
        if let Some(addr) = var("CONSUL_HTTP_ADDR") {
            self.consul.url = if addr.starts_with("http://") || addr.starts_with("https://") {
                addr
            } else {
                format!("http://{}", addr)
            };
        }
        if let Some(token) = var("CONSUL_HTTP_TOKEN") {
            self.consul.token = Some(token);
        }
        if let Some(ca) = var("CONSUL_CACERT") {
            self.consul.ssl_ca = Some(PathBuf::from(ca));
        }

        // Check agent overrides
        if let Some(port) = var("TRENTO_CHECKS_PORT") {
            if let Ok(p) = port.parse() {
                self.checks.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = var("TRENTO_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.consul.url.trim().is_empty() {
            anyhow::bail!("Consul URL cannot be empty");
        }

        if self.checks.port == 0 {
            anyhow::bail!("Check agent port cannot be 0");
        }

        if self.topology.health_concurrency == 0 {
            anyhow::bail!("topology.health_concurrency must be at least 1");
        }

        if let Some(ref ca) = self.consul.ssl_ca {
            if !ca.exists() {
                anyhow::bail!("Consul CA file not found: {:?}", ca);
            }
        }

        if !self.consul.ssl_verify {
            tracing::warn!("Consul TLS certificate verification is disabled");
        }

        Ok(())
    }

    /// Create a default configuration file
    pub fn create_default_config(path: &PathBuf) -> Result<()> {
        let config = AppConfig::default();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_norway::to_string(&config)?;
        std::fs::write(path, yaml)?;

        Ok(())
    }
}
