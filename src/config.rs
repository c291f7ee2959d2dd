//! Configuration module for the pollkv server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(name = "pollkv")]
#[command(version)]
#[command(about = "A single-threaded key-value server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:1234)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Size of the read buffer in bytes; one read is one command
    #[arg(short = 'b', long)]
    pub buffer_size: Option<usize>,

    /// Storage backend
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Bucket count for the chained backend
    #[arg(long)]
    pub buckets: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Which store implementation backs the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// std `HashMap`
    #[default]
    Map,
    /// Fixed-bucket chained hashtable
    Chained,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    /// Read buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Readiness events collected per wait
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Wait timeout in milliseconds; unset blocks until an event arrives
    pub poll_timeout_ms: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backlog: default_backlog(),
            buffer_size: default_buffer_size(),
            max_events: default_max_events(),
            poll_timeout_ms: None,
        }
    }
}

/// Storage-related configuration
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Bucket count for the chained backend
    #[serde(default = "default_buckets")]
    pub buckets: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            buckets: default_buckets(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const DEFAULT_PORT: u16 = 1234;

fn default_listen() -> String {
    format!("0.0.0.0:{DEFAULT_PORT}")
}

fn default_backlog() -> i32 {
    10
}

fn default_buffer_size() -> usize {
    1024
}

fn default_max_events() -> usize {
    1024
}

fn default_buckets() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub backlog: i32,
    pub buffer_size: usize,
    pub max_events: usize,
    pub poll_timeout: Option<Duration>,
    pub backend: Backend,
    pub buckets: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let server = ServerConfig::default();
        let storage = StorageConfig::default();
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            backlog: server.backlog,
            buffer_size: server.buffer_size,
            max_events: server.max_events,
            poll_timeout: None,
            backend: storage.backend,
            buckets: storage.buckets,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::merge(cli, toml_config)
    }

    /// Merge CLI args over file values and validate the result.
    pub fn merge(cli: CliArgs, file: TomlConfig) -> Result<Self, ConfigError> {
        let listen = cli.listen.unwrap_or(file.server.listen);
        let listen: SocketAddr = listen
            .parse()
            .map_err(|e| ConfigError::InvalidListen(listen.clone(), e))?;

        let buffer_size = cli.buffer_size.unwrap_or(file.server.buffer_size);
        if buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }

        Ok(Config {
            listen,
            backlog: file.server.backlog,
            buffer_size,
            max_events: file.server.max_events.max(1),
            poll_timeout: file.server.poll_timeout_ms.map(Duration::from_millis),
            backend: cli.backend.unwrap_or(file.storage.backend),
            buckets: cli.buckets.unwrap_or(file.storage.buckets),
            log_level: cli.log_level.unwrap_or(file.logging.level),
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    InvalidListen(String, AddrParseError),
    ZeroBufferSize,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidListen(addr, e) => {
                write!(f, "Invalid listen address '{addr}': {e}")
            }
            ConfigError::ZeroBufferSize => write!(f, "buffer_size must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliArgs {
        let mut argv = vec!["pollkv"];
        argv.extend_from_slice(args);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "0.0.0.0:1234");
        assert_eq!(config.server.backlog, 10);
        assert_eq!(config.server.buffer_size, 1024);
        assert_eq!(config.server.poll_timeout_ms, None);
        assert_eq!(config.storage.backend, Backend::Map);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_defaults_resolve_like_config_default() {
        let resolved = Config::merge(cli(&[]), TomlConfig::default()).unwrap();
        let default = Config::default();

        assert_eq!(resolved.listen, default.listen);
        assert_eq!(resolved.backlog, default.backlog);
        assert_eq!(resolved.buffer_size, default.buffer_size);
        assert_eq!(resolved.backend, default.backend);
        assert_eq!(resolved.log_level, default.log_level);
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "127.0.0.1:4000"
            backlog = 64
            buffer_size = 4096
            max_events = 256
            poll_timeout_ms = 500

            [storage]
            backend = "chained"
            buckets = 97

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:4000");
        assert_eq!(config.server.backlog, 64);
        assert_eq!(config.server.buffer_size, 4096);
        assert_eq!(config.server.max_events, 256);
        assert_eq!(config.server.poll_timeout_ms, Some(500));
        assert_eq!(config.storage.backend, Backend::Chained);
        assert_eq!(config.storage.buckets, 97);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: TomlConfig = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:4000"
            buffer_size = 4096

            [storage]
            backend = "chained"
        "#,
        )
        .unwrap();

        let config = Config::merge(
            cli(&["-l", "127.0.0.1:5000", "--backend", "map", "--log-level", "trace"]),
            file,
        )
        .unwrap();

        assert_eq!(config.listen, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.backend, Backend::Map);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_invalid_listen_rejected() {
        let err = Config::merge(cli(&["-l", "not-an-address"]), TomlConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidListen(ref addr, _) if addr == "not-an-address"));
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let err = Config::merge(cli(&["-b", "0"]), TomlConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroBufferSize));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let parsed: Result<TomlConfig, _> = toml::from_str("[storage]\nbackend = \"btree\"\n");
        assert!(parsed.is_err());
    }
}
