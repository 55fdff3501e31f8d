//! Configuration management for dir-tunnel.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::server::{EngineConfig, DEFAULT_SOCKET_PATH};

/// Accepted session time-to-live, in minutes.
pub const TTL_MINUTES_RANGE: RangeInclusive<u64> = 10..=30;

/// Accepted sweep interval, in seconds.
pub const SWEEP_INTERVAL_SECS_RANGE: RangeInclusive<u64> = 10..=300;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Session lifetime configuration.
    pub sessions: SessionsSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Path of the Unix socket to listen on.
    pub socket_path: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
        }
    }
}

/// Session lifetime section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsSection {
    /// Session time-to-live in minutes.
    pub ttl_minutes: u64,
    /// Seconds between sweeps of expired sessions.
    pub sweep_interval_secs: u64,
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            ttl_minutes: 10,
            sweep_interval_secs: 45,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(socket) = std::env::var("DIR_TUNNEL_SOCKET") {
            self.server.socket_path = socket;
        }

        if let Ok(ttl) = std::env::var("DIR_TUNNEL_TTL") {
            if let Ok(ttl) = ttl.parse() {
                self.sessions.ttl_minutes = ttl;
            }
        }

        if let Ok(interval) = std::env::var("DIR_TUNNEL_SWEEP_INTERVAL") {
            if let Ok(interval) = interval.parse() {
                self.sessions.sweep_interval_secs = interval;
            }
        }

        if let Ok(level) = std::env::var("DIR_TUNNEL_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref socket) = args.socket {
            self.server.socket_path = socket.to_string_lossy().into_owned();
        }

        if let Some(ttl) = args.ttl_minutes {
            self.sessions.ttl_minutes = ttl;
        }

        if let Some(interval) = args.sweep_interval_secs {
            self.sessions.sweep_interval_secs = interval;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Validate bounds and convert to the server's runtime configuration.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let socket = &self.server.socket_path;
        if socket.is_empty() || socket.contains('\0') {
            return Err(ConfigError::InvalidSocketPath(socket.clone()));
        }

        let ttl = self.sessions.ttl_minutes;
        if !TTL_MINUTES_RANGE.contains(&ttl) {
            return Err(ConfigError::OutOfRange {
                name: "ttl",
                value: ttl,
                range: TTL_MINUTES_RANGE,
            });
        }

        let interval = self.sessions.sweep_interval_secs;
        if !SWEEP_INTERVAL_SECS_RANGE.contains(&interval) {
            return Err(ConfigError::OutOfRange {
                name: "sweep-interval",
                value: interval,
                range: SWEEP_INTERVAL_SECS_RANGE,
            });
        }

        Ok(EngineConfig::new(PathBuf::from(socket))
            .with_session_ttl(Duration::from_secs(ttl * 60))
            .with_sweep_interval(Duration::from_secs(interval)))
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Socket path is empty or contains NUL bytes.
    InvalidSocketPath(String),
    /// A bounded integer setting is out of range.
    OutOfRange {
        name: &'static str,
        value: u64,
        range: RangeInclusive<u64>,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidSocketPath(path) => write!(f, "invalid socket path: '{}'", path),
            Self::OutOfRange { name, value, range } => write!(
                f,
                "{} must be between {} and {}, got {}",
                name,
                range.start(),
                range.end(),
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
