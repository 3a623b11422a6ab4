//! Configuration System using Figment
//!
//! This module provides strongly-typed configuration loading for the streamer.
//! Configuration is layered from:
//! 1. Built-in defaults (every field has one)
//! 2. `config/imu_stream.toml` (or an explicit path)
//! 3. Environment variables (prefixed with `IMU_STREAM_`, sections split on `__`)
//!
//! # Example
//! ```no_run
//! use imu_stream::config::StreamConfig;
//!
//! let config = StreamConfig::load()?;
//! println!("Serial port: {}", config.serial.port);
//! # Ok::<(), imu_stream::error::StreamError>(())
//! ```

use crate::error::{AppResult, StreamError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/imu_stream.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Serial link and device settings
    pub serial: SerialConfig,
    /// HTTP streaming gateway settings
    pub server: ServerConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Console log format (pretty, compact, json)
    pub log_format: String,
    /// Directory receiving the per-run diagnostic log
    pub log_dir: PathBuf,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "imu-stream".to_string(),
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
            log_dir: PathBuf::from("."),
        }
    }
}

/// Serial transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyACM0", "COM3")
    pub port: String,
    /// Communication speed
    pub baud_rate: u32,
    /// Requested device sample rate in Hz, sent during the handshake
    pub sample_rate_hz: u32,
    /// Upper bound on waiting for the device acknowledgement
    pub handshake_timeout_ms: u64,
    /// Maximum accepted frame length in bytes
    pub max_frame_bytes: usize,
    /// Size of each transport read
    pub read_chunk_bytes: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            sample_rate_hz: 50,
            handshake_timeout_ms: 5000,
            max_frame_bytes: 4096,
            read_chunk_bytes: 128,
        }
    }
}

impl SerialConfig {
    /// Handshake timeout as a `Duration`
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// How published vectors reach HTTP clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanoutMode {
    /// Every subscriber sees every vector; the producer never waits on clients
    Broadcast,
    /// Single hand-off slot; publishing waits until one client has received
    Rendezvous,
}

/// HTTP gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Path of the event stream endpoint
    pub stream_path: String,
    /// Static page served at `/`
    pub static_page: PathBuf,
    /// Fan-out mode for published vectors
    pub fanout: FanoutMode,
    /// Per-subscriber backlog in broadcast mode
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            stream_path: "/events-streaming".to_string(),
            static_page: PathBuf::from("site/index.html"),
            fanout: FanoutMode::Broadcast,
            broadcast_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for the HTTP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StreamConfig {
    /// Load configuration from the default file and environment variables
    ///
    /// Environment variables override file values with prefix `IMU_STREAM_`.
    /// Example: `IMU_STREAM_SERIAL__PORT=/dev/ttyUSB0`
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error: defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Self::figment(path.as_ref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(StreamConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("IMU_STREAM_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(StreamError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.as_str()) {
            return Err(StreamError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            )));
        }

        if !(1..=1000).contains(&self.serial.sample_rate_hz) {
            return Err(StreamError::Configuration(format!(
                "Invalid sample_rate_hz {}. Must be 1-1000",
                self.serial.sample_rate_hz
            )));
        }

        if self.serial.baud_rate == 0 {
            return Err(StreamError::Configuration(
                "baud_rate must be positive".to_string(),
            ));
        }

        if self.serial.max_frame_bytes == 0 || self.serial.read_chunk_bytes == 0 {
            return Err(StreamError::Configuration(
                "max_frame_bytes and read_chunk_bytes must be positive".to_string(),
            ));
        }

        if !self.server.stream_path.starts_with('/') {
            return Err(StreamError::Configuration(format!(
                "stream_path '{}' must start with '/'",
                self.server.stream_path
            )));
        }

        if self.server.broadcast_capacity == 0 {
            return Err(StreamError::Configuration(
                "broadcast_capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
