//! Tracing Infrastructure
//!
//! Structured, async-aware logging built on `tracing` and `tracing-subscriber`:
//! - A console layer (pretty, compact, or JSON)
//! - An append-only JSON-lines diagnostic log, one file per process start,
//!   named `interface-log-<timestamp>.json`
//! - Environment-based filtering (`RUST_LOG` overrides the configured level)
//!
//! # Example
//! ```no_run
//! use imu_stream::{config::StreamConfig, logging};
//! use tracing::info;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StreamConfig::load()?;
//! let log_path = logging::init_from_config(&config)?;
//! info!(log = ?log_path, "Interface starting");
//! # Ok(())
//! # }
//! ```

use crate::config::StreamConfig;
use crate::error::{AppResult, StreamError};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Timestamp layout embedded in diagnostic log file names
const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Output format for the console layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed format with colors (for development)
    Pretty,
    /// Compact format without colors (for production)
    Compact,
    /// JSON format for structured logging (for log aggregation)
    Json,
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Level,
    /// Console output format
    pub format: OutputFormat,
    /// Whether to include file and line numbers
    pub with_file_and_line: bool,
    /// Whether to include thread names
    pub with_thread_names: bool,
    /// Whether to enable ANSI colors (only for Pretty format)
    pub with_ansi: bool,
    /// Directory for the diagnostic log; `None` disables the file layer
    pub log_dir: Option<PathBuf>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Compact,
            with_file_and_line: false,
            with_thread_names: true,
            with_ansi: true,
            log_dir: None,
        }
    }
}

impl TracingConfig {
    /// Create tracing config from application configuration
    pub fn from_stream_config(config: &StreamConfig) -> AppResult<Self> {
        let level = parse_log_level(&config.application.log_level)?;
        let format = parse_output_format(&config.application.log_format)?;

        Ok(Self {
            level,
            format,
            log_dir: Some(config.application.log_dir.clone()),
            ..Default::default()
        })
    }

    /// Create tracing config with custom settings
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Write the diagnostic log into `dir`
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

/// Initialize tracing from application configuration
///
/// Returns the path of the diagnostic log that was opened.
pub fn init_from_config(config: &StreamConfig) -> AppResult<Option<PathBuf>> {
    init(TracingConfig::from_stream_config(config)?)
}

/// Initialize tracing with custom configuration
///
/// Opening the diagnostic log is fatal: the caller is expected to exit
/// non-zero rather than run without it.
///
/// This function is idempotent - if tracing is already initialized, it will
/// return Ok without installing anything. This makes it safe to call in tests.
pub fn init(config: TracingConfig) -> AppResult<Option<PathBuf>> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(&config)];

    let log_path = match &config.log_dir {
        Some(dir) => {
            let (path, file) = open_diagnostic_log(dir, Local::now())?;
            layers.push(file_layer(file, config.level));
            Some(path)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .or_else(|e| {
            // Handle "already initialized" gracefully - this is expected in tests
            if e.to_string()
                .contains("a global default trace dispatcher has already been set")
            {
                Ok(())
            } else {
                Err(StreamError::Configuration(format!(
                    "Failed to initialize tracing: {}",
                    e
                )))
            }
        })?;

    Ok(log_path)
}

fn console_layer(config: &TracingConfig) -> BoxedLayer {
    let filter = env_filter(config.level);
    match config.format {
        OutputFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_thread_names(config.with_thread_names)
            .with_ansi(config.with_ansi)
            .with_filter(filter)
            .boxed(),
        OutputFormat::Compact => fmt::layer()
            .compact()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_thread_names(config.with_thread_names)
            .with_ansi(false)
            .with_filter(filter)
            .boxed(),
        OutputFormat::Json => fmt::layer()
            .json()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_thread_names(config.with_thread_names)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(file: File, level: Level) -> BoxedLayer {
    fmt::layer()
        .json()
        .with_ansi(false)
        .with_current_span(true)
        .with_writer(Mutex::new(file))
        .with_filter(env_filter(level))
        .boxed()
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_string(level)))
}

/// Diagnostic log file name for a process started at `started`
pub fn diagnostic_log_name(started: DateTime<Local>) -> String {
    format!(
        "interface-log-{}.json",
        started.format(LOG_TIMESTAMP_FORMAT)
    )
}

/// Create (or append to) the diagnostic log inside `dir`
pub fn open_diagnostic_log(dir: &Path, started: DateTime<Local>) -> AppResult<(PathBuf, File)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(diagnostic_log_name(started));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Parse log level string into tracing Level
pub fn parse_log_level(level: &str) -> AppResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(StreamError::Configuration(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        ))),
    }
}

fn parse_output_format(format: &str) -> AppResult<OutputFormat> {
    match format.to_lowercase().as_str() {
        "pretty" => Ok(OutputFormat::Pretty),
        "compact" => Ok(OutputFormat::Compact),
        "json" => Ok(OutputFormat::Json),
        _ => Err(StreamError::Configuration(format!(
            "Invalid log format '{}'. Must be one of: pretty, compact, json",
            format
        ))),
    }
}

/// Convert Level to env filter string
fn level_to_filter_string(level: Level) -> String {
    level.as_str().to_lowercase()
}
