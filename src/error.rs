//! Custom error types for the application.
//!
//! This module defines the primary error type, `StreamError`, for the whole
//! ingestion-to-HTTP pipeline. Using the `thiserror` crate, it provides a
//! centralized and consistent way to handle everything from serial transport
//! failures to malformed telemetry records.
//!
//! ## Error Hierarchy
//!
//! `StreamError` consolidates the following sources:
//!
//! - **`Transport`** / **`TransportClosed`**: Open/read/write failures on the serial link.
//! - **`Parse`**: A frame that is not a valid `ax,ay,az,rx,ry,rz` record.
//! - **`Framing`**: A frame that exceeds the configured maximum length.
//! - **`Setup`**: The device handshake timed out or never acknowledged.
//! - **`EmptyWindow`**: A sample window was queried before the first sample.
//! - **`Config`** / **`Configuration`**: Loading or semantic validation of configuration.
//! - **`Bind`**: The HTTP listener could not be bound.
//!
//! Per-cycle errors are recoverable: the ingestion loop logs them and keeps
//! streaming. See [`StreamError::is_recoverable`].

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, StreamError>;

/// Primary error type for the telemetry pipeline.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Configuration file parsing or extraction failed.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Standard I/O operation failed (log file, static page, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Read or write on the serial link failed.
    ///
    /// **Error Type**: Transient once the pipeline is running. The partial
    /// frame is discarded and framing restarts on the next cycle.
    #[error("Serial transport error: {0}")]
    Transport(String),

    /// The serial link returned end-of-stream.
    #[error("Serial transport closed")]
    TransportClosed,

    /// A frame could not be decoded as a telemetry record.
    ///
    /// `field` is the zero-based index of the offending (or first missing)
    /// field and `raw` is its text, or the whole line for short records.
    #[error("Parse error at field {field} ('{raw}'): {reason}")]
    Parse {
        /// Zero-based field index
        field: usize,
        /// Raw field text
        raw: String,
        /// Human-readable cause
        reason: String,
    },

    /// A frame grew past the maximum frame length.
    #[error("Framing error: frame exceeded {limit} bytes")]
    Framing {
        /// Configured maximum frame length in bytes
        limit: usize,
    },

    /// The device handshake failed.
    #[error("Device setup failed: {0}")]
    Setup(String),

    /// A sample window was queried while empty.
    #[error("Sample window is empty")]
    EmptyWindow,

    /// The HTTP listener could not be bound.
    #[error("Failed to bind HTTP listener on {addr}: {message}")]
    Bind {
        /// Address that was requested
        addr: String,
        /// Underlying cause
        message: String,
    },

    /// The operation was interrupted by the shutdown signal.
    #[error("Shutdown requested")]
    Shutdown,
}

impl StreamError {
    /// Build a `Parse` error.
    pub fn parse(field: usize, raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            field,
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    /// Whether the ingestion loop should log this error and continue.
    ///
    /// Malformed records, oversized frames and transient read failures never
    /// halt the stream. Everything else ends the loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StreamError::Parse { .. } | StreamError::Framing { .. } | StreamError::Transport(_)
        )
    }
}
