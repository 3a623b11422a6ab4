//! # IMU Stream
//!
//! Reads comma-separated acceleration and rotation records from a motion
//! sensor on a serial port, keeps about one second of samples, derives a
//! rolling speed and delta, and streams the latest values to browsers as
//! server-sent events.
//!
//! ## Crate Structure
//!
//! - **`serial`**: Transport abstraction, device setup handshake, and line
//!   framing over arbitrary read chunks.
//! - **`telemetry`**: Record parsing, fixed-capacity sample windows, the
//!   kinematic integrator, and the published ten-value [`telemetry::SampleVector`].
//! - **`stream`**: The [`stream::Publisher`] seam between ingestion and HTTP
//!   clients, in broadcast or rendezvous fan-out.
//! - **`ingest`**: The single task that owns all telemetry state.
//! - **`gateway`**: hyper server for the static page and the event stream.
//! - **`app`**: Startup order and task wiring.
//! - **`config`** / **`logging`** / **`error`** / **`shutdown`**: Ambient
//!   configuration, tracing setup, the `StreamError` type, and the shutdown
//!   signal.
//!
//! ## Data Flow
//!
//! ```text
//! serial port ─► LineFramer ─► TelemetryPipeline ─► Publisher ─► Gateway ─► clients
//!                               (parse, window,
//!                                integrate, format)
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ingest;
pub mod logging;
pub mod serial;
pub mod shutdown;
pub mod stream;
pub mod telemetry;

pub use error::{AppResult, StreamError};
