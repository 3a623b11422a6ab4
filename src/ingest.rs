//! Ingestion loop.
//!
//! One task owns the framer, the telemetry pipeline and the publisher end.
//! Each cycle reads one frame, runs it through the pipeline and publishes
//! the resulting vector. Malformed frames, oversize frames and read errors
//! are logged and skipped; the loop ends on shutdown or when the transport
//! closes. Consecutive read errors back off exponentially, capped at
//! [`TRANSPORT_BACKOFF_MAX`].

use crate::error::{AppResult, StreamError};
use crate::serial::LineFramer;
use crate::shutdown::ShutdownSignal;
use crate::stream::Publisher;
use crate::telemetry::TelemetryPipeline;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tracing::{info, warn, Instrument, Span};

/// Pause after the first failed read
pub const TRANSPORT_BACKOFF_BASE: Duration = Duration::from_millis(10);

/// Longest pause between reads of a failing transport
pub const TRANSPORT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Counters for one ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    /// Frames read from the transport
    pub frames: u64,
    /// Vectors handed to the publisher
    pub published: u64,
    /// Frames rejected by the parser
    pub parse_errors: u64,
    /// Oversized frames skipped
    pub framing_errors: u64,
    /// Failed transport reads
    pub transport_errors: u64,
}

/// Drives frames from the serial link to the publisher.
pub struct IngestionService<R> {
    framer: LineFramer<R>,
    pipeline: TelemetryPipeline,
    publisher: Arc<dyn Publisher>,
    shutdown: ShutdownSignal,
    span: Span,
    stats: IngestStats,
    /// Read errors since the last successful read
    read_failures: u32,
}

impl<R> IngestionService<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Create the service. Every event it logs is recorded inside `span`.
    pub fn new(
        framer: LineFramer<R>,
        pipeline: TelemetryPipeline,
        publisher: Arc<dyn Publisher>,
        shutdown: ShutdownSignal,
        span: Span,
    ) -> Self {
        Self {
            framer,
            pipeline,
            publisher,
            shutdown,
            span,
            stats: IngestStats::default(),
            read_failures: 0,
        }
    }

    /// Run until shutdown.
    ///
    /// Returns the run's counters on shutdown. A closed transport or any
    /// non-recoverable error ends the run with that error.
    pub async fn run(mut self) -> AppResult<IngestStats> {
        let span = self.span.clone();
        async move {
            info!(mode = ?self.publisher.mode(), "Ingestion started");
            let result = self.run_loop().await;
            match &result {
                Ok(stats) => info!(?stats, "Ingestion stopped"),
                Err(e) => warn!(error = %e, stats = ?self.stats, "Ingestion ended"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_loop(&mut self) -> AppResult<IngestStats> {
        while !self.shutdown.is_triggered() {
            let frame = tokio::select! {
                _ = self.shutdown.triggered() => break,
                frame = self.framer.read_frame() => frame,
            };

            let vector = match frame.and_then(|frame| {
                self.read_failures = 0;
                self.stats.frames += 1;
                self.pipeline.ingest(&frame)
            }) {
                Ok(vector) => vector,
                Err(e) => {
                    if let Some(delay) = self.record_error(e)? {
                        tokio::select! {
                            _ = self.shutdown.triggered() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    continue;
                }
            };

            info!(
                accel = ?vector.accel(),
                rot = ?vector.rot(),
                rolling_speed = vector.rolling_speed(),
                rolling_delta = vector.rolling_delta(),
                "Latest sample"
            );

            // A hand-off that already completed still counts
            tokio::select! {
                biased;
                published = self.publisher.publish(vector) => published?,
                _ = self.shutdown.triggered() => break,
            }
            self.stats.published += 1;
        }
        Ok(self.stats)
    }

    /// Count and log a per-cycle error. Returns the pause to take before the
    /// next read, if any.
    fn record_error(&mut self, err: StreamError) -> AppResult<Option<Duration>> {
        if !err.is_recoverable() {
            return Err(err);
        }
        match &err {
            StreamError::Parse { field, raw, reason } => {
                self.stats.parse_errors += 1;
                warn!(field, raw = %raw, reason = %reason, "Discarding malformed frame");
            }
            StreamError::Framing { limit } => {
                self.stats.framing_errors += 1;
                warn!(limit, "Discarding oversized frame");
            }
            StreamError::Transport(message) => {
                self.stats.transport_errors += 1;
                self.read_failures = self.read_failures.saturating_add(1);
                let delay = transport_backoff(self.read_failures);
                warn!(
                    error = %message,
                    consecutive = self.read_failures,
                    retry_in_ms = delay.as_millis() as u64,
                    "Serial read failed, partial frame discarded"
                );
                return Ok(Some(delay));
            }
            _ => {}
        }
        Ok(None)
    }
}

/// Pause before the next read after `failures` consecutive read errors.
fn transport_backoff(failures: u32) -> Duration {
    let doublings = failures.saturating_sub(1).min(16);
    TRANSPORT_BACKOFF_BASE
        .saturating_mul(1 << doublings)
        .min(TRANSPORT_BACKOFF_MAX)
}
