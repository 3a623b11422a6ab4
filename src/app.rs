//! Process wiring: serial setup, ingestion task and HTTP gateway.
//!
//! Startup order is fixed. The device handshake and the listener bind both
//! complete before any frame is read, so either failure aborts the process
//! before streaming begins.

use crate::config::StreamConfig;
use crate::error::AppResult;
use crate::gateway::Gateway;
use crate::ingest::{IngestStats, IngestionService};
use crate::serial::{configure_device, open_serial_async, LineFramer};
use crate::shutdown::ShutdownTrigger;
use crate::stream::publisher_for;
use crate::telemetry::TelemetryPipeline;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{error, info, info_span};

/// Open the configured serial port and run until shutdown.
pub async fn run(config: StreamConfig, trigger: ShutdownTrigger) -> anyhow::Result<IngestStats> {
    info!(
        port = %config.serial.port,
        baud_rate = config.serial.baud_rate,
        "Opening serial port"
    );
    let port = open_serial_async(&config.serial).await?;
    Ok(run_with_transport(config, port, trigger).await?)
}

/// Run the whole pipeline over an already-open transport.
///
/// Returns once ingestion has stopped and the gateway has closed every
/// stream. Either task ending for any reason triggers shutdown.
pub async fn run_with_transport<T>(
    config: StreamConfig,
    mut transport: T,
    trigger: ShutdownTrigger,
) -> AppResult<IngestStats>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let serial = &config.serial;
    let trailing =
        configure_device(&mut transport, serial.sample_rate_hz, serial.handshake_timeout()).await?;

    let publisher = publisher_for(&config.server);
    let gateway = Gateway::bind(&config.server, publisher.clone(), trigger.signal())?;
    info!(
        addr = %gateway.local_addr(),
        stream_path = %config.server.stream_path,
        fanout = ?config.server.fanout,
        "Listening for stream clients"
    );

    let framer = LineFramer::new(transport, serial.read_chunk_bytes, serial.max_frame_bytes)
        .with_prefix(&trailing);
    let service = IngestionService::new(
        framer,
        TelemetryPipeline::new(serial.sample_rate_hz),
        publisher,
        trigger.signal(),
        info_span!("ingest", port = %serial.port, rate_hz = serial.sample_rate_hz),
    );

    let server = tokio::spawn(gateway.serve());
    let ingest = tokio::spawn(service.run());
    supervise(ingest, server, &trigger).await
}

/// Wait for both tasks. Whichever ends first triggers shutdown for the other.
async fn supervise(
    mut ingest: JoinHandle<AppResult<IngestStats>>,
    mut server: JoinHandle<AppResult<()>>,
    trigger: &ShutdownTrigger,
) -> AppResult<IngestStats> {
    let (ingested, served) = tokio::select! {
        ingested = &mut ingest => {
            trigger.trigger();
            (ingested, server.await)
        }
        served = &mut server => {
            trigger.trigger();
            (ingest.await, served)
        }
    };

    let ingested = ingested.map_err(std::io::Error::from)?;
    let served = served.map_err(std::io::Error::from)?;
    if let Err(e) = &served {
        error!(error = %e, "HTTP gateway failed");
    }
    let stats = ingested?;
    served?;
    Ok(stats)
}
