//! Device configuration handshake.
//!
//! Protocol:
//! 1. Host writes `\n` to wake the firmware's command parser
//! 2. Host waits 10 ms
//! 3. Host writes the sample rate as decimal ASCII (e.g. `50`)
//! 4. Device echoes diagnostics, then sends `0x02` once the rate is applied
//!
//! The whole exchange is bounded by a timeout; a device that never
//! acknowledges is a [`StreamError::Setup`] failure.

use crate::error::{AppResult, StreamError};
use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument};

/// Byte the device sends once it has applied the configuration
pub const CONFIG_ACK: u8 = 0x02;

/// Pause between the wake-up newline and the sample rate
pub const SETTLE_DELAY: Duration = Duration::from_millis(10);

/// Configure the device sample rate and wait for its acknowledgement.
///
/// Returns any bytes that arrived after the acknowledgement in the same read;
/// they belong to the first telemetry frame.
#[instrument(skip(port), err)]
pub async fn configure_device<P>(
    port: &mut P,
    sample_rate_hz: u32,
    timeout: Duration,
) -> AppResult<Bytes>
where
    P: AsyncRead + AsyncWrite + Unpin,
{
    match tokio::time::timeout(timeout, handshake(port, sample_rate_hz)).await {
        Ok(result) => result,
        Err(_) => Err(StreamError::Setup(format!(
            "device did not acknowledge sample rate {} within {:?}",
            sample_rate_hz, timeout
        ))),
    }
}

async fn handshake<P>(port: &mut P, sample_rate_hz: u32) -> AppResult<Bytes>
where
    P: AsyncRead + AsyncWrite + Unpin,
{
    write_all(port, b"\n").await?;
    tokio::time::sleep(SETTLE_DELAY).await;
    write_all(port, sample_rate_hz.to_string().as_bytes()).await?;

    let mut buffer = [0u8; 128];
    let mut echoed = 0usize;
    loop {
        let n = port
            .read(&mut buffer)
            .await
            .map_err(|e| StreamError::Setup(format!("read failed during handshake: {}", e)))?;
        if n == 0 {
            return Err(StreamError::Setup(
                "transport closed before acknowledgement".to_string(),
            ));
        }

        let received = &buffer[..n];
        match received.iter().position(|b| *b == CONFIG_ACK) {
            Some(pos) => {
                echoed += pos;
                info!(sample_rate_hz, echoed_bytes = echoed, "Device acknowledged configuration");
                return Ok(Bytes::copy_from_slice(&received[pos + 1..]));
            }
            None => {
                echoed += n;
                debug!(echo = %String::from_utf8_lossy(received), "Handshake echo");
            }
        }
    }
}

async fn write_all<P: AsyncWrite + Unpin>(port: &mut P, bytes: &[u8]) -> AppResult<()> {
    port.write_all(bytes)
        .await
        .map_err(|e| StreamError::Setup(format!("write failed during handshake: {}", e)))?;
    port.flush()
        .await
        .map_err(|e| StreamError::Setup(format!("flush failed during handshake: {}", e)))
}
