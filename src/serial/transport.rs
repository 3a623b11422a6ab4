//! Serial port abstractions
//!
//! Anything implementing `AsyncRead + AsyncWrite + Unpin + Send` can stand in
//! for the device link. This includes:
//! - `tokio_serial::SerialStream` (real hardware)
//! - `tokio::io::DuplexStream` (testing)

use crate::config::SerialConfig;
use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};

/// Trait alias for async serial port I/O.
pub trait SerialPortIO: AsyncRead + AsyncWrite + Unpin + Send {}

// Blanket implementation for all types meeting the requirements
impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialPortIO for T {}

/// Type-erased boxed serial port.
pub type DynSerial = Box<dyn SerialPortIO>;

/// Open a serial port asynchronously using spawn_blocking.
///
/// Standard settings are applied: 8N1, no flow control.
///
/// # Errors
///
/// Returns an error if the port cannot be opened or spawn_blocking fails.
pub async fn open_serial_async(config: &SerialConfig) -> anyhow::Result<DynSerial> {
    use tokio::task::spawn_blocking;
    use tokio_serial::SerialPortBuilderExt;

    let port_path = config.port.clone();
    let baud_rate = config.baud_rate;

    let port = spawn_blocking(move || {
        tokio_serial::new(&port_path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .with_context(|| format!("Failed to open sensor serial port: {}", port_path))
    })
    .await
    .context("spawn_blocking for serial port opening failed")??;

    Ok(Box::new(port))
}
