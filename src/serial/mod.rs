//! Serial link to the motion sensor: transport, setup handshake, and line framing.

pub mod framer;
pub mod handshake;
pub mod transport;

pub use framer::LineFramer;
pub use handshake::{configure_device, CONFIG_ACK};
pub use transport::{open_serial_async, DynSerial, SerialPortIO};
