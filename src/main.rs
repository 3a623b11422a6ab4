//! CLI entry point for imu-stream.
//!
//! ```bash
//! imu-stream --port /dev/ttyACM0 --sample-rate 50 --http-port 8080
//! ```
//!
//! Command-line flags override the configuration file, which overrides the
//! built-in defaults. Any startup failure exits non-zero.

use anyhow::{Context, Result};
use clap::Parser;
use imu_stream::config::{StreamConfig, DEFAULT_CONFIG_PATH};
use imu_stream::shutdown::shutdown_channel;
use imu_stream::{app, logging};
use std::path::PathBuf;
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "imu-stream")]
#[command(about = "Stream serial IMU telemetry to browsers over server-sent events", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serial device path
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Device sample rate in Hz (1-1000)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// HTTP listen port
    #[arg(long)]
    http_port: Option<u16>,

    /// Directory for the diagnostic log
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut StreamConfig) {
        if let Some(port) = self.port {
            config.serial.port = port;
        }
        if let Some(baud_rate) = self.baud_rate {
            config.serial.baud_rate = baud_rate;
        }
        if let Some(rate) = self.sample_rate {
            config.serial.sample_rate_hz = rate;
        }
        if let Some(http_port) = self.http_port {
            config.server.port = http_port;
        }
        if let Some(dir) = self.log_dir {
            config.application.log_dir = dir;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = StreamConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    cli.apply(&mut config);
    config.validate().context("Invalid command-line override")?;

    let log_path = logging::init_from_config(&config).context("Failed to initialize logging")?;
    info!(
        name = %config.application.name,
        log = ?log_path,
        "Interface starting"
    );

    let (trigger, _signal) = shutdown_channel();
    let on_ctrl_c = trigger.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                on_ctrl_c.trigger();
            }
            Err(e) => warn!(error = %e, "Ctrl-C handler unavailable"),
        }
    });

    let stats = app::run(config, trigger).await?;
    info!(
        frames = stats.frames,
        published = stats.published,
        parse_errors = stats.parse_errors,
        "Interface stopped"
    );
    Ok(())
}
