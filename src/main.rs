//! # Fleet Beacon
//!
//! Report vehicle GPS position and speed to a fleet tracking server.
//!
//! Reads fixes from a serial NMEA receiver and POSTs JSON position reports
//! to the configured HTTP endpoint on a background queue.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use fleet_beacon::config::Config;
use fleet_beacon::http::{HttpTimeouts, TokioHttpClient};
use fleet_beacon::location::{LocationRequest, NmeaGps, PositionTracker};
use fleet_beacon::reporter::{Reporter, SendQueue};

/// Main entry point for the Fleet Beacon daemon
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (optional TOML path as first argument, protocol
///      defaults otherwise)
///    - Open the GPS receiver and fail fast if none is present
///
/// 2. **Reporting**
///    - The position tracker delivers fixes into the reporter, which queues
///      one JSON POST per fix on the background send worker
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C stops fix delivery and closes the send queue; queued sends
///      are not flushed
///
/// # Errors
///
/// Returns error if:
/// - The configuration file cannot be read or fails validation
/// - No GPS receiver can be opened
/// - The location subscription cannot be started
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Fleet Beacon v{} starting...", env!("CARGO_PKG_VERSION"));

    // Optional configuration file path as the first argument; defaults
    // reproduce the reporting protocol's compiled-in constants
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)?,
        None => {
            let config = Config::default();
            config.validate()?;
            config
        }
    };

    let device_id = config.device.identity();
    info!(
        "Reporting as {} ({}) to {}",
        device_id, config.device.vehicle_type, config.server.url
    );

    let source = NmeaGps::open(&config.gps)?;

    let client = Arc::new(TokioHttpClient::new());
    let timeouts = HttpTimeouts::from_millis(
        config.server.connect_timeout_ms,
        config.server.read_timeout_ms,
    );
    let queue = SendQueue::spawn(client, config.server.url.clone(), timeouts);
    let reporter = Reporter::new(device_id, config.device.vehicle_type.clone(), queue);

    let request = LocationRequest::from_config(&config.gps);
    let mut tracker = PositionTracker::new(Box::new(source), reporter, request);
    tracker.start().await?;

    info!("Press Ctrl+C to exit");
    tokio::signal::ctrl_c().await?;

    info!("Received Ctrl+C, shutting down...");
    tracker.stop().await;

    Ok(())
}
