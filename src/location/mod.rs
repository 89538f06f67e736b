//! # Location Module
//!
//! Location fixes, the source abstraction, and the position tracker that
//! drives fix delivery into the reporter.
//!
//! The tracker owns the two execution contexts of the reporting pipeline:
//! its own delivery loop (one task) and, through the reporter, the send
//! queue's single worker. `stop()` ends fix delivery and closes the queue;
//! it does not wait for queued sends.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::config::GpsConfig;
use crate::error::{FleetBeaconError, Result};
use crate::reporter::Reporter;

pub mod nmea;
pub mod source_trait;

pub use nmea::NmeaGps;
pub use source_trait::LocationSource;

/// Number of fixes between progress log messages
const PROGRESS_LOG_INTERVAL: u64 = 30;

/// Pause after a source read error before retrying
const SOURCE_ERROR_BACKOFF: Duration = Duration::from_millis(250);

/// A single position sample from the location source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Fix time in Unix milliseconds
    pub timestamp_ms: i64,
    /// Source-reported speed in m/s, when the source provides one
    pub speed_mps: Option<f64>,
}

/// Requested accuracy/power trade-off for location updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    HighAccuracy,
    BalancedPower,
}

/// Parameters for a location update subscription
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRequest {
    /// Nominal delivery interval in milliseconds
    pub interval_ms: u64,
    /// Minimum interval floor in milliseconds
    pub min_interval_ms: u64,
    pub priority: Priority,
}

impl LocationRequest {
    /// Build a high-accuracy request from the GPS configuration
    pub fn from_config(gps: &GpsConfig) -> Self {
        Self {
            interval_ms: gps.update_interval_ms,
            min_interval_ms: gps.min_update_interval_ms,
            priority: Priority::HighAccuracy,
        }
    }
}

/// Drives fixes from a location source into the reporter
///
/// A tracker runs at most once. `start()` on a running or stopped tracker
/// returns [`FleetBeaconError::AlreadyStarted`] instead of silently creating
/// a duplicate subscription; after `stop()` no further reports are possible.
pub struct PositionTracker {
    request: LocationRequest,
    // Present only while the tracker is startable
    inner: Option<(Box<dyn LocationSource>, Reporter)>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<u64>>,
}

impl PositionTracker {
    /// Create a tracker over a location source and a reporter
    pub fn new(
        source: Box<dyn LocationSource>,
        reporter: Reporter,
        request: LocationRequest,
    ) -> Self {
        Self {
            request,
            inner: Some((source, reporter)),
            shutdown_tx: None,
            task: None,
        }
    }

    /// Subscribe to location updates and begin delivering reports
    ///
    /// # Errors
    ///
    /// - `AlreadyStarted` if the tracker is running or was stopped
    /// - The source's subscription error if updates cannot be requested; the
    ///   tracker remains startable in that case
    pub async fn start(&mut self) -> Result<()> {
        let Some((mut source, mut reporter)) = self.inner.take() else {
            return Err(FleetBeaconError::AlreadyStarted);
        };

        if let Err(e) = source.request_updates(&self.request).await {
            // Subscription never happened; keep the tracker startable
            self.inner = Some((source, reporter));
            return Err(e);
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut fix_count: u64 = 0;

            loop {
                tokio::select! {
                    // Fires on stop() and when the tracker itself is dropped
                    _ = shutdown_rx.changed() => break,

                    result = source.next_fix() => match result {
                        Ok(Some(fix)) => {
                            reporter.handle_fix(fix);
                            fix_count += 1;

                            if fix_count % PROGRESS_LOG_INTERVAL == 0 {
                                info!("Processed {} location fixes", fix_count);
                            }
                        }
                        // Absent fix: discard without surfacing anything
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Location source error: {}", e);
                            sleep(SOURCE_ERROR_BACKOFF).await;
                        }
                    },
                }
            }

            if let Err(e) = source.stop_updates().await {
                warn!("Failed to stop location updates: {}", e);
            }
            reporter.shutdown();

            fix_count
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
        info!("Location updates started");
        Ok(())
    }

    /// Stop fix delivery and close the send queue
    ///
    /// Idempotent and safe to call before `start()`. Does not cancel a send
    /// already in progress and does not wait for queued sends to finish.
    pub async fn stop(&mut self) {
        // Never-started tracker: drop the collaborators so no reports can
        // ever be produced
        self.inner = None;

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(fix_count) => info!("Location updates stopped after {} fixes", fix_count),
                Err(e) => warn!("Tracker task failed: {}", e),
            }
        }
    }
}
