//! # NMEA Serial GPS Source
//!
//! Reads location fixes from a serial NMEA 0183 receiver.
//!
//! The receiver streams sentences at its own cadence (typically 1 Hz). Only
//! `RMC` (recommended minimum) sentences carry what a report needs: validity,
//! coordinates, and speed over ground. Everything else on the wire parses to
//! an absent fix and is discarded by the consumer.

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use super::{LocationFix, LocationRequest, LocationSource};
use crate::config::GpsConfig;
use crate::error::{FleetBeaconError, Result};
use crate::geo::KNOTS_TO_MPS;

/// Default GPS receiver paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC receivers
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Coordinates and speed extracted from one valid RMC sentence
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RmcData {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_mps: Option<f64>,
}

/// Serial NMEA GPS receiver
///
/// Opens the receiver on construction and delivers fixes through the
/// [`LocationSource`] trait. The nominal update interval of a
/// [`LocationRequest`] is advisory here (the receiver emits at its own
/// rate), but the minimum interval floor is enforced by dropping fixes that
/// arrive too soon after the last emitted one.
pub struct NmeaGps {
    reader: Option<BufReader<tokio_serial::SerialStream>>,
    device_path: String,
    active: bool,
    min_interval_ms: u64,
    last_emit_ms: i64,
}

impl std::fmt::Debug for NmeaGps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NmeaGps")
            .field("device_path", &self.device_path)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl NmeaGps {
    /// Open the GPS receiver described by the configuration
    ///
    /// An empty `port` auto-detects the receiver by trying common device
    /// paths in order.
    ///
    /// # Errors
    ///
    /// Returns `GpsNotFound` if no candidate path opens. This surfaces the
    /// missing-device precondition at startup instead of at report time.
    pub fn open(config: &GpsConfig) -> Result<Self> {
        if config.port.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate)
        } else {
            Self::open_with_paths(&[config.port.as_str()], config.baud_rate)
        }
    }

    /// Open the GPS receiver trying the given device paths in order
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open GPS receiver: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(stream) => {
                    info!("Opened GPS receiver at {}", path);
                    return Ok(Self {
                        reader: Some(BufReader::new(stream)),
                        device_path: path.to_string(),
                        active: false,
                        min_interval_ms: 0,
                        last_emit_ms: 0,
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(FleetBeaconError::GpsNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with NMEA settings (8N1, no flow control)
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let stream = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| FleetBeaconError::Location(format!("Failed to open {}: {}", path, e)))?;

        Ok(stream)
    }

    /// Get the device path of the opened receiver
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait::async_trait]
impl LocationSource for NmeaGps {
    async fn request_updates(&mut self, request: &LocationRequest) -> Result<()> {
        if self.reader.is_none() {
            return Err(FleetBeaconError::Location(
                "GPS receiver is not open".to_string(),
            ));
        }

        self.min_interval_ms = request.min_interval_ms;
        self.active = true;
        info!(
            "GPS updates requested ({} ms nominal, {} ms floor)",
            request.interval_ms, request.min_interval_ms
        );
        Ok(())
    }

    async fn next_fix(&mut self) -> Result<Option<LocationFix>> {
        if !self.active {
            return Err(FleetBeaconError::Location(
                "location updates were not requested".to_string(),
            ));
        }

        let reader = self.reader.as_mut().ok_or_else(|| {
            FleetBeaconError::Location("GPS receiver is closed".to_string())
        })?;

        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .await
            .map_err(|e| FleetBeaconError::Location(format!("GPS read failed: {}", e)))?;
        if n == 0 {
            return Err(FleetBeaconError::Location(
                "GPS serial stream closed".to_string(),
            ));
        }

        let rmc = match parse_rmc(line.trim()) {
            Some(rmc) => rmc,
            None => return Ok(None), // not a valid RMC sentence
        };

        let now_ms = Utc::now().timestamp_millis();
        if !min_interval_elapsed(self.last_emit_ms, now_ms, self.min_interval_ms) {
            return Ok(None);
        }
        self.last_emit_ms = now_ms;

        Ok(Some(LocationFix {
            latitude: rmc.latitude,
            longitude: rmc.longitude,
            timestamp_ms: now_ms,
            speed_mps: rmc.speed_mps,
        }))
    }

    async fn stop_updates(&mut self) -> Result<()> {
        if self.active {
            info!("GPS updates stopped");
        }
        self.active = false;
        self.reader = None; // dropping the stream closes the port
        Ok(())
    }
}

/// Minimum-interval floor check for fix emission
fn min_interval_elapsed(last_emit_ms: i64, now_ms: i64, min_interval_ms: u64) -> bool {
    now_ms - last_emit_ms >= min_interval_ms as i64
}

/// Parse one RMC sentence into coordinates and speed
///
/// Accepts any talker prefix (`GPRMC`, `GNRMC`, ...). Sentences with a void
/// status, a failed checksum, or malformed fields yield `None`. A missing
/// speed-over-ground field yields a fix without a speed value.
pub(crate) fn parse_rmc(sentence: &str) -> Option<RmcData> {
    let sentence = sentence.strip_prefix('$')?;

    // Validate the XOR checksum when one is present
    let data = match sentence.split_once('*') {
        Some((data, checksum)) => {
            let expected = u8::from_str_radix(checksum.trim(), 16).ok()?;
            if nmea_checksum(data) != expected {
                return None;
            }
            data
        }
        None => sentence,
    };

    let fields: Vec<&str> = data.split(',').collect();
    if fields.len() < 8 || fields[0].len() != 5 || !fields[0].ends_with("RMC") {
        return None;
    }

    // Status field: A = valid, V = void
    if fields[2] != "A" {
        return None;
    }

    let latitude = parse_ddmm(fields[3], 2)?;
    let latitude = match fields[4] {
        "N" => latitude,
        "S" => -latitude,
        _ => return None,
    };

    let longitude = parse_ddmm(fields[5], 3)?;
    let longitude = match fields[6] {
        "E" => longitude,
        "W" => -longitude,
        _ => return None,
    };

    let speed_mps = if fields[7].is_empty() {
        None
    } else {
        Some(fields[7].parse::<f64>().ok()? * KNOTS_TO_MPS)
    };

    Some(RmcData {
        latitude,
        longitude,
        speed_mps,
    })
}

/// Convert an NMEA `(d)ddmm.mmmm` field to decimal degrees
fn parse_ddmm(value: &str, degree_digits: usize) -> Option<f64> {
    if value.len() <= degree_digits {
        return None;
    }
    let degrees: f64 = value[..degree_digits].parse().ok()?;
    let minutes: f64 = value[degree_digits..].parse().ok()?;
    if !(0.0..60.0).contains(&minutes) {
        return None;
    }
    Some(degrees + minutes / 60.0)
}

/// XOR checksum over the sentence body (between `$` and `*`)
fn nmea_checksum(data: &str) -> u8 {
    data.bytes().fold(0, |acc, byte| acc ^ byte)
}
