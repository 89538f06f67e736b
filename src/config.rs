//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every default matches the constants the reporting protocol was designed
//! around: 2000 ms nominal update interval with a 1000 ms floor, 5000 ms
//! connect/read timeouts, and the `CAR` vehicle tag. Running without a
//! configuration file reproduces exactly that behavior.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub gps: GpsConfig,

    #[serde(default)]
    pub device: DeviceConfig,
}

/// Report server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// GPS receiver configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GpsConfig {
    /// Serial device path. Empty means auto-detect.
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    #[serde(default = "default_min_update_interval_ms")]
    pub min_update_interval_ms: u64,
}

/// Device identity configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    /// Device identity token. Empty means derive from the machine id.
    #[serde(default)]
    pub id: String,

    #[serde(default = "default_vehicle_type")]
    pub vehicle_type: String,
}

// Default value functions
fn default_server_url() -> String { "http://127.0.0.1:5000/api/update".to_string() }
fn default_connect_timeout_ms() -> u64 { 5000 }
fn default_read_timeout_ms() -> u64 { 5000 }

fn default_baud_rate() -> u32 { 9600 }
fn default_update_interval_ms() -> u64 { 2000 }
fn default_min_update_interval_ms() -> u64 { 1000 }

fn default_vehicle_type() -> String { "CAR".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            update_interval_ms: default_update_interval_ms(),
            min_update_interval_ms: default_min_update_interval_ms(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            vehicle_type: default_vehicle_type(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fleet_beacon::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // The URL must decompose into host/port/path before the first report
        // is ever attempted.
        crate::http::parse_url(&self.server.url)?;

        if self.server.connect_timeout_ms == 0 || self.server.connect_timeout_ms > 60000 {
            return Err(crate::error::FleetBeaconError::Config(
                toml::de::Error::custom("connect_timeout_ms must be between 1 and 60000")
            ));
        }

        if self.server.read_timeout_ms == 0 || self.server.read_timeout_ms > 60000 {
            return Err(crate::error::FleetBeaconError::Config(
                toml::de::Error::custom("read_timeout_ms must be between 1 and 60000")
            ));
        }

        if self.gps.update_interval_ms == 0 || self.gps.update_interval_ms > 60000 {
            return Err(crate::error::FleetBeaconError::Config(
                toml::de::Error::custom("update_interval_ms must be between 1 and 60000")
            ));
        }

        // The minimum interval is a floor, so it can never exceed the nominal
        // update interval.
        if self.gps.min_update_interval_ms == 0
            || self.gps.min_update_interval_ms > self.gps.update_interval_ms {
            return Err(crate::error::FleetBeaconError::Config(
                toml::de::Error::custom("min_update_interval_ms must be between 1 and update_interval_ms")
            ));
        }

        // Validate baud rate (common NMEA receiver rates)
        if ![4800, 9600, 19200, 38400, 57600, 115200].contains(&self.gps.baud_rate) {
            return Err(crate::error::FleetBeaconError::Config(
                toml::de::Error::custom("baud_rate must be one of: 4800, 9600, 19200, 38400, 57600, 115200")
            ));
        }

        if self.device.vehicle_type.is_empty() {
            return Err(crate::error::FleetBeaconError::Config(
                toml::de::Error::custom("vehicle_type cannot be empty")
            ));
        }

        Ok(())
    }
}

impl DeviceConfig {
    /// Resolve the device identity token
    ///
    /// Uses the configured `id` when set; otherwise derives a stable token
    /// from the machine id (the host's hardware-serial analogue). The value
    /// is fixed at process start and never changes afterwards.
    pub fn identity(&self) -> String {
        if !self.id.is_empty() {
            return self.id.clone();
        }

        match fs::read_to_string("/etc/machine-id") {
            Ok(machine_id) if !machine_id.trim().is_empty() => {
                format!("vehicle_{}", machine_id.trim())
            }
            _ => "vehicle_unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values_match_protocol_constants() {
        assert_eq!(default_server_url(), "http://127.0.0.1:5000/api/update");
        assert_eq!(default_connect_timeout_ms(), 5000);
        assert_eq!(default_read_timeout_ms(), 5000);
        assert_eq!(default_baud_rate(), 9600);
        assert_eq!(default_update_interval_ms(), 2000);
        assert_eq!(default_min_update_interval_ms(), 1000);
        assert_eq!(default_vehicle_type(), "CAR");
    }

    #[test]
    fn test_invalid_server_url() {
        let mut config = Config::default();
        config.server.url = "ftp://example.com/api/update".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_server_url() {
        let mut config = Config::default();
        config.server.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connect_timeout_zero() {
        let mut config = Config::default();
        config.server.connect_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connect_timeout_too_high() {
        let mut config = Config::default();
        config.server.connect_timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_read_timeout_zero() {
        let mut config = Config::default();
        config.server.read_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_update_interval_zero() {
        let mut config = Config::default();
        config.gps.update_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_update_interval_too_high() {
        let mut config = Config::default();
        config.gps.update_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_interval_zero() {
        let mut config = Config::default();
        config.gps.min_update_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_interval_above_nominal_interval() {
        let mut config = Config::default();
        config.gps.update_interval_ms = 2000;
        config.gps.min_update_interval_ms = 2500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_interval_equal_to_nominal_interval() {
        let mut config = Config::default();
        config.gps.update_interval_ms = 1000;
        config.gps.min_update_interval_ms = 1000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.gps.baud_rate = 420000; // Not an NMEA receiver rate
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &[4800, 9600, 19200, 38400, 57600, 115200] {
            let mut config = Config::default();
            config.gps.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_empty_vehicle_type() {
        let mut config = Config::default();
        config.device.vehicle_type = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[server]
url = "http://192.168.1.20:5000/api/update"
connect_timeout_ms = 3000

[gps]
port = "/dev/ttyUSB0"
baud_rate = 115200

[device]
id = "vehicle_test"
vehicle_type = "BUS"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.server.url, "http://192.168.1.20:5000/api/update");
        assert_eq!(config.server.connect_timeout_ms, 3000);
        assert_eq!(config.server.read_timeout_ms, 5000); // default preserved
        assert_eq!(config.gps.port, "/dev/ttyUSB0");
        assert_eq!(config.gps.baud_rate, 115200);
        assert_eq!(config.device.id, "vehicle_test");
        assert_eq!(config.device.vehicle_type, "BUS");
    }

    #[test]
    fn test_load_empty_config_uses_defaults() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"").unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.server.url, default_server_url());
        assert_eq!(config.gps.update_interval_ms, 2000);
        assert_eq!(config.device.vehicle_type, "CAR");
    }

    #[test]
    fn test_load_invalid_config_fails_validation() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[gps]
min_update_interval_ms = 5000
update_interval_ms = 2000
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_identity_uses_configured_id() {
        let device = DeviceConfig {
            id: "vehicle_42".to_string(),
            vehicle_type: default_vehicle_type(),
        };
        assert_eq!(device.identity(), "vehicle_42");
    }

    #[test]
    fn test_identity_derivation_is_stable() {
        let device = DeviceConfig::default();
        let first = device.identity();
        let second = device.identity();

        // Derived from the machine id (or the fixed fallback), so it must be
        // non-empty, prefixed, and identical across calls.
        assert!(first.starts_with("vehicle_"));
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}
