//! # Geographic Math Module
//!
//! Coordinate math shared by the speed estimator and the report payload:
//! great-circle distance, speed unit conversions, and the server's
//! coordinate-to-local-grid transform.

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters-per-second to kilometers-per-hour conversion factor
pub const MPS_TO_KMH: f64 = 3.6;

/// Knots (NMEA speed over ground) to meters-per-second conversion factor
pub const KNOTS_TO_MPS: f64 = 1852.0 / 3600.0;

/// Great-circle distance between two coordinates in meters
///
/// Haversine formula on a spherical Earth. Matches the distance a device
/// location API reports for two nearby fixes to well under a meter, which is
/// all the one-step speed estimate needs.
///
/// # Arguments
///
/// * `lat1`, `lon1` - First coordinate in decimal degrees
/// * `lat2`, `lon2` - Second coordinate in decimal degrees
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Map a coordinate onto the server's local reporting grid
///
/// Computes `(coordinate * 1000) mod 200` with floating-point remainder
/// semantics: the sign of the result follows the dividend. The transform is
/// lossy and has no inverse; the server consumes it as-is.
///
/// # Examples
///
/// ```
/// use fleet_beacon::geo::grid_coordinate;
///
/// assert_eq!(grid_coordinate(12.5), 100.0);
/// assert_eq!(grid_coordinate(-12.5), -100.0);
/// ```
pub fn grid_coordinate(coordinate: f64) -> f64 {
    (coordinate * 1000.0) % 200.0
}
