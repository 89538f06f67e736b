//! # Report Payload
//!
//! The wire format consumed by the tracking server's `/api/update` endpoint.

use serde::Serialize;

use crate::geo::grid_coordinate;
use crate::location::LocationFix;

/// One position report, serialized to JSON for delivery
///
/// `x` and `y` are the server's lossy local-grid projection of the raw
/// coordinates; `velocity` is in km/h and never negative.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportPayload {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub x: f64,
    pub y: f64,
    pub velocity: f64,
    pub vehicle_type: String,
}

impl ReportPayload {
    /// Build a payload from a fix and an already-derived velocity
    pub fn new(device_id: &str, vehicle_type: &str, fix: &LocationFix, velocity_kmh: f64) -> Self {
        Self {
            id: device_id.to_string(),
            lat: fix.latitude,
            lng: fix.longitude,
            x: grid_coordinate(fix.latitude),
            y: grid_coordinate(fix.longitude),
            velocity: velocity_kmh,
            vehicle_type: vehicle_type.to_string(),
        }
    }
}
