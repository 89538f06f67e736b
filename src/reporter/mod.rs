//! # Reporter Module
//!
//! Transforms location fixes into position reports and hands them to the
//! send queue, keeping network I/O off the fix-delivery path.
//!
//! Speed derivation: a source-reported speed (m/s) converts directly to
//! km/h. Without one, speed is estimated from the great-circle distance and
//! whole-second elapsed time between the current fix and the previous one;
//! with no previous fix or a non-positive elapsed time the estimate is 0.

use tracing::debug;

use crate::geo::{haversine_distance_m, MPS_TO_KMH};
use crate::location::LocationFix;

pub mod payload;
pub mod queue;

pub use payload::ReportPayload;
pub use queue::SendQueue;

/// Converts fixes into payloads and submits them for delivery
///
/// Owns the last seen fix for speed estimation. Fixes arrive from a single
/// delivery loop, so there is exactly one writer.
pub struct Reporter {
    device_id: String,
    vehicle_type: String,
    last_fix: Option<LocationFix>,
    queue: SendQueue,
}

impl Reporter {
    /// Create a reporter submitting to the given queue
    pub fn new(device_id: String, vehicle_type: String, queue: SendQueue) -> Self {
        Self {
            device_id,
            vehicle_type,
            last_fix: None,
            queue,
        }
    }

    /// Process one fix: derive speed, remember the fix, enqueue the report
    ///
    /// Fire-and-forget; delivery failures never propagate back here.
    pub fn handle_fix(&mut self, fix: LocationFix) {
        let velocity_kmh = match fix.speed_mps {
            Some(speed_mps) => speed_mps * MPS_TO_KMH,
            None => estimate_speed_kmh(self.last_fix.as_ref(), &fix),
        };

        // The fix just handled becomes the reference for the next estimate
        self.last_fix = Some(fix);

        let payload = ReportPayload::new(&self.device_id, &self.vehicle_type, &fix, velocity_kmh);
        debug!(
            "Queued report: lat={:.6} lng={:.6} velocity={:.1} km/h",
            payload.lat, payload.lng, payload.velocity
        );
        self.queue.submit(payload);
    }

    /// Close the send queue; no further reports are possible afterwards
    pub fn shutdown(&mut self) {
        self.queue.close();
    }
}

/// One-step speed estimate between consecutive fixes, in km/h
///
/// Elapsed time is whole seconds (`(t1 - t0) / 1000` in integer math, as the
/// reporting protocol defines it); a zero or negative elapsed time, or a
/// missing previous fix, yields 0. The result is never negative.
pub(crate) fn estimate_speed_kmh(previous: Option<&LocationFix>, current: &LocationFix) -> f64 {
    let Some(previous) = previous else {
        return 0.0;
    };

    let elapsed_s = (current.timestamp_ms - previous.timestamp_ms) / 1000;
    if elapsed_s <= 0 {
        return 0.0;
    }

    let distance_m = haversine_distance_m(
        previous.latitude,
        previous.longitude,
        current.latitude,
        current.longitude,
    );

    (distance_m / elapsed_s as f64) * MPS_TO_KMH
}
