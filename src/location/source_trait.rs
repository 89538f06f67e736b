//! Trait abstraction for location delivery to enable testing

use async_trait::async_trait;

use super::{LocationFix, LocationRequest};
use crate::error::Result;

/// Trait for a subscription-style location provider
///
/// Mirrors the shape of a platform location service: request periodic
/// updates, await fixes one at a time, cancel the subscription. `Ok(None)`
/// from [`next_fix`](LocationSource::next_fix) means the provider produced
/// nothing usable this round; consumers discard it silently.
#[async_trait]
pub trait LocationSource: Send {
    /// Begin delivering fixes per the given request
    async fn request_updates(&mut self, request: &LocationRequest) -> Result<()>;

    /// Await the next fix, or `None` when no usable fix was produced
    async fn next_fix(&mut self) -> Result<Option<LocationFix>>;

    /// Cancel fix delivery; safe to call even if updates were never requested
    async fn stop_updates(&mut self) -> Result<()>;
}
