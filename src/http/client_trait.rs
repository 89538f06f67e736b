//! Trait abstraction for HTTP delivery to enable testing

use async_trait::async_trait;

use super::HttpTimeouts;
use crate::error::Result;

/// Trait for the outbound HTTP POST operation
///
/// The reporter only ever needs one verb: POST a JSON body and observe the
/// numeric status code. Keeping the seam this narrow lets the payload and
/// queue logic run against a recording mock instead of a live server.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST `body` as `application/json` to `url`, returning the status code
    async fn post_json(&self, url: &str, body: &[u8], timeouts: &HttpTimeouts) -> Result<u16>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::FleetBeaconError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock HTTP client for testing
    ///
    /// Records every request and replays scripted outcomes in order. When the
    /// script runs out, further requests succeed with status 200.
    #[derive(Clone)]
    pub struct MockHttpClient {
        pub requests: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
        pub outcomes: Arc<Mutex<VecDeque<std::result::Result<u16, String>>>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                outcomes: Arc::new(Mutex::new(VecDeque::new())),
            }
        }

        /// Queue a status code for a future request
        pub fn push_status(&self, status: u16) {
            self.outcomes.lock().unwrap().push_back(Ok(status));
        }

        /// Queue a delivery failure for a future request
        pub fn push_error(&self, message: &str) {
            self.outcomes.lock().unwrap().push_back(Err(message.to_string()));
        }

        /// All requests observed so far, in submission order
        pub fn recorded_requests(&self) -> Vec<(String, Vec<u8>)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn post_json(
            &self,
            url: &str,
            body: &[u8],
            _timeouts: &HttpTimeouts,
        ) -> Result<u16> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), body.to_vec()));

            match self.outcomes.lock().unwrap().pop_front() {
                Some(Ok(status)) => Ok(status),
                Some(Err(message)) => Err(FleetBeaconError::Http(message)),
                None => Ok(200),
            }
        }
    }
}
