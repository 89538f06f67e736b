//! # Send Queue
//!
//! Single-worker serialized delivery queue.
//!
//! Reports are processed strictly in submission order with at most one send
//! in flight. The channel is unbounded and nothing is coalesced or dropped,
//! so a slow server backs fixes up rather than losing them. That is a known
//! limitation of the reporting protocol, kept deliberately.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::payload::ReportPayload;
use crate::http::{HttpClient, HttpTimeouts};

/// FIFO queue with one consumer task performing HTTP sends
///
/// Failures are logged and discarded; a failed send never prevents later
/// sends. Closing the queue stops new submissions while already-queued
/// reports keep draining in the background; there is no flush guarantee.
pub struct SendQueue {
    sender: Option<mpsc::UnboundedSender<ReportPayload>>,
    // Held so tests can await the drain; production code never joins it
    #[allow(dead_code)]
    worker: Option<JoinHandle<()>>,
}

impl SendQueue {
    /// Spawn the worker task delivering to `server_url`
    pub fn spawn(
        client: Arc<dyn HttpClient>,
        server_url: String,
        timeouts: HttpTimeouts,
    ) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ReportPayload>();

        let worker = tokio::spawn(async move {
            while let Some(payload) = receiver.recv().await {
                let body = match serde_json::to_vec(&payload) {
                    Ok(body) => body,
                    Err(e) => {
                        warn!("Failed to serialize report: {}", e);
                        continue;
                    }
                };

                match client.post_json(&server_url, &body, &timeouts).await {
                    Ok(status) => debug!("Server response: {}", status),
                    Err(e) => warn!("Failed to send report: {}", e),
                }
            }

            debug!("Send queue worker exiting");
        });

        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Submit a report for background delivery
    ///
    /// Fire-and-forget: a report submitted after `close()` is dropped with a
    /// warning, matching the no-further-reports contract after shutdown.
    pub fn submit(&self, payload: ReportPayload) {
        match &self.sender {
            Some(sender) => {
                if sender.send(payload).is_err() {
                    warn!("Send queue is gone, dropping report");
                }
            }
            None => warn!("Send queue is closed, dropping report"),
        }
    }

    /// Close the queue to new submissions
    ///
    /// Already-queued reports keep draining on the worker; nothing waits for
    /// them.
    pub fn close(&mut self) {
        self.sender = None;
    }

    /// Wait for the worker to drain and exit (test synchronization only)
    #[cfg(test)]
    pub async fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::client_trait::mocks::MockHttpClient;
    use crate::location::LocationFix;

    fn payload(id: &str) -> ReportPayload {
        let fix = LocationFix {
            latitude: 12.9,
            longitude: 77.6,
            timestamp_ms: 1000,
            speed_mps: Some(10.0),
        };
        ReportPayload::new(id, "CAR", &fix, 36.0)
    }

    fn test_timeouts() -> HttpTimeouts {
        HttpTimeouts::from_millis(1000, 1000)
    }

    #[tokio::test]
    async fn test_sends_preserve_submission_order() {
        let client = MockHttpClient::new();
        let mut queue = SendQueue::spawn(
            Arc::new(client.clone()),
            "http://127.0.0.1:5000/api/update".to_string(),
            test_timeouts(),
        );

        queue.submit(payload("first"));
        queue.submit(payload("second"));
        queue.submit(payload("third"));

        queue.close();
        queue.join().await;

        let ids: Vec<String> = client
            .recorded_requests()
            .iter()
            .map(|(_, body)| {
                let value: serde_json::Value = serde_json::from_slice(body).unwrap();
                value["id"].as_str().unwrap().to_string()
            })
            .collect();

        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_failed_send_does_not_poison_queue() {
        let client = MockHttpClient::new();
        client.push_error("connection refused");
        client.push_status(200);

        let mut queue = SendQueue::spawn(
            Arc::new(client.clone()),
            "http://127.0.0.1:5000/api/update".to_string(),
            test_timeouts(),
        );

        queue.submit(payload("first"));
        queue.submit(payload("second"));

        queue.close();
        queue.join().await;

        // Both sends were attempted despite the first one failing
        assert_eq!(client.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_after_close_drops_report() {
        let client = MockHttpClient::new();
        let mut queue = SendQueue::spawn(
            Arc::new(client.clone()),
            "http://127.0.0.1:5000/api/update".to_string(),
            test_timeouts(),
        );

        queue.close();
        queue.submit(payload("late"));
        queue.join().await;

        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_queued_reports_drain_after_close() {
        let client = MockHttpClient::new();
        let mut queue = SendQueue::spawn(
            Arc::new(client.clone()),
            "http://127.0.0.1:5000/api/update".to_string(),
            test_timeouts(),
        );

        for i in 0..5 {
            queue.submit(payload(&format!("report-{}", i)));
        }
        queue.close();
        queue.join().await;

        assert_eq!(client.recorded_requests().len(), 5);
    }
}
