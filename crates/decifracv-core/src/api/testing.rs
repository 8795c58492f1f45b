//! Scripted in-process transport for gateway and client tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use super::transport::{ApiResponse, OutboundRequest, Transport, TransportError};

#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<String, Vec<(u16, String)>>>,
    sent: Mutex<Vec<OutboundRequest>>,
    offline: bool,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose every exchange fails
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Queue a response for `path` (full URL path, e.g. `/api/v1/history`).
    /// The last queued response for a path repeats once the queue drains.
    pub fn respond(self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .lock()
            .entry(path.to_string())
            .or_default()
            .push((status, body.to_string()));
        self
    }

    pub fn sent(&self) -> Vec<OutboundRequest> {
        self.sent.lock().clone()
    }

    fn next_response(&self, path: &str) -> (u16, String) {
        let mut routes = self.routes.lock();
        match routes.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => (200, "{}".to_string()),
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: OutboundRequest) -> Result<ApiResponse, TransportError> {
        // Let every concurrently issued request get in flight first
        tokio::task::yield_now().await;

        let path = request.url.path().to_string();
        self.sent.lock().push(request);
        if self.offline {
            return Err(TransportError::Unavailable("connection refused".to_string()));
        }

        let (status, body) = self.next_response(&path);
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Ok(ApiResponse::new(status, HeaderMap::new(), body.into_bytes()))
    }
}
