//! In-memory transport for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Answers every request with the same canned response and records requests.
pub(crate) struct RecordingTransport {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub(crate) fn ok(body: &str) -> Arc<Self> {
        Self::with_status(200, body)
    }

    pub(crate) fn with_status(status: u16, body: &str) -> Arc<Self> {
        Self::with_headers(status, body, Vec::new())
    }

    pub(crate) fn with_headers(
        status: u16,
        body: &str,
        headers: Vec<(String, String)>,
    ) -> Arc<Self> {
        Arc::new(Self {
            status,
            headers,
            body: body.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub(crate) fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        self.requests.lock().push(request);
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            url,
            body: self.body.clone(),
        })
    }
}
