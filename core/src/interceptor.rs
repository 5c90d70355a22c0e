//! Request and response interceptors.
//!
//! Each interceptor is a pair of hooks: one for the success path and one for
//! the error path. Chains run in registration order and every step receives
//! the outcome of the previous step, so an error hook may recover by returning
//! `Ok`, and a success hook may reject by returning `Err`.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse};

/// Runs before a request is handed to the transport.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Inspect or rewrite the outgoing request.
    async fn on_request(&self, request: HttpRequest) -> Result<HttpRequest>;

    /// Called when an earlier interceptor rejected the request.
    async fn on_error(&self, error: ApiError) -> Result<HttpRequest> {
        Err(error)
    }
}

/// Runs after the transport produced a response or failed.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    /// Inspect or rewrite a successful (2xx) response.
    async fn on_response(&self, response: HttpResponse) -> Result<HttpResponse>;

    /// Called for transport failures, non-2xx statuses and earlier rejections.
    async fn on_error(&self, error: ApiError) -> Result<HttpResponse> {
        Err(error)
    }
}

/// Interceptor chains registered on a client.
#[derive(Clone, Default)]
pub struct Interceptors {
    pub request: Vec<Arc<dyn RequestInterceptor>>,
    pub response: Vec<Arc<dyn ResponseInterceptor>>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.response.is_empty()
    }

    pub(crate) async fn run_request(&self, mut outcome: Result<HttpRequest>) -> Result<HttpRequest> {
        for interceptor in &self.request {
            outcome = match outcome {
                Ok(request) => interceptor.on_request(request).await,
                Err(error) => interceptor.on_error(error).await,
            };
        }
        outcome
    }

    pub(crate) async fn run_response(
        &self,
        mut outcome: Result<HttpResponse>,
    ) -> Result<HttpResponse> {
        for interceptor in &self.response {
            outcome = match outcome {
                Ok(response) => interceptor.on_response(response).await,
                Err(error) => interceptor.on_error(error).await,
            };
        }
        outcome
    }
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors")
            .field("request", &self.request.len())
            .field("response", &self.response.len())
            .finish()
    }
}

/// Logs requests and responses through `tracing`.
#[derive(Debug, Default)]
pub struct LoggingInterceptor {
    log_headers: bool,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log every header at trace level.
    pub fn with_headers(mut self) -> Self {
        self.log_headers = true;
        self
    }
}

#[async_trait]
impl RequestInterceptor for LoggingInterceptor {
    async fn on_request(&self, request: HttpRequest) -> Result<HttpRequest> {
        tracing::debug!(method = %request.method, url = %request.url, "sending HTTP request");
        if self.log_headers {
            for (name, value) in &request.headers {
                tracing::trace!(header = %name, value = %value, "request header");
            }
        }
        Ok(request)
    }
}

#[async_trait]
impl ResponseInterceptor for LoggingInterceptor {
    async fn on_response(&self, response: HttpResponse) -> Result<HttpResponse> {
        tracing::debug!(status = response.status, url = %response.url, "received HTTP response");
        if self.log_headers {
            for (name, value) in &response.headers {
                tracing::trace!(header = %name, value = %value, "response header");
            }
        }
        Ok(response)
    }

    async fn on_error(&self, error: ApiError) -> Result<HttpResponse> {
        tracing::warn!(%error, "HTTP request failed");
        Err(error)
    }
}
