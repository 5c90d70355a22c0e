//! The shared, configured HTTP instance and the transports behind it.
//!
//! # Design
//! `Transport` is the raw I/O seam: it turns an `HttpRequest` into an
//! `HttpResponse` and nothing else. Non-2xx statuses are data at this level.
//! `Http` is the configured instance a client owns exactly once: it resolves
//! paths against the base URL, applies default headers and credentials, runs
//! the interceptor chains and turns non-2xx responses into errors.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use base64::Engine;
use indexmap::IndexMap;
use serde::Serialize;
use url::Url;

use crate::error::{ApiError, Result};
use crate::http::{set_header, HttpMethod, HttpRequest, HttpResponse, RequestOptions};
use crate::interceptor::Interceptors;

/// Executes requests against the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Default transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rest-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = header_pairs(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            url,
            body,
        })
    }
}

/// Credentials sent as HTTP basic authentication.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Authentication {
    pub user: String,
    pub password: String,
}

impl Authentication {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.user, self.password));
        format!("Basic {credentials}")
    }
}

/// The configured HTTP instance shared by every endpoint of a client.
pub struct Http {
    base_url: Url,
    headers: Vec<(String, String)>,
    fixed: Vec<String>,
    interceptors: Interceptors,
    transport: Arc<dyn Transport>,
}

impl Http {
    /// `headers` are sent with every request. Names listed in `fixed` can not
    /// be overridden by per-request headers.
    pub fn new(
        base_url: Url,
        headers: Vec<(String, String)>,
        fixed: Vec<String>,
        authentication: Option<&Authentication>,
        interceptors: Interceptors,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let mut headers = headers;
        if let Some(auth) = authentication {
            set_header(&mut headers, "Authorization".to_string(), auth.header_value());
        }
        Self {
            base_url,
            headers,
            fixed,
            interceptors,
            transport,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Append `path` to the base URL's path and `params` to the query, in
    /// order. A path prefix on the base URL is kept.
    ///
    /// This is the only place request URLs are built; endpoint caches key
    /// their entries by the same string.
    pub fn url_for(&self, path: &str, params: &IndexMap<String, String>) -> Result<Url> {
        if self.base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    pub async fn get(&self, path: &str, options: &RequestOptions) -> Result<HttpResponse> {
        self.request(HttpMethod::Get, path, None, options).await
    }

    pub async fn delete(&self, path: &str, options: &RequestOptions) -> Result<HttpResponse> {
        self.request(HttpMethod::Delete, path, None, options).await
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &T,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        let body = to_body(data)?;
        self.request(HttpMethod::Post, path, Some(body), options).await
    }

    pub async fn put<T: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &T,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        let body = to_body(data)?;
        self.request(HttpMethod::Put, path, Some(body), options).await
    }

    pub async fn patch<T: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &T,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        let body = to_body(data)?;
        self.request(HttpMethod::Patch, path, Some(body), options).await
    }

    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        let url = self.url_for(path, &options.params)?;
        let mut headers = self.headers.clone();
        for (name, value) in &options.headers {
            if !self.fixed.iter().any(|fixed| fixed.eq_ignore_ascii_case(name)) {
                set_header(&mut headers, name.clone(), value.clone());
            }
        }

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body,
        };
        let request = self.interceptors.run_request(Ok(request)).await?;

        tracing::trace!(method = %request.method, url = %request.url, "dispatching request");
        let outcome = match self.transport.send(request).await {
            Ok(response) => check_status(response),
            Err(error) => Err(error),
        };
        self.interceptors.run_response(outcome).await
    }
}

impl fmt::Debug for Http {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Http")
            .field("base_url", &self.base_url.as_str())
            .field("headers", &self.headers)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

/// Header values that are not valid UTF-8 are converted lossily, never dropped.
fn header_pairs(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn to_body<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    serde_json::to_string(data).map_err(|e| ApiError::SerializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body,
    })
}
