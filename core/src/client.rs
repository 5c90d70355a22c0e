//! Shared configuration root and endpoint registry.
//!
//! # Design
//! `ApiClient` is a cheap handle (`Arc` inside) around the shared state: the
//! base URL, the merged default headers, the optional credentials, the single
//! `Http` instance built at construction, and the registry of mounted
//! endpoints. Endpoints point back at the shared state through a `Weak`, so
//! the registry owning endpoints does not form a cycle.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Deserialize;
use url::Url;

use crate::endpoint::Endpoint;
use crate::error::{ApiError, Result};
use crate::interceptor::{Interceptors, RequestInterceptor, ResponseInterceptor};
use crate::resource::Resource;
use crate::transport::{Authentication, Http, ReqwestTransport, Transport};

/// Media type of every request and response body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Value of the `X-Requested-With` marker header.
pub const REQUESTED_WITH: &str = "XMLHttpRequest";

/// Names endpoints may not be mounted under, as they would shadow client
/// members.
pub const RESERVED_NAMES: &[&str] = &[
    "authentication",
    "base_url",
    "config",
    "endpoint",
    "endpoint_names",
    "endpoints",
    "headers",
    "http",
    "is_mounted",
    "mount",
    "mount_entry",
    "resource",
];

fn fixed_headers() -> Vec<(String, String)> {
    vec![
        ("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()),
        ("X-Requested-With".to_string(), REQUESTED_WITH.to_string()),
    ]
}

/// Client configuration.
///
/// The data fields can be loaded from JSON; interceptors are registered in
/// code.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default)]
    pub authentication: Option<Authentication>,
    #[serde(skip)]
    pub interceptors: Interceptors,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: IndexMap::new(),
            authentication: None,
            interceptors: Interceptors::new(),
        }
    }

    /// Read `API_BASE_URL`, and optionally `API_USER` / `API_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("API_BASE_URL")
            .map_err(|_| ApiError::Configuration("API_BASE_URL is not set".to_string()))?;
        let mut config = Self::new(base_url);
        if let (Ok(user), Ok(password)) = (std::env::var("API_USER"), std::env::var("API_PASSWORD")) {
            config.authentication = Some(Authentication::new(user, password));
        }
        Ok(config)
    }

    /// Parse the data fields from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ApiError::Configuration(e.to_string()))
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn authentication(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.authentication = Some(Authentication::new(user, password));
        self
    }

    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.interceptors.request.push(Arc::new(interceptor));
        self
    }

    pub fn response_interceptor(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.interceptors.response.push(Arc::new(interceptor));
        self
    }
}

/// An endpoint as held by the registry.
#[derive(Debug, Clone)]
pub enum Mounted {
    Endpoint(Arc<Endpoint>),
    Resource(Arc<Resource>),
}

impl Mounted {
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            Mounted::Endpoint(endpoint) => endpoint,
            Mounted::Resource(resource) => resource.endpoint(),
        }
    }

    pub fn name(&self) -> &str {
        self.endpoint().name()
    }

    pub fn as_resource(&self) -> Option<&Arc<Resource>> {
        match self {
            Mounted::Resource(resource) => Some(resource),
            Mounted::Endpoint(_) => None,
        }
    }
}

impl From<Endpoint> for Mounted {
    fn from(endpoint: Endpoint) -> Self {
        Mounted::Endpoint(Arc::new(endpoint))
    }
}

impl From<Arc<Endpoint>> for Mounted {
    fn from(endpoint: Arc<Endpoint>) -> Self {
        Mounted::Endpoint(endpoint)
    }
}

impl From<Resource> for Mounted {
    fn from(resource: Resource) -> Self {
        Mounted::Resource(Arc::new(resource))
    }
}

impl From<Arc<Resource>> for Mounted {
    fn from(resource: Arc<Resource>) -> Self {
        Mounted::Resource(resource)
    }
}

/// Types that can be mounted on a client.
pub trait Mountable: Send + Sync + 'static {
    fn into_mounted(self: Arc<Self>) -> Mounted;
}

impl Mountable for Endpoint {
    fn into_mounted(self: Arc<Self>) -> Mounted {
        Mounted::Endpoint(self)
    }
}

impl Mountable for Resource {
    fn into_mounted(self: Arc<Self>) -> Mounted {
        Mounted::Resource(self)
    }
}

pub(crate) struct ClientInner {
    base_url: Url,
    headers: Vec<(String, String)>,
    authentication: Option<Authentication>,
    http: Arc<Http>,
    endpoints: RwLock<IndexMap<String, Mounted>>,
}

impl ClientInner {
    pub(crate) fn http(&self) -> Arc<Http> {
        Arc::clone(&self.http)
    }
}

/// Entry point to a remote API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Build a client backed by [`ReqwestTransport`].
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()?))
    }

    /// Build a client on top of a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;

        let mut headers = fixed_headers();
        headers.extend(
            config
                .headers
                .into_iter()
                .filter(|(name, _)| !is_fixed_header(name)),
        );
        let fixed = fixed_headers().into_iter().map(|(name, _)| name).collect();

        let http = Http::new(
            base_url.clone(),
            headers.clone(),
            fixed,
            config.authentication.as_ref(),
            config.interceptors,
            transport,
        );
        tracing::debug!(base_url = %base_url, "api client created");

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url,
                headers,
                authentication: config.authentication,
                http: Arc::new(http),
                endpoints: RwLock::new(IndexMap::new()),
            }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Default headers: the fixed JSON headers followed by caller headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.inner.headers
    }

    pub fn authentication(&self) -> Option<&Authentication> {
        self.inner.authentication.as_ref()
    }

    /// The shared HTTP instance every endpoint delegates to.
    pub fn http(&self) -> Arc<Http> {
        self.inner.http()
    }

    /// Mount `endpoint` under its name and return the shared handle.
    pub fn mount<E: Mountable>(&self, endpoint: E) -> Result<Arc<E>> {
        let endpoint = Arc::new(endpoint);
        self.mount_entry(Arc::clone(&endpoint).into_mounted())?;
        Ok(endpoint)
    }

    /// Mount an already-wrapped endpoint.
    ///
    /// Fails without touching the registry when the name is taken, reserved,
    /// or the endpoint already belongs to a client.
    pub fn mount_entry(&self, entry: impl Into<Mounted>) -> Result<()> {
        let entry = entry.into();
        let name = entry.name().to_string();

        let mut endpoints = self.inner.endpoints.write();
        if endpoints.contains_key(&name) {
            return Err(ApiError::NameTaken(name));
        }
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(ApiError::ReservedName(name));
        }
        entry.endpoint().mount(Arc::downgrade(&self.inner))?;
        tracing::debug!(endpoint = %name, cachable = entry.endpoint().is_cachable(), "endpoint mounted");
        endpoints.insert(name, entry);
        Ok(())
    }

    pub fn endpoint(&self, name: &str) -> Option<Mounted> {
        self.inner.endpoints.read().get(name).cloned()
    }

    pub fn resource(&self, name: &str) -> Option<Arc<Resource>> {
        self.endpoint(name)
            .and_then(|mounted| mounted.as_resource().cloned())
    }

    pub fn endpoint_names(&self) -> Vec<String> {
        self.inner.endpoints.read().keys().cloned().collect()
    }

    pub fn is_mounted(&self, name: &str) -> bool {
        self.inner.endpoints.read().contains_key(name)
    }

    #[cfg(test)]
    pub(crate) fn downgrade(&self) -> std::sync::Weak<ClientInner> {
        Arc::downgrade(&self.inner)
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("headers", &self.inner.headers)
            .field("endpoints", &self.endpoint_names())
            .finish_non_exhaustive()
    }
}

fn is_fixed_header(name: &str) -> bool {
    fixed_headers()
        .iter()
        .any(|(fixed, _)| fixed.eq_ignore_ascii_case(name))
}
