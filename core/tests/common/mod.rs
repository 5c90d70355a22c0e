//! Shared fixtures: a live mock server, a counting transport and the
//! jsonplaceholder-style resource definitions used across integration tests.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use rest_core::{
    ApiClient, ClientConfig, DefaultParameters, Endpoint, HttpRequest, HttpResponse,
    MappedResults, ParameterNames, ReqwestTransport, Resource, Result, Transport,
};

/// Start the mock server on a random port and return its base URL.
pub async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { mock_server::run(listener).await.unwrap() });
    format!("http://{addr}")
}

/// Real HTTP transport that counts outbound requests.
pub struct CountingTransport {
    inner: ReqwestTransport,
    calls: AtomicUsize,
}

impl CountingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: ReqwestTransport::new().unwrap(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for CountingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.send(request).await
    }
}

pub async fn client() -> (ApiClient, Arc<CountingTransport>) {
    let base_url = spawn_server().await;
    let transport = CountingTransport::new();
    let client = ApiClient::with_transport(ClientConfig::new(base_url), transport.clone()).unwrap();
    (client, transport)
}

/// Bare array payload, total read from `X-Total-Count`.
fn map_counted(response: &HttpResponse) -> Result<MappedResults> {
    let results = response.json()?;
    let count = results.as_array().map_or(1, Vec::len) as u64;
    let total = response
        .header("x-total-count")
        .and_then(|value| value.parse().ok())
        .unwrap_or_default();
    Ok(MappedResults::new(results).with_count(count).with_total(total))
}

/// Cachable photos with jsonplaceholder parameter names and no combined
/// filter parameter.
pub fn photos() -> Resource {
    let endpoint = Endpoint::builder("photos")
        .cachable(true)
        .default_parameters(DefaultParameters::default())
        .parameter_names(ParameterNames {
            limit: "_limit".to_string(),
            offset: "_start".to_string(),
            order_direction: "_order".to_string(),
            order_column: "_sort".to_string(),
            order_columns: "order_columns".to_string(),
            filter_columns: None,
        })
        .map_results(map_counted)
        .build();
    Resource::new(endpoint).with_path("/photos")
}

/// Non-cachable posts with the default parameter names.
pub fn posts() -> Resource {
    Resource::new(Endpoint::new("posts"))
}
