//! Installation into a host application.
//!
//! The host exposes some shared injection point (an application context, a
//! service container). `install` builds one client from the options, mounts
//! every listed endpoint, and hands the host the client under [`API_KEY`] and
//! its shared HTTP instance under [`HTTP_KEY`].

use std::{any::Any, sync::Arc};

use crate::client::{ApiClient, ClientConfig, Mounted};
use crate::error::Result;
use crate::transport::Transport;

pub const API_KEY: &str = "api";
pub const HTTP_KEY: &str = "http";

/// A host application's shared injection point.
pub trait Host {
    fn provide<T: Any + Send + Sync>(&mut self, key: &'static str, value: T);
}

/// Everything `install` needs.
#[derive(Debug)]
pub struct InstallOptions {
    pub config: ClientConfig,
    pub endpoints: Vec<Mounted>,
}

impl InstallOptions {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            endpoints: Vec::new(),
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<Mounted>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }
}

/// Build a client backed by the default transport and provide it to `host`.
pub fn install<H: Host>(host: &mut H, options: InstallOptions) -> Result<ApiClient> {
    let client = ApiClient::new(options.config)?;
    finish(host, client, options.endpoints)
}

/// Like [`install`], on top of a custom transport.
pub fn install_with_transport<H: Host>(
    host: &mut H,
    options: InstallOptions,
    transport: Arc<dyn Transport>,
) -> Result<ApiClient> {
    let client = ApiClient::with_transport(options.config, transport)?;
    finish(host, client, options.endpoints)
}

fn finish<H: Host>(host: &mut H, client: ApiClient, endpoints: Vec<Mounted>) -> Result<ApiClient> {
    for endpoint in endpoints {
        client.mount_entry(endpoint)?;
    }
    host.provide(API_KEY, client.clone());
    host.provide(HTTP_KEY, client.http());
    tracing::info!(
        base_url = %client.base_url(),
        endpoints = ?client.endpoint_names(),
        "api installed"
    );
    Ok(client)
}
