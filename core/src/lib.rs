//! Named REST endpoints over a shared, configured HTTP client.
//!
//! # Overview
//! An [`ApiClient`] owns one configured [`Http`] instance (base URL, default
//! headers, credentials, interceptors). [`Endpoint`]s and [`Resource`]s are
//! built independently, then mounted on the client under their name. Reads
//! come back wrapped in an [`ApiResponse`] exposing `results`, `count`,
//! `total`, `first` and `last` whatever the backend's response shape.
//!
//! # Design
//! - The network is behind the [`Transport`] trait; [`ReqwestTransport`] is
//!   the default, tests plug in their own.
//! - Endpoint configuration (name, path, parameter names, mappers) is
//!   explicit data rather than derived from type names.
//! - List queries are built by a [`Query`] value consumed by its terminal
//!   call, so chained options never outlive the request they describe.
//! - Cachable endpoints keep successful reads keyed by absolute request URL
//!   until flushed by hand.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod install;
pub mod interceptor;
pub mod resource;
pub mod response;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{ApiClient, ClientConfig, Mountable, Mounted};
pub use endpoint::{DefaultParameters, Direction, Endpoint, EndpointBuilder, ParameterNames};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestOptions};
pub use install::{install, install_with_transport, Host, InstallOptions};
pub use interceptor::{Interceptors, LoggingInterceptor, RequestInterceptor, ResponseInterceptor};
pub use resource::{IndexOptions, Query, Resource};
pub use response::{ApiResponse, MappedResults, ResultMapper};
pub use transport::{Authentication, Http, ReqwestTransport, Transport};
