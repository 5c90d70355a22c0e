//! A named remote collection bound to one client.
//!
//! # Design
//! An `Endpoint` is configured explicitly through [`EndpointBuilder`]: its
//! name, whether reads are cached, the parameter defaults and names used by
//! resources, and the mapping hooks. It keeps a non-owning reference to the
//! client it is mounted on, assigned once by [`ApiClient::mount`], and refuses
//! to issue requests before that.
//!
//! Cachable endpoints keep every successful read in an unbounded map keyed by
//! the absolute request URL (`Http::url_for`). There is no expiry; entries
//! leave the cache only through [`Endpoint::flush_cache`]. Two concurrent
//! reads of the same uncached URL both reach the network and the later write
//! wins.
//!
//! [`ApiClient::mount`]: crate::client::ApiClient::mount

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock, Weak},
};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::client::ClientInner;
use crate::error::{ApiError, Result};
use crate::http::{HttpResponse, RequestOptions};
use crate::response::{ApiResponse, MappedResults, ResultMapper};
use crate::transport::Http;

/// Encodes filter columns into a single query parameter value.
pub type FilterMapper = fn(&IndexMap<String, String>) -> String;

/// Encodes order columns into a single query parameter value.
pub type OrderMapper = fn(&IndexMap<String, Direction>) -> String;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values used when a list request does not specify them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DefaultParameters {
    pub paginate: bool,
    pub limit: u64,
    pub offset: u64,
    pub order_direction: Direction,
}

impl Default for DefaultParameters {
    fn default() -> Self {
        Self {
            paginate: true,
            limit: 10,
            offset: 0,
            order_direction: Direction::Asc,
        }
    }
}

/// Query parameter names the backend understands.
///
/// `filter_columns: None` means the backend has no combined filter parameter;
/// filters are then sent as plain `field=value` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParameterNames {
    pub limit: String,
    pub offset: String,
    pub order_direction: String,
    pub order_column: String,
    pub order_columns: String,
    pub filter_columns: Option<String>,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            limit: "limit".to_string(),
            offset: "offset".to_string(),
            order_direction: "direction".to_string(),
            order_column: "order_column".to_string(),
            order_columns: "order_columns".to_string(),
            filter_columns: Some("filter_columns".to_string()),
        }
    }
}

/// Default result mapper: the whole payload is the result set.
pub fn map_results(response: &HttpResponse) -> Result<MappedResults> {
    Ok(MappedResults::new(response.json()?))
}

/// Default filter encoding: `field:value` pairs joined by commas.
pub fn map_filters(filters: &IndexMap<String, String>) -> String {
    filters
        .iter()
        .map(|(field, value)| format!("{field}:{value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Default order encoding: `field:DIRECTION` pairs joined by commas.
pub fn map_orders(orders: &IndexMap<String, Direction>) -> String {
    orders
        .iter()
        .map(|(field, direction)| format!("{field}:{direction}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub struct Endpoint {
    name: String,
    default_parameters: DefaultParameters,
    parameter_names: ParameterNames,
    map_results: ResultMapper,
    map_filters: FilterMapper,
    map_orders: OrderMapper,
    cache: Option<Mutex<HashMap<String, ApiResponse>>>,
    client: OnceLock<Weak<ClientInner>>,
}

impl Endpoint {
    /// A non-cachable endpoint with default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    pub fn builder(name: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder::new(name)
    }

    /// Registry key and default path segment. Always lower case.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_cachable(&self) -> bool {
        self.cache.is_some()
    }

    pub fn is_mounted(&self) -> bool {
        self.client.get().is_some()
    }

    pub fn default_parameters(&self) -> &DefaultParameters {
        &self.default_parameters
    }

    pub fn parameter_names(&self) -> &ParameterNames {
        &self.parameter_names
    }

    pub fn map_filters(&self, filters: &IndexMap<String, String>) -> String {
        (self.map_filters)(filters)
    }

    pub fn map_orders(&self, orders: &IndexMap<String, Direction>) -> String {
        (self.map_orders)(orders)
    }

    /// Record the owning client. Only the first call succeeds.
    pub(crate) fn mount(&self, client: Weak<ClientInner>) -> Result<()> {
        self.client
            .set(client)
            .map_err(|_| ApiError::AlreadyMounted(self.name.clone()))
    }

    /// The owning client's HTTP instance.
    pub fn http(&self) -> Result<Arc<Http>> {
        self.client
            .get()
            .and_then(Weak::upgrade)
            .map(|client| client.http())
            .ok_or_else(|| ApiError::NotMounted(self.name.clone()))
    }

    /// The cache key a read of `path` with `params` is stored under.
    pub fn cache_key(&self, path: &str, params: &IndexMap<String, String>) -> Result<String> {
        Ok(self.http()?.url_for(path, params)?.to_string())
    }

    /// Read `path` and wrap the response in an [`ApiResponse`].
    ///
    /// For cachable endpoints a previously stored response for the same URL
    /// is returned without a network call, flagged with `from_cache`.
    pub async fn get(&self, path: &str, options: &RequestOptions) -> Result<ApiResponse> {
        let http = self.http()?;
        let Some(cache) = &self.cache else {
            let response = http.get(path, options).await?;
            return ApiResponse::new(response, self.map_results);
        };

        let key = http.url_for(path, &options.params)?.to_string();
        let hit = cache.lock().get_mut(&key).map(|cached| {
            cached.mark_cached();
            cached.clone()
        });
        if let Some(response) = hit {
            tracing::debug!(endpoint = %self.name, url = %key, "cache hit");
            return Ok(response);
        }

        tracing::debug!(endpoint = %self.name, url = %key, "cache miss");
        let response = ApiResponse::new(http.get(path, options).await?, self.map_results)?;
        if response.url() != key {
            tracing::debug!(
                endpoint = %self.name,
                url = %key,
                response_url = %response.url(),
                "response URL differs from cache key"
            );
        }
        cache.lock().insert(key, response.clone());
        Ok(response)
    }

    pub async fn delete(&self, path: &str, options: &RequestOptions) -> Result<HttpResponse> {
        self.http()?.delete(path, options).await
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &T,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        self.http()?.post(path, data, options).await
    }

    pub async fn put<T: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &T,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        self.http()?.put(path, data, options).await
    }

    pub async fn patch<T: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &T,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        self.http()?.patch(path, data, options).await
    }

    /// Drop one cached URL, or everything when `url` is `None`.
    /// No-op for endpoints that don't cache.
    pub fn flush_cache(&self, url: Option<&str>) {
        let Some(cache) = &self.cache else {
            return;
        };
        match url {
            Some(url) => {
                cache.lock().remove(url);
            }
            None => cache.lock().clear(),
        }
        tracing::debug!(endpoint = %self.name, url = ?url, "cache flushed");
    }

    /// Number of cached responses.
    pub fn cache_len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.lock().len())
    }

    pub fn is_cached(&self, url: &str) -> bool {
        self.cache
            .as_ref()
            .is_some_and(|cache| cache.lock().contains_key(url))
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("cachable", &self.is_cachable())
            .field("cached", &self.cache_len())
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Endpoint`].
#[derive(Debug)]
pub struct EndpointBuilder {
    name: String,
    cachable: bool,
    default_parameters: DefaultParameters,
    parameter_names: ParameterNames,
    map_results: ResultMapper,
    map_filters: FilterMapper,
    map_orders: OrderMapper,
}

impl EndpointBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            cachable: false,
            default_parameters: DefaultParameters::default(),
            parameter_names: ParameterNames::default(),
            map_results,
            map_filters,
            map_orders,
        }
    }

    pub fn cachable(mut self, cachable: bool) -> Self {
        self.cachable = cachable;
        self
    }

    pub fn default_parameters(mut self, defaults: DefaultParameters) -> Self {
        self.default_parameters = defaults;
        self
    }

    pub fn parameter_names(mut self, names: ParameterNames) -> Self {
        self.parameter_names = names;
        self
    }

    pub fn map_results(mut self, mapper: ResultMapper) -> Self {
        self.map_results = mapper;
        self
    }

    pub fn map_filters(mut self, mapper: FilterMapper) -> Self {
        self.map_filters = mapper;
        self
    }

    pub fn map_orders(mut self, mapper: OrderMapper) -> Self {
        self.map_orders = mapper;
        self
    }

    pub fn build(self) -> Endpoint {
        Endpoint {
            name: self.name,
            default_parameters: self.default_parameters,
            parameter_names: self.parameter_names,
            map_results: self.map_results,
            map_filters: self.map_filters,
            map_orders: self.map_orders,
            cache: self.cachable.then(|| Mutex::new(HashMap::new())),
            client: OnceLock::new(),
        }
    }
}
