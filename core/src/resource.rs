//! CRUD conveniences and list query building over one named path.
//!
//! # Design
//! A `Resource` composes an [`Endpoint`] and adds a path. List requests are
//! described by [`IndexOptions`]; the fluent [`Query`] builder accumulates
//! options in a value owned by the chain, and the terminal `index`/`all` call
//! consumes it. Nothing is stored on the resource between calls, so a chain
//! can never leak into the next request, and several chains may be built on
//! the same resource at once.
//!
//! Options are merged in increasing precedence: the endpoint's
//! [`DefaultParameters`], the chained options, then the options passed to the
//! terminal call.
//!
//! [`DefaultParameters`]: crate::endpoint::DefaultParameters

use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoint::{Direction, Endpoint};
use crate::error::Result;
use crate::http::{set_header, HttpResponse, RequestOptions};
use crate::response::ApiResponse;

/// Options of a list request. `None` fields fall back to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    pub paginate: Option<bool>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub order_column: Option<String>,
    pub order_direction: Option<Direction>,
    pub order_columns: Option<IndexMap<String, Direction>>,
    pub filter_columns: Option<IndexMap<String, String>>,
    /// Raw query parameters, sent verbatim.
    pub parameters: IndexMap<String, String>,
    pub headers: Vec<(String, String)>,
}

impl IndexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paginate(mut self, paginate: bool) -> Self {
        self.paginate = Some(paginate);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_column = Some(column.into());
        self.order_direction = Some(direction);
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.parameters.insert(name.into(), value.to_string());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Layer `over` on top of `self`: every field `over` sets wins, raw
    /// parameters are merged key by key.
    pub fn merge(self, over: IndexOptions) -> IndexOptions {
        let mut parameters = self.parameters;
        parameters.extend(over.parameters);
        IndexOptions {
            paginate: over.paginate.or(self.paginate),
            limit: over.limit.or(self.limit),
            offset: over.offset.or(self.offset),
            order_column: over.order_column.or(self.order_column),
            order_direction: over.order_direction.or(self.order_direction),
            order_columns: over.order_columns.or(self.order_columns),
            filter_columns: over.filter_columns.or(self.filter_columns),
            parameters,
            headers: if over.headers.is_empty() {
                self.headers
            } else {
                over.headers
            },
        }
    }
}

/// An endpoint with a path and CRUD conveniences.
#[derive(Debug)]
pub struct Resource {
    endpoint: Endpoint,
    path: String,
}

impl Resource {
    /// A resource at `/<endpoint name>`.
    pub fn new(endpoint: Endpoint) -> Self {
        let path = format!("/{}", endpoint.name());
        Self { endpoint, path }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn name(&self) -> &str {
        self.endpoint.name()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn item_path(&self, id: impl Display) -> String {
        format!("{}/{id}", self.path)
    }

    /// Start an empty query chain.
    pub fn query(&self) -> Query<'_> {
        Query {
            resource: self,
            options: IndexOptions::default(),
        }
    }

    /// Start a chain with pagination enabled.
    pub fn paginate(&self, limit: u64, offset: u64) -> Query<'_> {
        self.query().paginate(limit, offset)
    }

    /// Start a chain with pagination at the default limit and offset.
    pub fn paginated(&self) -> Query<'_> {
        self.query().paginated()
    }

    pub fn order_by(&self, field: impl Into<String>, direction: Direction) -> Query<'_> {
        self.query().order_by(field, direction)
    }

    pub fn order_by_default(&self, field: impl Into<String>) -> Query<'_> {
        self.query().order_by_default(field)
    }

    pub fn filter_by(&self, field: impl Into<String>, value: impl ToString) -> Query<'_> {
        self.query().filter_by(field, value)
    }

    /// Translate merged options into transport parameters.
    ///
    /// `chained` are options accumulated by a [`Query`]; `options` come from
    /// the caller and win on conflict.
    pub fn request_options(&self, chained: IndexOptions, options: IndexOptions) -> RequestOptions {
        let defaults = self.endpoint.default_parameters();
        let names = self.endpoint.parameter_names();
        let merged = chained.merge(options);

        let mut params = merged.parameters;
        if merged.paginate.unwrap_or(defaults.paginate) {
            let limit = merged.limit.unwrap_or(defaults.limit);
            let offset = merged.offset.unwrap_or(defaults.offset);
            params.insert(names.limit.clone(), limit.to_string());
            params.insert(names.offset.clone(), offset.to_string());
        }

        let direction = merged.order_direction.unwrap_or(defaults.order_direction);
        if let Some(column) = merged.order_column {
            params.insert(names.order_column.clone(), column);
            params.insert(names.order_direction.clone(), direction.to_string());
        }

        if let Some(columns) = merged.order_columns {
            if columns.len() == 1 {
                if let Some((column, direction)) = columns.first() {
                    params.insert(names.order_column.clone(), column.clone());
                    params.insert(names.order_direction.clone(), direction.to_string());
                }
            } else if columns.len() > 1 {
                params.insert(names.order_columns.clone(), self.endpoint.map_orders(&columns));
            }
        }

        if let Some(filters) = merged.filter_columns {
            match &names.filter_columns {
                Some(name) => {
                    params.insert(name.clone(), self.endpoint.map_filters(&filters));
                }
                None => params.extend(filters),
            }
        }

        RequestOptions {
            params,
            headers: merged.headers,
        }
    }

    /// List request with caller `options` only.
    pub async fn index(&self, options: IndexOptions) -> Result<ApiResponse> {
        self.query().index(options).await
    }

    /// Every result, unpaginated, without envelope metadata.
    pub async fn all(&self, options: IndexOptions) -> Result<Vec<Value>> {
        self.query().all(options).await
    }

    /// GET `<path>/<id>` and return the first result.
    pub async fn one(&self, id: impl Display, options: &RequestOptions) -> Result<Option<Value>> {
        let response = self.endpoint.get(&self.item_path(id), options).await?;
        Ok(response.first().cloned())
    }

    pub async fn create<T: Serialize + ?Sized>(
        &self,
        data: &T,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        self.endpoint.post(&self.path, data, options).await
    }

    pub async fn update<T: Serialize + ?Sized>(
        &self,
        id: impl Display,
        data: &T,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        self.endpoint.put(&self.item_path(id), data, options).await
    }

    pub async fn destroy(&self, id: impl Display, options: &RequestOptions) -> Result<HttpResponse> {
        self.endpoint.delete(&self.item_path(id), options).await
    }

    pub fn flush_cache(&self, url: Option<&str>) {
        self.endpoint.flush_cache(url);
    }
}

/// A single-use list query over a [`Resource`].
///
/// Built by chaining; consumed by [`Query::index`] or [`Query::all`].
#[derive(Debug, Clone)]
#[must_use = "a query does nothing until `index` or `all` is called"]
pub struct Query<'r> {
    resource: &'r Resource,
    options: IndexOptions,
}

impl<'r> Query<'r> {
    pub fn paginate(mut self, limit: u64, offset: u64) -> Self {
        self.options.paginate = Some(true);
        self.options.limit = Some(limit);
        self.options.offset = Some(offset);
        self
    }

    pub fn paginated(self) -> Self {
        let defaults = self.resource.endpoint.default_parameters();
        let (limit, offset) = (defaults.limit, defaults.offset);
        self.paginate(limit, offset)
    }

    /// Add an order column. Repeating a field replaces its direction.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.options
            .order_columns
            .get_or_insert_with(IndexMap::new)
            .insert(field.into(), direction);
        self
    }

    pub fn order_by_default(self, field: impl Into<String>) -> Self {
        let direction = self.resource.endpoint.default_parameters().order_direction;
        self.order_by(field, direction)
    }

    /// Add a filter. Without a filter parameter name the value is sent as a
    /// plain `field=value` parameter.
    pub fn filter_by(mut self, field: impl Into<String>, value: impl ToString) -> Self {
        let field = field.into();
        let value = value.to_string();
        if self.resource.endpoint.parameter_names().filter_columns.is_none() {
            self.options.parameters.insert(field, value);
        } else {
            self.options
                .filter_columns
                .get_or_insert_with(IndexMap::new)
                .insert(field, value);
        }
        self
    }

    /// Options accumulated so far.
    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Transport parameters this query would send with caller `options`.
    pub fn request_options(&self, options: IndexOptions) -> RequestOptions {
        self.resource.request_options(self.options.clone(), options)
    }

    pub async fn index(self, options: IndexOptions) -> Result<ApiResponse> {
        let Query { resource, options: chained } = self;
        let request = resource.request_options(chained, options);
        resource.endpoint.get(&resource.path, &request).await
    }

    pub async fn all(self, options: IndexOptions) -> Result<Vec<Value>> {
        let options = IndexOptions {
            paginate: Some(false),
            ..options
        };
        let response = self.index(options).await?;
        Ok(response.results().to_vec())
    }
}
