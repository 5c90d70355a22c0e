//! Normalized response envelope.
//!
//! # Design
//! Backends disagree on the shape of list responses: some return a bare
//! array, some wrap it in `{ results, count, total }`, some report the total
//! in a header. A `ResultMapper` turns the raw `HttpResponse` into
//! `MappedResults`, and `ApiResponse` exposes uniform accessors on top of it
//! so callers never branch on the backend's shape.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::http::HttpResponse;

/// Converts a raw response into the fields the envelope understands.
pub type ResultMapper = fn(&HttpResponse) -> Result<MappedResults>;

/// Output of a `ResultMapper`.
///
/// `results` may be an array or a single value. `count` and `total` are
/// optional; zero is treated the same as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedResults {
    pub results: Value,
    pub count: Option<u64>,
    pub total: Option<u64>,
}

impl MappedResults {
    pub fn new(results: Value) -> Self {
        Self {
            results,
            count: None,
            total: None,
        }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }
}

/// Treat the response payload itself as the mapped object, reading its
/// `results`, `count` and `total` fields.
pub fn payload_mapper(response: &HttpResponse) -> Result<MappedResults> {
    let payload = response.json()?;
    Ok(MappedResults {
        results: payload.get("results").cloned().unwrap_or(Value::Null),
        count: payload.get("count").and_then(Value::as_u64),
        total: payload.get("total").and_then(Value::as_u64),
    })
}

/// A transport response presented as a uniform value object.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    data: MappedResults,
    response: HttpResponse,
    from_cache: bool,
}

impl ApiResponse {
    /// Wrap `response`, running `map` over it. Mapper failures propagate.
    pub fn new(response: HttpResponse, map: ResultMapper) -> Result<Self> {
        let data = map(&response)?;
        Ok(Self {
            data,
            response,
            from_cache: false,
        })
    }

    /// Wrap `response` using [`payload_mapper`].
    pub fn from_payload(response: HttpResponse) -> Result<Self> {
        Self::new(response, payload_mapper)
    }

    pub fn data(&self) -> &MappedResults {
        &self.data
    }

    /// Always a sequence: a single mapped value becomes a one-element slice.
    pub fn results(&self) -> &[Value] {
        match &self.data.results {
            Value::Array(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    /// Explicit mapped count if non-zero, else the number of results.
    pub fn count(&self) -> u64 {
        match self.data.count {
            Some(count) if count != 0 => count,
            _ => self.results().len() as u64,
        }
    }

    /// Explicit mapped total if non-zero, else `-1` for "unknown".
    pub fn total(&self) -> i64 {
        match self.data.total {
            Some(total) if total != 0 => i64::try_from(total).unwrap_or(i64::MAX),
            _ => -1,
        }
    }

    pub fn first(&self) -> Option<&Value> {
        self.results().first()
    }

    /// The result at index `total - 1`.
    ///
    /// Only meaningful when `total` equals the number of results in this
    /// response. With an unknown total, or a total larger than the page, this
    /// is `None`.
    pub fn last(&self) -> Option<&Value> {
        let total = self.total();
        if total < 1 {
            return None;
        }
        self.results().get((total - 1) as usize)
    }

    pub fn status_code(&self) -> u16 {
        self.response.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.response.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.response.header(name)
    }

    /// URL reported by the transport for this response.
    pub fn url(&self) -> &str {
        &self.response.url
    }

    /// Raw response text.
    pub fn body(&self) -> &str {
        &self.response.body
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    pub(crate) fn mark_cached(&mut self) {
        self.from_cache = true;
    }

    /// Deserialize every result into `T`.
    pub fn results_as<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.results()
            .iter()
            .map(|item| {
                T::deserialize(item).map_err(|e| ApiError::DeserializationError(e.to_string()))
            })
            .collect()
    }

    /// Deserialize the first result into `T`.
    pub fn first_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.first()
            .map(|item| {
                T::deserialize(item).map_err(|e| ApiError::DeserializationError(e.to_string()))
            })
            .transpose()
    }
}
