//! Error types for the endpoint layer.
//!
//! # Design
//! Mount-time configuration problems (`NotMounted`, `AlreadyMounted`,
//! `NameTaken`, `ReservedName`) are reported synchronously by the registry.
//! Everything that happens on the wire is reported as the transport saw it:
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from any other non-2xx status, which lands in
//! `HttpError` with the raw status code and body.

use thiserror::Error;

/// Result type for endpoint operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the client, its endpoints and its transport.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The endpoint has no owning client, or the client has been dropped.
    #[error("endpoint {0} is not mounted on a client")]
    NotMounted(String),

    /// The endpoint instance already belongs to a client.
    #[error("endpoint {0} is already mounted")]
    AlreadyMounted(String),

    /// Another endpoint is registered under the same name.
    #[error("mount point {0} is already taken")]
    NameTaken(String),

    /// The name would shadow one of the client's own members.
    #[error("can not assign endpoints to internal property {0}")]
    ReservedName(String),

    /// Client configuration is incomplete or malformed.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A base URL or request path could not be resolved.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The result mapper could not interpret the response.
    #[error("result mapping failed: {0}")]
    Mapping(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// An interceptor rejected the request or response.
    #[error("interceptor error: {0}")]
    Interceptor(String),
}

impl ApiError {
    /// HTTP status carried by this error, if it came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors raised while mounting an endpoint.
    pub fn is_mount_error(&self) -> bool {
        matches!(
            self,
            ApiError::AlreadyMounted(_) | ApiError::NameTaken(_) | ApiError::ReservedName(_)
        )
    }
}
