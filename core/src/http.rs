//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain owned data. Payload builders produce an
//! `HttpRequest` and the executor classifies an `HttpResponse` without either
//! side knowing which HTTP library moved the bytes. The `Transport` trait is
//! the single seam where I/O happens, so tests can swap in a recording fake.

/// Header sent with every platform request.
pub const CONTENT_TYPE: (&str, &str) = ("Content-Type", "application/json; charset=UTF-8");

/// A POST request to the platform described as plain data.
///
/// The platform API only accepts POST, so no method field is carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    /// JSON POST to `url` with the fixed content-type header.
    pub fn json_post(url: impl Into<String>, body: String) -> Self {
        Self {
            url: url.into(),
            headers: vec![(CONTENT_TYPE.0.to_string(), CONTENT_TYPE.1.to_string())],
            body,
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Transport-level failures, before any HTTP status is known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection or response did not arrive within the configured timeout.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The host could not be resolved or refused the connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Any other failure. `type_name` is for diagnostics only.
    #[error("{type_name}: {message}")]
    Other { type_name: String, message: String },
}

/// Executes a single HTTP round-trip. One attempt, no retries.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}
