//! Error types for the platform client.
//!
//! # Design
//! Every public operation returns `Result<T, ApiError>`. `ApiError` pairs an
//! `ErrorKind` with a human-readable message; the kind's display form is what
//! lands in an envelope's `error.kind`, so an HTTP 500 reads `"500"`.

use std::fmt;

/// Classification of a failed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The platform answered with a status other than 200.
    HttpStatus(u16),

    /// Connect or read timeout.
    Timeout,

    /// Host unreachable or connection refused.
    Connection,

    /// Any other transport or decode failure. The string names the failure's
    /// type and is meant for diagnostics, not matching.
    Unexpected(String),

    /// A directory site id was supplied where a record table was expected.
    InvalidSiteId,

    /// The site reported a reference type that is neither a table nor a directory.
    InvalidReferenceType,

    /// The id is empty, ambiguous, or resolves to the wrong kind of entity.
    InvalidId,

    /// A paginated fetch stopped before every record was retrieved.
    IncompleteOperation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::HttpStatus(status) => write!(f, "{status}"),
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::Connection => write!(f, "Connection"),
            ErrorKind::Unexpected(type_name) => write!(f, "{type_name}"),
            ErrorKind::InvalidSiteId => write!(f, "InvalidSiteId"),
            ErrorKind::InvalidReferenceType => write!(f, "Unexpected"),
            ErrorKind::InvalidId => write!(f, "InvalidId"),
            ErrorKind::IncompleteOperation => write!(f, "IncompleteOperation"),
        }
    }
}

/// A failed operation: what kind of failure, and a message for humans.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn http_status(status: u16) -> Self {
        Self::new(ErrorKind::HttpStatus(status), "HTTP Request Error")
    }

    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout, "Timeout Error")
    }

    pub fn connection() -> Self {
        Self::new(ErrorKind::Connection, "Connection Error")
    }

    pub fn unexpected(type_name: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected(type_name.into()), "Unexpected Error")
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidId, message)
    }
}

/// Errors raised while loading or saving connection settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed connection info: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing or empty field: {0}")]
    MissingField(&'static str),
}
