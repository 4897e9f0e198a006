//! Synchronous client for the Pleasanter low-code platform's HTTP API.
//!
//! # Overview
//! Fetches site and column metadata, reads single records or whole tables
//! page by page, and creates or updates records. Every call is a JSON POST to
//! `{base}/api/items/{id}/{action}`.
//!
//! # Design
//! - `Executor` sends one request and classifies the outcome into an
//!   `Envelope`; it never retries.
//! - `PleasanterClient` is the operation layer. It owns only immutable
//!   configuration and builds a fresh payload per call.
//! - I/O goes through the `Transport` trait (`UreqTransport` by default), so
//!   tests can script responses and count requests.
//! - Operations return `Result<T, ApiError>`; `Envelope::from` turns any of
//!   them into the uniform `{success, data?, error?}` shape.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod http;
pub mod payload;
pub mod site;
pub mod transport;

pub use client::{PleasanterClient, Record, RecordQuery, RecordsPage};
pub use config::{Connection, ConnectionInfo};
pub use envelope::{Envelope, Page};
pub use error::{ApiError, ConfigError, ErrorKind};
pub use executor::Executor;
pub use http::{HttpRequest, HttpResponse, Transport, TransportError};
pub use payload::{build_search_type_map, PayloadTemplate, SearchType, View};
pub use site::{ReferenceType, SiteInfo, SYSTEM_COLUMNS};
pub use transport::{Timeouts, UreqTransport};
