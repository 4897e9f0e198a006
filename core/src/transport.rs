//! Blocking `ureq` backend for [`Transport`].

use std::time::Duration;

use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

/// Connect and read timeouts applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(3),
            read: Duration::from_secs(10),
        }
    }
}

/// Largest response body `UreqTransport` will read, in bytes.
pub const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// A [`Transport`] backed by a `ureq::Agent`.
///
/// Status codes are returned as data (`http_status_as_error(false)`) so the
/// executor decides what a non-200 means. Bodies are read up to
/// [`MAX_BODY_BYTES`]; a larger one fails as `ureq::Error::BodyExceedsLimit`.
///
/// Only a connect (or name resolution) timeout is reported as
/// [`TransportError::Timeout`]. A server that accepts the connection and then
/// stalls hits the read timeout, which surfaces as [`TransportError::Other`].
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeouts: Timeouts) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_connect(Some(timeouts.connect))
            .timeout_recv_response(Some(timeouts.read))
            .timeout_recv_body(Some(timeouts.read))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Timeouts::default())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder.send(request.body.as_bytes()).map_err(map_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .map_err(map_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(which @ (ureq::Timeout::Connect | ureq::Timeout::Resolve)) => {
            TransportError::Timeout(which.to_string())
        }
        ureq::Error::HostNotFound => TransportError::Connection("host not found".to_string()),
        ureq::Error::ConnectionFailed => TransportError::Connection("connection refused".to_string()),
        ureq::Error::Io(e) => TransportError::Connection(e.to_string()),
        other => TransportError::Other {
            type_name: error_type_name(&other),
            message: other.to_string(),
        },
    }
}

/// `ureq::Error::Variant` taken from the variant's Debug form.
fn error_type_name(err: &ureq::Error) -> String {
    let debug = format!("{err:?}");
    let variant = debug
        .split(|c: char| c == '(' || c == ' ' || c == '{')
        .next()
        .unwrap_or("Unknown");
    format!("ureq::Error::{variant}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_are_three_and_ten_seconds() {
        let t = Timeouts::default();
        assert_eq!(t.connect, Duration::from_secs(3));
        assert_eq!(t.read, Duration::from_secs(10));
    }

    #[test]
    fn host_not_found_is_connection_error() {
        let err = map_error(ureq::Error::HostNotFound);
        assert!(matches!(err, TransportError::Connection(_)));
    }

    #[test]
    fn unclassified_error_keeps_variant_name() {
        let err = map_error(ureq::Error::BadUri("::".to_string()));
        match err {
            TransportError::Other { type_name, .. } => {
                assert_eq!(type_name, "ureq::Error::BadUri");
            }
            other => panic!("expected Other, got {other:?}"),
        }
    }

    #[test]
    fn only_connect_timeouts_are_timeouts() {
        let err = map_error(ureq::Error::Timeout(ureq::Timeout::Connect));
        assert!(matches!(err, TransportError::Timeout(_)), "got {err:?}");

        for which in [ureq::Timeout::RecvResponse, ureq::Timeout::RecvBody] {
            match map_error(ureq::Error::Timeout(which)) {
                TransportError::Other { type_name, .. } => {
                    assert_eq!(type_name, "ureq::Error::Timeout");
                }
                other => panic!("expected Other for {which:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn oversized_body_keeps_variant_name() {
        match map_error(ureq::Error::BodyExceedsLimit(MAX_BODY_BYTES)) {
            TransportError::Other { type_name, .. } => {
                assert_eq!(type_name, "ureq::Error::BodyExceedsLimit");
            }
            other => panic!("expected Other, got {other:?}"),
        }
    }

    #[test]
    fn refused_connection_is_classified() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = UreqTransport::default();
        let req = HttpRequest::json_post(format!("http://127.0.0.1:{port}/api/items/1/get"), "{}".into());
        let err = transport.execute(&req).unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)), "got {err:?}");
    }
}
