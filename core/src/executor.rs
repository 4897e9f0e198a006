//! The request executor: one POST, one classified envelope.
//!
//! # Design
//! `Executor::send` serializes the payload, hands a plain `HttpRequest` to the
//! transport and runs the outcome through `classify`. Classification is a pure
//! function of the transport result, so every branch is testable without a
//! socket. There are no retries; callers decide whether to re-invoke.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::{Envelope, Page};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

#[derive(Debug, Clone)]
pub struct Executor<T> {
    transport: T,
}

impl<T: Transport> Executor<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// POST `payload` as JSON to `url` and classify the outcome.
    pub fn send<P: Serialize + ?Sized>(&self, url: &str, payload: &P) -> Envelope {
        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(_) => return Envelope::failure(ApiError::unexpected("serde_json::Error")),
        };

        debug!(url, "sending request");
        let envelope = classify(self.transport.execute(&HttpRequest::json_post(url, body)));

        if let Some(err) = &envelope.error {
            warn!(url, kind = %err.kind, message = %err.message, "request failed");
        }
        envelope
    }
}

/// Map a transport outcome onto the uniform envelope.
///
/// Only status 200 counts as success. On success the `Data`, `Offset`,
/// `PageSize` and `TotalCount` members of the body's `Response` object are
/// surfaced when present.
pub fn classify(outcome: Result<HttpResponse, TransportError>) -> Envelope {
    let response = match outcome {
        Ok(response) => response,
        Err(TransportError::Timeout(_)) => return Envelope::failure(ApiError::timeout()),
        Err(TransportError::Connection(_)) => return Envelope::failure(ApiError::connection()),
        Err(TransportError::Other { type_name, .. }) => {
            return Envelope::failure(ApiError::unexpected(type_name))
        }
    };

    if response.status != 200 {
        return Envelope::failure(ApiError::http_status(response.status));
    }

    let body: Value = match serde_json::from_str(&response.body) {
        Ok(body) => body,
        Err(_) => return Envelope::failure(ApiError::unexpected("serde_json::Error")),
    };

    let page = match body.get("Response").and_then(Value::as_object) {
        Some(inner) => Page {
            data: inner.get("Data").cloned(),
            offset: inner.get("Offset").and_then(Value::as_u64),
            page_size: inner.get("PageSize").and_then(Value::as_u64),
            total_count: inner.get("TotalCount").and_then(Value::as_u64),
        },
        None => Page::default(),
    };
    Envelope::success(page)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    fn ok(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        })
    }

    #[test]
    fn non_200_is_http_request_error() {
        let env = classify(ok(500, "internal error"));
        assert!(!env.success);
        let err = env.error.unwrap();
        assert_eq!(err.kind, ErrorKind::HttpStatus(500));
        assert_eq!(err.kind.to_string(), "500");
        assert_eq!(err.message, "HTTP Request Error");
    }

    #[test]
    fn created_status_is_not_success() {
        let env = classify(ok(201, r#"{"Response":{}}"#));
        assert_eq!(env.error.unwrap().kind, ErrorKind::HttpStatus(201));
    }

    #[test]
    fn transport_failures_are_classified() {
        let env = classify(Err(TransportError::Timeout("connect".into())));
        assert_eq!(env.error.unwrap().message, "Timeout Error");

        let env = classify(Err(TransportError::Connection("refused".into())));
        assert_eq!(env.error.unwrap().message, "Connection Error");

        let env = classify(Err(TransportError::Other {
            type_name: "ureq::Error::Tls".into(),
            message: "handshake".into(),
        }));
        let err = env.error.unwrap();
        assert_eq!(err.message, "Unexpected Error");
        assert_eq!(err.kind.to_string(), "ureq::Error::Tls");
    }

    #[test]
    fn pagination_fields_are_surfaced() {
        let env = classify(ok(
            200,
            r#"{"StatusCode":200,"Response":{"Offset":0,"PageSize":200,"TotalCount":1,"Data":[{"ResultId":1}]}}"#,
        ));
        assert!(env.success);
        assert_eq!(env.data, Some(json!([{"ResultId": 1}])));
        assert_eq!(env.offset, Some(0));
        assert_eq!(env.page_size, Some(200));
        assert_eq!(env.total_count, Some(1));
    }

    #[test]
    fn missing_response_object_is_bare_success() {
        let env = classify(ok(200, r#"{"Id":12,"StatusCode":200,"Message":"created"}"#));
        assert!(env.success);
        assert!(env.data.is_none());
        assert!(env.error.is_none());
    }

    #[test]
    fn unparseable_body_is_unexpected() {
        let env = classify(ok(200, "<html>"));
        assert!(!env.success);
        assert_eq!(
            env.error.unwrap().kind,
            ErrorKind::Unexpected("serde_json::Error".into())
        );
    }

    struct Recorder {
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl Transport for Recorder {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.borrow_mut().push(request.clone());
            ok(200, r#"{"Response":{"Data":[]}}"#)
        }
    }

    #[test]
    fn send_posts_serialized_payload() {
        let recorder = Recorder {
            seen: RefCell::new(Vec::new()),
        };
        let executor = Executor::new(&recorder);
        let env = executor.send("http://host/api/items/1/get", &json!({"ApiVersion": 1.1}));
        assert!(env.success);

        let seen = recorder.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, "http://host/api/items/1/get");
        let body: Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body, json!({"ApiVersion": 1.1}));
    }
}
