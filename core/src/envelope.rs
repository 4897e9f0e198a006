//! The uniform result envelope.
//!
//! # Design
//! The executor reports every request as an `Envelope`: a success flag plus
//! either the pagination-aware payload or a `{kind, message}` error. The
//! operation layer works with `Result` internally (`into_result`) and any
//! typed operation result can be folded back into the uniform shape with
//! `Envelope::from`.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::ApiError;

/// The successful part of an envelope. Each field is present only when the
/// platform's `Response` object carried it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub data: Option<Value>,
    pub offset: Option<u64>,
    pub page_size: Option<u64>,
    pub total_count: Option<u64>,
}

/// `{success, data?, offset?, pageSize?, totalCount?, error?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl Envelope {
    pub fn success(page: Page) -> Self {
        Self {
            success: true,
            data: page.data,
            offset: page.offset,
            page_size: page.page_size,
            total_count: page.total_count,
            error: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            offset: None,
            page_size: None,
            total_count: None,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<Page, ApiError> {
        if self.success {
            return Ok(Page {
                data: self.data,
                offset: self.offset,
                page_size: self.page_size,
                total_count: self.total_count,
            });
        }
        Err(self
            .error
            .unwrap_or_else(|| ApiError::unexpected("MissingErrorBody")))
    }
}

impl<T: Serialize> From<Result<T, ApiError>> for Envelope {
    fn from(result: Result<T, ApiError>) -> Self {
        match result.map(serde_json::to_value) {
            Ok(Ok(Value::Null)) => Envelope::success(Page::default()),
            Ok(Ok(data)) => Envelope::success(Page {
                data: Some(data),
                ..Page::default()
            }),
            Ok(Err(_)) => Envelope::failure(ApiError::unexpected("serde_json::Error")),
            Err(err) => Envelope::failure(err),
        }
    }
}

impl Serialize for ApiError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ApiError", 2)?;
        state.serialize_field("kind", &self.kind.to_string())?;
        state.serialize_field("message", &self.message)?;
        state.end()
    }
}
