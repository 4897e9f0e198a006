//! Request payloads for the platform API.
//!
//! # Design
//! `PayloadTemplate` is immutable; each call gets a fresh JSON object built
//! from it, so keys set for one operation (a `View`, an `Offset`, caller
//! fields) can never leak into the next one.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// API version sent with every request.
pub const API_VERSION: f64 = 1.1;

/// Shared `{ApiVersion, apiKey}` skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadTemplate {
    api_key: String,
}

impl PayloadTemplate {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// A fresh base payload.
    pub fn base(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("ApiVersion".to_string(), Value::from(API_VERSION));
        payload.insert("apiKey".to_string(), Value::from(self.api_key.clone()));
        payload
    }

    /// Base payload plus a `View` and, for paginated fetches, an `Offset`.
    pub fn with_view(&self, view: &View, offset: Option<u64>) -> Result<Map<String, Value>, ApiError> {
        let view = serde_json::to_value(view).map_err(|_| ApiError::unexpected("serde_json::Error"))?;
        let mut payload = self.base();
        payload.insert("View".to_string(), view);
        if let Some(offset) = offset {
            payload.insert("Offset".to_string(), Value::from(offset));
        }
        Ok(payload)
    }

    /// Base payload merged with caller-supplied record fields. `ApiVersion`
    /// and `apiKey` always come from the template.
    pub fn with_fields(&self, fields: &Map<String, Value>) -> Map<String, Value> {
        let mut payload = fields.clone();
        payload.extend(self.base());
        payload
    }
}

/// The `View` object of a `/get` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct View {
    pub api_data_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_filter_hash: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_filter_search_types: Option<BTreeMap<String, SearchType>>,
}

impl Default for View {
    /// Records keyed by display label rather than internal column name.
    fn default() -> Self {
        Self {
            api_data_type: "KeyValues",
            grid_columns: None,
            column_filter_hash: None,
            column_filter_search_types: None,
        }
    }
}

/// How a column filter value is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchType {
    ExactMatch,
    PartialMatch,
    ForwardMatch,
    ExactMatchMultiple,
    PartialMatchMultiple,
    ForwardMatchMultiple,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::ExactMatch => "ExactMatch",
            SearchType::PartialMatch => "PartialMatch",
            SearchType::ForwardMatch => "ForwardMatch",
            SearchType::ExactMatchMultiple => "ExactMatchMultiple",
            SearchType::PartialMatchMultiple => "PartialMatchMultiple",
            SearchType::ForwardMatchMultiple => "ForwardMatchMultiple",
        }
    }

    /// True for the variants that accept a list of values.
    pub fn is_multiple(&self) -> bool {
        matches!(
            self,
            SearchType::ExactMatchMultiple
                | SearchType::PartialMatchMultiple
                | SearchType::ForwardMatchMultiple
        )
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown search type: {0}")]
pub struct UnknownSearchType(pub String);

impl FromStr for SearchType {
    type Err = UnknownSearchType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ExactMatch" => Ok(SearchType::ExactMatch),
            "PartialMatch" => Ok(SearchType::PartialMatch),
            "ForwardMatch" => Ok(SearchType::ForwardMatch),
            "ExactMatchMultiple" => Ok(SearchType::ExactMatchMultiple),
            "PartialMatchMultiple" => Ok(SearchType::PartialMatchMultiple),
            "ForwardMatchMultiple" => Ok(SearchType::ForwardMatchMultiple),
            other => Err(UnknownSearchType(other.to_string())),
        }
    }
}

/// Map every column to the same search type, for `ColumnFilterSearchTypes`.
pub fn build_search_type_map<I, S>(columns: I, search_type: SearchType) -> BTreeMap<String, SearchType>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    columns
        .into_iter()
        .map(|column| (column.as_ref().to_string(), search_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn base_payload_has_version_and_key() {
        let payload = PayloadTemplate::new("secret").base();
        assert_eq!(Value::Object(payload), json!({"ApiVersion": 1.1, "apiKey": "secret"}));
    }

    #[test]
    fn view_does_not_leak_into_later_payloads() {
        let template = PayloadTemplate::new("k");
        let with_view = template.with_view(&View::default(), Some(200)).unwrap();
        assert!(with_view.contains_key("View"));
        assert_eq!(with_view["Offset"], json!(200));

        let fields = Map::from_iter([("Title".to_string(), json!("a"))]);
        let insert = template.with_fields(&fields);
        assert!(!insert.contains_key("View"));
        assert!(!insert.contains_key("Offset"));
    }

    #[test]
    fn fields_cannot_override_credentials() {
        let template = PayloadTemplate::new("real");
        let fields = Map::from_iter([
            ("apiKey".to_string(), json!("forged")),
            ("ApiVersion".to_string(), json!(9)),
            ("Title".to_string(), json!("t")),
        ]);
        let payload = template.with_fields(&fields);
        assert_eq!(payload["apiKey"], json!("real"));
        assert_eq!(payload["ApiVersion"], json!(1.1));
        assert_eq!(payload["Title"], json!("t"));
    }

    #[test]
    fn view_serializes_pascal_case_and_omits_absent() {
        let view = View {
            grid_columns: Some(vec!["Title".into()]),
            column_filter_search_types: Some(build_search_type_map(["Title"], SearchType::PartialMatch)),
            ..View::default()
        };
        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            json!({
                "ApiDataType": "KeyValues",
                "GridColumns": ["Title"],
                "ColumnFilterSearchTypes": {"Title": "PartialMatch"}
            })
        );
    }

    #[test]
    fn search_type_map_assigns_same_tag() {
        let map = build_search_type_map(["A", "B"], SearchType::ExactMatch);
        assert_eq!(
            serde_json::to_value(&map).unwrap(),
            json!({"A": "ExactMatch", "B": "ExactMatch"})
        );
        let reversed = build_search_type_map(["B", "A"], SearchType::ExactMatch);
        assert_eq!(map, reversed);
    }

    #[test]
    fn search_type_map_of_nothing_is_empty() {
        let map = build_search_type_map(Vec::<String>::new(), SearchType::ForwardMatch);
        assert!(map.is_empty());
    }

    #[test]
    fn search_type_parses_its_own_names() {
        for st in [
            SearchType::ExactMatch,
            SearchType::PartialMatch,
            SearchType::ForwardMatch,
            SearchType::ExactMatchMultiple,
            SearchType::PartialMatchMultiple,
            SearchType::ForwardMatchMultiple,
        ] {
            assert_eq!(st.as_str().parse::<SearchType>().unwrap(), st);
        }
        assert!("Fuzzy".parse::<SearchType>().is_err());
        assert!(SearchType::PartialMatchMultiple.is_multiple());
        assert!(!SearchType::ExactMatch.is_multiple());
    }
}
