//! Site metadata returned by `items/{id}/getsite`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ErrorKind};

/// Built-in columns every record table carries.
pub const SYSTEM_COLUMNS: [&str; 4] = ["CreatedTime", "UpdatedTime", "Creator", "Updator"];

/// What kind of container a site id resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ReferenceType {
    Results,
    Issues,
    /// A directory grouping other sites.
    Sites,
    Other(String),
}

impl From<String> for ReferenceType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Results" => ReferenceType::Results,
            "Issues" => ReferenceType::Issues,
            "Sites" => ReferenceType::Sites,
            _ => ReferenceType::Other(s),
        }
    }
}

impl ReferenceType {
    /// Accept only record-bearing tables.
    pub fn ensure_record_table(&self) -> Result<(), ApiError> {
        match self {
            ReferenceType::Results | ReferenceType::Issues => Ok(()),
            ReferenceType::Sites => Err(ApiError::new(
                ErrorKind::InvalidSiteId,
                "directory site id supplied, not a record table",
            )),
            ReferenceType::Other(other) => Err(ApiError::new(
                ErrorKind::InvalidReferenceType,
                format!("successful response but unexpected ReferenceType {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteInfo {
    pub reference_type: ReferenceType,
    #[serde(default)]
    pub site_settings: Option<SiteSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteSettings {
    #[serde(default)]
    pub columns: Option<Vec<ColumnSetting>>,
    #[serde(default)]
    pub editor_column_hash: Option<EditorColumnHash>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnSetting {
    pub column_name: String,
    #[serde(default)]
    pub label_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EditorColumnHash {
    #[serde(default)]
    pub general: Option<Vec<String>>,
}

impl SiteInfo {
    /// Decode the `Data` member of a `getsite` response, accepting only
    /// record tables. `ReferenceType` is checked before anything else is
    /// decoded.
    pub fn parse_record_table(data: Option<Value>) -> Result<Self, ApiError> {
        let data = data.ok_or_else(|| {
            ApiError::new(
                ErrorKind::Unexpected("MissingData".into()),
                "site response carried no Data",
            )
        })?;
        let reference_type = data
            .get("ReferenceType")
            .and_then(Value::as_str)
            .map(|s| ReferenceType::from(s.to_string()))
            .ok_or_else(|| {
                ApiError::new(
                    ErrorKind::Unexpected("MissingReferenceType".into()),
                    "site response carried no ReferenceType",
                )
            })?;
        reference_type.ensure_record_table()?;

        serde_json::from_value(data).map_err(|e| {
            ApiError::new(
                ErrorKind::Unexpected("serde_json::Error".into()),
                format!("malformed site response: {e}"),
            )
        })
    }

    /// Internal column name to display label, seeded with the system columns.
    pub fn column_mapping(&self) -> BTreeMap<String, String> {
        let mut mapping: BTreeMap<String, String> = SYSTEM_COLUMNS
            .iter()
            .map(|c| (c.to_string(), c.to_string()))
            .collect();

        let columns = self
            .site_settings
            .as_ref()
            .and_then(|s| s.columns.as_deref())
            .unwrap_or_default();
        for column in columns {
            let label = column.label_text.clone().unwrap_or_else(|| column.column_name.clone());
            mapping.insert(column.column_name.clone(), label);
        }
        mapping
    }

    /// The "General" editor tab columns followed by the system columns.
    /// Duplicates are kept.
    pub fn editable_columns(&self) -> Vec<String> {
        let mut columns = self
            .site_settings
            .as_ref()
            .and_then(|s| s.editor_column_hash.as_ref())
            .and_then(|h| h.general.clone())
            .unwrap_or_default();
        columns.extend(SYSTEM_COLUMNS.iter().map(|c| c.to_string()));
        columns
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn site(reference_type: &str) -> SiteInfo {
        SiteInfo::parse_record_table(Some(json!({
            "ReferenceType": reference_type,
            "SiteSettings": {
                "Columns": [
                    {"ColumnName": "ClassA", "LabelText": "Department"},
                    {"ColumnName": "Creator", "LabelText": "Author"},
                    {"ColumnName": "NumA"}
                ],
                "EditorColumnHash": {"General": ["Title", "ClassA", "Creator"]}
            }
        })))
        .unwrap()
    }

    #[test]
    fn reference_types_are_classified() {
        assert_eq!(site("Results").reference_type, ReferenceType::Results);
        assert_eq!(site("Issues").reference_type, ReferenceType::Issues);

        let err = ReferenceType::from("Sites".to_string())
            .ensure_record_table()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSiteId);

        let err = ReferenceType::from("Wikis".to_string())
            .ensure_record_table()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidReferenceType);
        assert_eq!(err.kind.to_string(), "Unexpected");
    }

    #[test]
    fn directory_site_rejected_whatever_the_settings() {
        let err = SiteInfo::parse_record_table(Some(json!({
            "ReferenceType": "Sites",
            "SiteSettings": {"Columns": "not a list"}
        })))
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSiteId);
    }

    #[test]
    fn mapping_is_seeded_then_overridden() {
        let mapping = site("Results").column_mapping();
        assert_eq!(mapping["CreatedTime"], "CreatedTime");
        assert_eq!(mapping["Updator"], "Updator");
        assert_eq!(mapping["Creator"], "Author");
        assert_eq!(mapping["ClassA"], "Department");
        assert_eq!(mapping["NumA"], "NumA");
        assert_eq!(mapping.len(), 6);
    }

    #[test]
    fn editable_columns_append_system_columns_without_dedup() {
        let columns = site("Results").editable_columns();
        assert_eq!(
            columns,
            vec![
                "Title",
                "ClassA",
                "Creator",
                "CreatedTime",
                "UpdatedTime",
                "Creator",
                "Updator"
            ]
        );
    }

    #[test]
    fn missing_settings_yield_system_columns_only() {
        let info =
            SiteInfo::parse_record_table(Some(json!({"ReferenceType": "Issues", "SiteSettings": null})))
                .unwrap();
        assert_eq!(info.column_mapping().len(), 4);
        assert_eq!(info.editable_columns(), SYSTEM_COLUMNS.to_vec());
    }

    #[test]
    fn missing_reference_type_is_unexpected() {
        let err = SiteInfo::parse_record_table(Some(json!({"SiteSettings": {}}))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unexpected("MissingReferenceType".into()));
        let err = SiteInfo::parse_record_table(Some(json!({
            "ReferenceType": "Results",
            "SiteSettings": {"Columns": 5}
        })))
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unexpected("serde_json::Error".into()));
        let err = SiteInfo::parse_record_table(None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unexpected("MissingData".into()));
    }
}
