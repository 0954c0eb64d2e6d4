//! Source-side schema definitions.
//!
//! `FieldDescriptor` mirrors one entry of Zoho's `/settings/fields` response.
//! Only the attributes the mirror needs are kept; everything else Zoho sends
//! is ignored during deserialization.

use crate::types::FieldSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A Zoho record exactly as fetched, keyed by API name in source order.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Cleaned field name to destination field spec, in source schema order.
pub type TypeMap = IndexMap<String, FieldSpec>;

fn default_data_type() -> String {
    "text".to_string()
}

/// Metadata for a single Zoho field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// API name, possibly carrying the reserved `$` system prefix
    #[serde(default)]
    pub api_name: String,

    /// Zoho data type (`text`, `picklist`, `currency`, ...)
    #[serde(default = "default_data_type")]
    pub data_type: String,

    /// Choice values for picklist fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_list_values: Option<Vec<PickListValue>>,

    /// Human readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_label: Option<String>,
}

impl FieldDescriptor {
    pub fn new(api_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
            data_type: data_type.into(),
            pick_list_values: None,
            field_label: None,
        }
    }

    pub fn with_pick_list(mut self, values: Vec<PickListValue>) -> Self {
        self.pick_list_values = Some(values);
        self
    }

    /// Pick-list values, empty when the field has none.
    pub fn pick_list(&self) -> &[PickListValue] {
        self.pick_list_values.as_deref().unwrap_or_default()
    }
}

/// One pick-list entry.
///
/// Zoho usually sends objects carrying `display_value` and `actual_value`, but
/// bare strings appear as well. Anything else is kept so that a single odd
/// entry never fails the whole field list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PickListValue {
    Plain(String),
    Entry {
        #[serde(default)]
        display_value: Option<String>,
        #[serde(default)]
        actual_value: Option<String>,
    },
    Other(serde_json::Value),
}

impl PickListValue {
    pub fn entry(display_value: Option<&str>, actual_value: Option<&str>) -> Self {
        Self::Entry {
            display_value: display_value.map(str::to_string),
            actual_value: actual_value.map(str::to_string),
        }
    }

    /// The choice label for this entry: the display value, else the actual
    /// value. Empty strings count as missing.
    pub fn label(&self) -> Option<&str> {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|s| !s.is_empty())
        }
        match self {
            Self::Plain(s) if !s.is_empty() => Some(s),
            Self::Plain(_) => None,
            Self::Entry {
                display_value,
                actual_value,
            } => non_empty(display_value).or_else(|| non_empty(actual_value)),
            Self::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_deserialize_zoho_field() {
        let field: FieldDescriptor = serde_json::from_value(json!({
            "api_name": "Lead_Status",
            "data_type": "picklist",
            "field_label": "Lead Status",
            "system_mandatory": false,
            "pick_list_values": [
                {"display_value": "Contacted", "actual_value": "Contacted", "id": "1"},
                "Junk Lead",
                {"display_value": null, "actual_value": "Lost"},
                {"display_value": 42}
            ]
        }))
        .unwrap();

        assert_eq!(field.api_name, "Lead_Status");
        assert_eq!(field.data_type, "picklist");
        let labels: Vec<_> = field.pick_list().iter().map(|v| v.label()).collect();
        assert_eq!(
            labels,
            vec![Some("Contacted"), Some("Junk Lead"), Some("Lost"), None]
        );
    }

    #[test]
    fn test_missing_attributes_use_defaults() {
        let field: FieldDescriptor = serde_json::from_value(json!({})).unwrap();
        assert_eq!(field.api_name, "");
        assert_eq!(field.data_type, "text");
        assert!(field.pick_list().is_empty());

        let field: FieldDescriptor =
            serde_json::from_value(json!({"api_name": "X", "pick_list_values": null})).unwrap();
        assert!(field.pick_list().is_empty());
    }

    #[test]
    fn test_label_prefers_display_value() {
        assert_eq!(
            PickListValue::entry(Some("Shown"), Some("stored")).label(),
            Some("Shown")
        );
        assert_eq!(PickListValue::entry(Some(""), Some("stored")).label(), Some("stored"));
        assert_eq!(PickListValue::entry(None, None).label(), None);
        assert_eq!(PickListValue::Plain(String::new()).label(), None);
    }

    #[test]
    fn test_raw_record_keeps_source_order() {
        let record: RawRecord =
            serde_json::from_str(r#"{"Zeta": 1, "$alpha": 2, "Mid": 3}"#).unwrap();
        let keys: Vec<_> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Zeta", "$alpha", "Mid"]);
    }
}
