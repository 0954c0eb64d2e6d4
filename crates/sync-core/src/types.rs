//! Airtable field types and their creation options.
//!
//! This module defines `AirtableFieldType`, the fixed destination type taxonomy,
//! and `FieldSpec`, the `{type, options}` pair sent to Airtable's create-field
//! endpoint.

use serde::{Deserialize, Serialize};

/// Destination field type.
///
/// The set is closed: every field the mirror creates uses one of these types.
/// Serializes to the camelCase names used by the Airtable metadata API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AirtableFieldType {
    /// Single line of text
    SingleLineText,
    /// Long text
    MultilineText,
    /// Email address
    Email,
    /// Phone number
    PhoneNumber,
    /// URL
    Url,
    /// One value from a closed choice list
    SingleSelect,
    /// Several values from a closed choice list
    MultipleSelects,
    /// Decimal or integer number
    Number,
    /// Currency amount
    Currency,
    /// Date only
    Date,
    /// Date and time
    DateTime,
}

impl AirtableFieldType {
    /// Name of the type as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleLineText => "singleLineText",
            Self::MultilineText => "multilineText",
            Self::Email => "email",
            Self::PhoneNumber => "phoneNumber",
            Self::Url => "url",
            Self::SingleSelect => "singleSelect",
            Self::MultipleSelects => "multipleSelects",
            Self::Number => "number",
            Self::Currency => "currency",
            Self::Date => "date",
            Self::DateTime => "dateTime",
        }
    }

    /// Check if this type stores numeric values.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number | Self::Currency)
    }

    /// Check if this type is backed by a closed choice list.
    pub fn is_select(&self) -> bool {
        matches!(self, Self::SingleSelect | Self::MultipleSelects)
    }
}

impl std::fmt::Display for AirtableFieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single select choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
}

impl Choice {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Date format option (`{"name": "iso", "format": "YYYY-MM-DD"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFormat {
    pub name: String,
    pub format: String,
}

impl DateFormat {
    pub fn iso() -> Self {
        Self {
            name: "iso".to_string(),
            format: "YYYY-MM-DD".to_string(),
        }
    }
}

/// Time format option (`{"name": "24hour", "format": "HH:mm"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFormat {
    pub name: String,
    pub format: String,
}

impl TimeFormat {
    pub fn twenty_four_hour() -> Self {
        Self {
            name: "24hour".to_string(),
            format: "HH:mm".to_string(),
        }
    }
}

/// Type-specific options attached to a field on creation.
///
/// Serialized untagged: each variant produces exactly the `options` object
/// Airtable expects for the matching field type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldOptions {
    /// `singleSelect` / `multipleSelects`
    Choices { choices: Vec<Choice> },

    /// `currency`
    Currency { precision: u8, symbol: String },

    /// `number`
    Number { precision: u8 },

    /// `date`
    Date {
        #[serde(rename = "dateFormat")]
        date_format: DateFormat,
    },

    /// `dateTime`
    DateTime {
        #[serde(rename = "dateFormat")]
        date_format: DateFormat,
        #[serde(rename = "timeFormat")]
        time_format: TimeFormat,
        #[serde(rename = "timeZone")]
        time_zone: String,
    },
}

/// Destination field specification: a type tag plus its options.
///
/// Produced by the type mapper, consumed by field creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: AirtableFieldType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<FieldOptions>,
}

impl FieldSpec {
    /// A spec without options.
    pub fn plain(field_type: AirtableFieldType) -> Self {
        Self {
            field_type,
            options: None,
        }
    }

    /// The fallback spec used for unknown source types and undeclared fields.
    pub fn single_line_text() -> Self {
        Self::plain(AirtableFieldType::SingleLineText)
    }

    /// A `number` spec with the given precision.
    pub fn number(precision: u8) -> Self {
        Self {
            field_type: AirtableFieldType::Number,
            options: Some(FieldOptions::Number { precision }),
        }
    }

    /// A `currency` spec.
    pub fn currency(precision: u8, symbol: impl Into<String>) -> Self {
        Self {
            field_type: AirtableFieldType::Currency,
            options: Some(FieldOptions::Currency {
                precision,
                symbol: symbol.into(),
            }),
        }
    }

    /// An ISO `date` spec.
    pub fn date() -> Self {
        Self {
            field_type: AirtableFieldType::Date,
            options: Some(FieldOptions::Date {
                date_format: DateFormat::iso(),
            }),
        }
    }

    /// An ISO, 24-hour, UTC `dateTime` spec.
    pub fn date_time() -> Self {
        Self {
            field_type: AirtableFieldType::DateTime,
            options: Some(FieldOptions::DateTime {
                date_format: DateFormat::iso(),
                time_format: TimeFormat::twenty_four_hour(),
                time_zone: "utc".to_string(),
            }),
        }
    }

    /// A select spec (`singleSelect` or `multipleSelects`) with the given choices.
    pub fn select(field_type: AirtableFieldType, choices: Vec<Choice>) -> Self {
        Self {
            field_type,
            options: Some(FieldOptions::Choices { choices }),
        }
    }

    /// Choices carried by a select spec, empty for every other type.
    pub fn choices(&self) -> &[Choice] {
        match &self.options {
            Some(FieldOptions::Choices { choices }) => choices,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_type_names_match_wire_format() {
        let cases = [
            (AirtableFieldType::SingleLineText, "singleLineText"),
            (AirtableFieldType::MultilineText, "multilineText"),
            (AirtableFieldType::PhoneNumber, "phoneNumber"),
            (AirtableFieldType::MultipleSelects, "multipleSelects"),
            (AirtableFieldType::DateTime, "dateTime"),
            (AirtableFieldType::Url, "url"),
        ];
        for (ty, name) in cases {
            assert_eq!(serde_json::to_value(ty).unwrap(), json!(name));
            assert_eq!(ty.to_string(), name);
        }
    }

    #[test]
    fn test_type_categories() {
        assert!(AirtableFieldType::Number.is_numeric());
        assert!(AirtableFieldType::Currency.is_numeric());
        assert!(!AirtableFieldType::SingleLineText.is_numeric());

        assert!(AirtableFieldType::SingleSelect.is_select());
        assert!(AirtableFieldType::MultipleSelects.is_select());
        assert!(!AirtableFieldType::Date.is_select());
    }

    #[test]
    fn test_plain_spec_omits_options() {
        let spec = FieldSpec::single_line_text();
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"type": "singleLineText"})
        );
    }

    #[test]
    fn test_currency_spec_body() {
        assert_eq!(
            serde_json::to_value(FieldSpec::currency(2, "$")).unwrap(),
            json!({"type": "currency", "options": {"precision": 2, "symbol": "$"}})
        );
    }

    #[test]
    fn test_date_time_spec_body() {
        assert_eq!(
            serde_json::to_value(FieldSpec::date_time()).unwrap(),
            json!({
                "type": "dateTime",
                "options": {
                    "dateFormat": {"name": "iso", "format": "YYYY-MM-DD"},
                    "timeFormat": {"name": "24hour", "format": "HH:mm"},
                    "timeZone": "utc"
                }
            })
        );
    }

    #[test]
    fn test_select_spec_body_and_choices() {
        let spec = FieldSpec::select(
            AirtableFieldType::SingleSelect,
            vec![Choice::new("Hot"), Choice::new("Cold")],
        );
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"type": "singleSelect", "options": {"choices": [{"name": "Hot"}, {"name": "Cold"}]}})
        );
        assert_eq!(spec.choices().len(), 2);
        assert!(FieldSpec::date().choices().is_empty());
    }
}
