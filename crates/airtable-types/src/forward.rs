//! Forward conversion: Zoho record → Airtable record.
//!
//! Conversion never fails. A value that cannot be expressed in the expected
//! Airtable type is dropped and reported as a [`FieldSkip`].

use crate::schema::clean_field_name;
use std::collections::HashSet;
use std::num::IntErrorKind;
use sync_core::{AirtableFieldType, ConvertedRecord, FieldValue, RawRecord, TypeMap, ValueShape};

/// Source field names to drop entirely for a module.
pub type FieldBlacklist = HashSet<String>;

/// Why a field was left out of a converted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A string value could not be parsed for a `number`/`currency` field
    NotNumeric {
        value: String,
        expected: AirtableFieldType,
    },
    /// The field name was nothing but the system prefix
    EmptyFieldName,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotNumeric { value, expected } => {
                write!(f, "value {value:?} is not a valid {expected}")
            }
            Self::EmptyFieldName => f.write_str("field name is empty after removing '$'"),
        }
    }
}

/// A field dropped during conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSkip {
    /// Source field name
    pub field: String,
    pub reason: SkipReason,
}

/// Convert one Zoho record into an Airtable record.
///
/// See [`convert_record_with_diagnostics`]; this variant discards the skip list.
pub fn convert_record(
    record: &RawRecord,
    type_map: &TypeMap,
    blacklist: &FieldBlacklist,
) -> ConvertedRecord {
    convert_record_with_diagnostics(record, type_map, blacklist).0
}

/// Convert one Zoho record into an Airtable record, reporting dropped fields.
///
/// Fields are visited in source order. Blacklisted and null fields are
/// dropped silently. The `$` prefix is stripped from every key; when two
/// source keys clean to the same name the later one wins. Fields missing
/// from `type_map` are treated as `singleLineText`.
pub fn convert_record_with_diagnostics(
    record: &RawRecord,
    type_map: &TypeMap,
    blacklist: &FieldBlacklist,
) -> (ConvertedRecord, Vec<FieldSkip>) {
    let mut converted = ConvertedRecord::new();
    let mut skipped = Vec::new();

    for (key, value) in record {
        if blacklist.contains(key) || value.is_null() {
            continue;
        }

        let clean_key = clean_field_name(key);
        if clean_key.is_empty() {
            skipped.push(FieldSkip {
                field: key.clone(),
                reason: SkipReason::EmptyFieldName,
            });
            continue;
        }

        let expected = type_map
            .get(clean_key)
            .map(|spec| spec.field_type)
            .unwrap_or(AirtableFieldType::SingleLineText);

        match convert_value(ValueShape::classify(value), expected) {
            Ok(Some(v)) => converted.insert(clean_key, v),
            Ok(None) => {}
            Err(reason) => {
                tracing::trace!("Skipping field {key}: {reason}");
                skipped.push(FieldSkip {
                    field: key.clone(),
                    reason,
                });
            }
        }
    }

    (converted, skipped)
}

/// Convert a single value. `Ok(None)` means "omit this field".
fn convert_value(
    shape: ValueShape<'_>,
    expected: AirtableFieldType,
) -> Result<Option<FieldValue>, SkipReason> {
    let value = match shape {
        ValueShape::Missing | ValueShape::EmptyList => return Ok(None),

        ValueShape::Bool(b) => FieldValue::text(yes_no(b)),

        ValueShape::Reference(obj) => FieldValue::Text(reference_text(obj)),

        ValueShape::ReferenceList(items) => FieldValue::Text(join(items.iter().map(|item| {
            match item.as_object() {
                Some(obj) => match obj.get("name") {
                    Some(name) if !name.is_null() => scalar_text(name),
                    _ => generic_text(item),
                },
                None => generic_text(item),
            }
        }))),

        ValueShape::ScalarList(items) => FieldValue::Text(join(items.iter().map(scalar_text))),

        ValueShape::Number(n) => match expected {
            AirtableFieldType::SingleLineText => FieldValue::Text(n.to_string()),
            _ => FieldValue::from_number(n),
        },

        ValueShape::Text(s) if expected.is_numeric() => parse_numeric(s, expected)?,

        ValueShape::Text(s) => FieldValue::text(s),
    };
    Ok(Some(value))
}

/// Display text of a relationship object: its name, else its id, else the
/// object itself rendered as JSON.
fn reference_text(obj: &serde_json::Map<String, serde_json::Value>) -> String {
    if let Some(name) = obj.get("name").filter(|v| !v.is_null()) {
        return scalar_text(name);
    }
    if let Some(id) = obj.get("id").filter(|v| !v.is_null()) {
        return scalar_text(id);
    }
    generic_text(&serde_json::Value::Object(obj.clone()))
}

/// Strings render bare, everything else as compact JSON.
fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => yes_no(*b).to_string(),
        other => generic_text(other),
    }
}

fn generic_text(value: &serde_json::Value) -> String {
    value.to_string()
}

fn join(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(", ")
}

/// Parse a numeric string: float when it contains `.` or an exponent marker,
/// integer otherwise. Integer literals beyond `i64` are parsed as floats.
fn parse_numeric(raw: &str, expected: AirtableFieldType) -> Result<FieldValue, SkipReason> {
    let s = raw.trim();
    let not_numeric = || SkipReason::NotNumeric {
        value: raw.to_string(),
        expected,
    };

    if s.contains(['.', 'e', 'E']) {
        return match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(FieldValue::Float(f)),
            _ => Err(not_numeric()),
        };
    }

    match s.parse::<i64>() {
        Ok(i) => Ok(FieldValue::Integer(i)),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            s.parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|_| not_numeric())
        }
        Err(_) => Err(not_numeric()),
    }
}
