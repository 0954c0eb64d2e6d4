//! Value representations on both sides of the conversion.
//!
//! `ValueShape` classifies a raw Zoho JSON value into the closed set of shapes
//! the converter knows how to handle. `FieldValue` and `ConvertedRecord` hold
//! the Airtable-shaped output: strings and numbers only.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// A destination-shaped scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text value
    Text(String),

    /// Integral number
    Integer(i64),

    /// Floating point number
    Float(f64),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Convert a JSON number, keeping integers integral.
    pub fn from_number(n: &Number) -> Self {
        match n.as_i64() {
            Some(i) => Self::Integer(i),
            None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }
}

/// One record ready to be written to Airtable.
///
/// Keys are cleaned field names (no `$` prefix). A missing key means
/// "leave this field alone", never "clear it".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConvertedRecord {
    fields: IndexMap<String, FieldValue>,
}

impl ConvertedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. An existing key keeps its position but takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}

impl FromIterator<(String, FieldValue)> for ConvertedRecord {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ConvertedRecord {
    type Item = (String, FieldValue);
    type IntoIter = indexmap::map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Runtime shape of a raw Zoho value.
///
/// Conversion dispatches on this shape rather than on the declared schema
/// type, since Zoho freely returns objects for lookups, lists for
/// multi-selects and strings for numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueShape<'a> {
    /// `null`
    Missing,
    Bool(bool),
    Number(&'a Number),
    Text(&'a str),
    /// A nested relationship object (lookup, owner, ...)
    Reference(&'a Map<String, Value>),
    /// A non-empty list whose first item is an object
    ReferenceList(&'a [Value]),
    /// A non-empty list of scalars
    ScalarList(&'a [Value]),
    EmptyList,
}

impl<'a> ValueShape<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Null => Self::Missing,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::Text(s),
            Value::Object(obj) => Self::Reference(obj),
            Value::Array(items) => match items.first() {
                None => Self::EmptyList,
                Some(Value::Object(_)) => Self::ReferenceList(items),
                Some(_) => Self::ScalarList(items),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_classify_shapes() {
        assert_eq!(ValueShape::classify(&json!(null)), ValueShape::Missing);
        assert_eq!(ValueShape::classify(&json!(true)), ValueShape::Bool(true));
        assert_eq!(ValueShape::classify(&json!("x")), ValueShape::Text("x"));
        assert_eq!(ValueShape::classify(&json!([])), ValueShape::EmptyList);
        assert!(matches!(
            ValueShape::classify(&json!(12)),
            ValueShape::Number(_)
        ));
        assert!(matches!(
            ValueShape::classify(&json!({"id": "1"})),
            ValueShape::Reference(_)
        ));
        assert!(matches!(
            ValueShape::classify(&json!([{"name": "A"}, "b"])),
            ValueShape::ReferenceList(_)
        ));
        assert!(matches!(
            ValueShape::classify(&json!(["a", {"name": "B"}])),
            ValueShape::ScalarList(_)
        ));
    }

    #[test]
    fn test_field_value_from_number() {
        let n: Number = serde_json::from_str("42").unwrap();
        assert_eq!(FieldValue::from_number(&n), FieldValue::Integer(42));
        let n: Number = serde_json::from_str("42.5").unwrap();
        assert_eq!(FieldValue::from_number(&n), FieldValue::Float(42.5));
    }

    #[test]
    fn test_converted_record_serializes_flat() {
        let mut record = ConvertedRecord::new();
        record.insert("Name", FieldValue::text("Acme"));
        record.insert("Revenue", FieldValue::Integer(10));
        record.insert("Rate", FieldValue::Float(0.5));
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"Name":"Acme","Revenue":10,"Rate":0.5}"#
        );
    }

    #[test]
    fn test_converted_record_overwrite_keeps_position() {
        let mut record = ConvertedRecord::new();
        record.insert("a", FieldValue::text("1"));
        record.insert("b", FieldValue::text("2"));
        record.insert("a", FieldValue::text("3"));
        let keys: Vec<_> = record.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&FieldValue::text("3")));
    }
}
