//! Type mapping from Zoho field descriptors to Airtable field specs.

use indexmap::IndexSet;
use sync_core::{AirtableFieldType, Choice, FieldDescriptor, FieldSpec, TypeMap};

/// Prefix Zoho puts on system-managed field names. Airtable rejects `$`.
pub const SYSTEM_FIELD_PREFIX: char = '$';

/// Placeholder choice for select fields without pick-list values.
/// Airtable refuses to create a select field with an empty choice set.
const PLACEHOLDER_CHOICE: &str = "None";

/// Strip the reserved system prefix from a Zoho field name.
pub fn clean_field_name(name: &str) -> &str {
    name.trim_start_matches(SYSTEM_FIELD_PREFIX)
}

/// Map a Zoho field to the Airtable field spec used to create it.
///
/// Lookup on `data_type` is case-insensitive. Unknown types map to
/// `singleLineText`.
pub fn map_field(field: &FieldDescriptor) -> FieldSpec {
    match field.data_type.to_lowercase().as_str() {
        // Booleans are written as "Yes"/"No" text by the converter
        "text" | "lookup" | "ownerlookup" | "userlookup" | "boolean" => {
            FieldSpec::single_line_text()
        }

        "textarea" | "fileupload" | "profileimage" => {
            FieldSpec::plain(AirtableFieldType::MultilineText)
        }

        "email" => FieldSpec::plain(AirtableFieldType::Email),
        "phone" => FieldSpec::plain(AirtableFieldType::PhoneNumber),
        "website" => FieldSpec::plain(AirtableFieldType::Url),

        "picklist" => FieldSpec::select(AirtableFieldType::SingleSelect, build_choices(field)),
        "multiselectpicklist" => {
            FieldSpec::select(AirtableFieldType::MultipleSelects, build_choices(field))
        }

        "integer" | "bigint" => FieldSpec::number(0),
        "double" => FieldSpec::number(2),
        "currency" => FieldSpec::currency(2, "$"),

        "date" => FieldSpec::date(),
        "datetime" => FieldSpec::date_time(),

        _ => FieldSpec::single_line_text(),
    }
}

/// Build the choice list for a select field, deduplicated in source order.
fn build_choices(field: &FieldDescriptor) -> Vec<Choice> {
    let labels: IndexSet<&str> = field
        .pick_list()
        .iter()
        .filter_map(|value| value.label())
        .collect();

    if labels.is_empty() {
        return vec![Choice::new(PLACEHOLDER_CHOICE)];
    }
    labels.into_iter().map(Choice::new).collect()
}

/// Build the type map for a module: cleaned field name → field spec.
///
/// Fields whose name is empty after stripping the system prefix are skipped.
/// If two descriptors clean to the same name, the later one wins.
pub fn build_type_map(fields: &[FieldDescriptor]) -> TypeMap {
    let mut type_map = TypeMap::new();
    for field in fields {
        let name = clean_field_name(&field.api_name);
        if name.is_empty() {
            continue;
        }
        type_map.insert(name.to_string(), map_field(field));
    }
    type_map
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sync_core::{FieldOptions, PickListValue};

    fn spec_for(data_type: &str) -> FieldSpec {
        map_field(&FieldDescriptor::new("Field", data_type))
    }

    #[test]
    fn test_known_types_follow_mapping_table() {
        let cases = [
            ("text", AirtableFieldType::SingleLineText),
            ("lookup", AirtableFieldType::SingleLineText),
            ("ownerlookup", AirtableFieldType::SingleLineText),
            ("userlookup", AirtableFieldType::SingleLineText),
            ("boolean", AirtableFieldType::SingleLineText),
            ("textarea", AirtableFieldType::MultilineText),
            ("fileupload", AirtableFieldType::MultilineText),
            ("profileimage", AirtableFieldType::MultilineText),
            ("email", AirtableFieldType::Email),
            ("phone", AirtableFieldType::PhoneNumber),
            ("website", AirtableFieldType::Url),
            ("picklist", AirtableFieldType::SingleSelect),
            ("multiselectpicklist", AirtableFieldType::MultipleSelects),
            ("integer", AirtableFieldType::Number),
            ("bigint", AirtableFieldType::Number),
            ("double", AirtableFieldType::Number),
            ("currency", AirtableFieldType::Currency),
            ("date", AirtableFieldType::Date),
            ("datetime", AirtableFieldType::DateTime),
        ];

        for (data_type, expected) in cases {
            assert_eq!(spec_for(data_type).field_type, expected, "{data_type}");
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(spec_for("Currency"), FieldSpec::currency(2, "$"));
        assert_eq!(spec_for("DATETIME"), FieldSpec::date_time());
    }

    #[test]
    fn test_unknown_types_fall_back_to_single_line_text() {
        for data_type in ["formula", "autonumber", "", "consent_lookup", "rrule"] {
            assert_eq!(spec_for(data_type), FieldSpec::single_line_text());
        }
    }

    #[test]
    fn test_numeric_options() {
        assert_eq!(
            spec_for("integer").options,
            Some(FieldOptions::Number { precision: 0 })
        );
        assert_eq!(
            spec_for("bigint").options,
            Some(FieldOptions::Number { precision: 0 })
        );
        assert_eq!(
            spec_for("double").options,
            Some(FieldOptions::Number { precision: 2 })
        );
        assert_eq!(
            spec_for("currency").options,
            Some(FieldOptions::Currency {
                precision: 2,
                symbol: "$".to_string()
            })
        );
    }

    #[test]
    fn test_date_options() {
        assert_eq!(spec_for("date"), FieldSpec::date());
        assert_eq!(spec_for("datetime"), FieldSpec::date_time());
        assert!(spec_for("text").options.is_none());
    }

    #[test]
    fn test_picklist_without_values_gets_placeholder_choice() {
        let spec = spec_for("picklist");
        assert_eq!(spec.choices(), &[Choice::new("None")]);

        let spec = spec_for("multiselectpicklist");
        assert_eq!(spec.choices(), &[Choice::new("None")]);
    }

    #[test]
    fn test_picklist_choices_are_deduplicated_in_source_order() {
        let field = FieldDescriptor::new("Rating", "picklist").with_pick_list(vec![
            PickListValue::entry(Some("Hot"), Some("hot")),
            PickListValue::Plain("Warm".to_string()),
            PickListValue::entry(None, Some("Cold")),
            PickListValue::entry(None, None),
            PickListValue::entry(Some("Hot"), Some("hot-2")),
        ]);

        let names: Vec<_> = map_field(&field)
            .choices()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(names, vec!["Hot", "Warm", "Cold"]);
    }

    #[test]
    fn test_picklist_with_only_unusable_entries_gets_placeholder() {
        let field = FieldDescriptor::new("Rating", "picklist")
            .with_pick_list(vec![PickListValue::entry(None, None)]);
        assert_eq!(map_field(&field).choices(), &[Choice::new("None")]);
    }

    #[test]
    fn test_build_type_map_strips_system_prefix() {
        let fields = vec![
            FieldDescriptor::new("Account_Name", "text"),
            FieldDescriptor::new("$currency_symbol", "text"),
            FieldDescriptor::new("$$state", "text"),
            FieldDescriptor::new("$", "text"),
            FieldDescriptor::new("", "text"),
            FieldDescriptor::new("Annual_Revenue", "currency"),
        ];

        let type_map = build_type_map(&fields);
        let names: Vec<_> = type_map.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["Account_Name", "currency_symbol", "state", "Annual_Revenue"]
        );
        assert_eq!(type_map["Annual_Revenue"], FieldSpec::currency(2, "$"));
    }

    #[test]
    fn test_clean_field_name() {
        assert_eq!(clean_field_name("$locked_for_me"), "locked_for_me");
        assert_eq!(clean_field_name("Owner"), "Owner");
        assert_eq!(clean_field_name("A$B"), "A$B");
    }
}
