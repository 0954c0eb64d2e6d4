//! Zoho CRM → Airtable type conversions.
//!
//! This crate is the conversion engine of the mirror. It has no I/O.
//!
//! # Modules
//!
//! - [`schema`] - Zoho field descriptor → Airtable field spec (type mapping)
//! - [`forward`] - Zoho record → Airtable record (value conversion)
//!
//! # Example
//!
//! ```
//! use airtable_types::{build_type_map, convert_record, FieldBlacklist};
//! use sync_core::{FieldDescriptor, FieldValue, RawRecord};
//!
//! let fields = vec![
//!     FieldDescriptor::new("Account_Name", "text"),
//!     FieldDescriptor::new("Annual_Revenue", "currency"),
//! ];
//! let type_map = build_type_map(&fields);
//!
//! let raw: RawRecord = serde_json::from_str(
//!     r#"{"Account_Name": "Acme", "Annual_Revenue": "1000000", "$locked_for_me": true}"#,
//! )
//! .unwrap();
//! let record = convert_record(&raw, &type_map, &FieldBlacklist::new());
//!
//! assert_eq!(record.get("Annual_Revenue"), Some(&FieldValue::Integer(1_000_000)));
//! assert_eq!(record.get("locked_for_me"), Some(&FieldValue::text("Yes")));
//! ```

pub mod forward;
pub mod schema;

pub use forward::{
    convert_record, convert_record_with_diagnostics, FieldBlacklist, FieldSkip, SkipReason,
};
pub use schema::{build_type_map, clean_field_name, map_field, SYSTEM_FIELD_PREFIX};
