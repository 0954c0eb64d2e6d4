//! Core types for the zoho-airtable-sync framework.
//!
//! This crate provides the foundational types shared by the source client,
//! the destination client and the conversion engine:
//!
//! - [`FieldDescriptor`] - Zoho CRM field metadata as returned by `/settings/fields`
//! - [`AirtableFieldType`] / [`FieldSpec`] - Airtable field type plus its creation options
//! - [`RawRecord`] - A Zoho record exactly as fetched, in source key order
//! - [`FieldValue`] / [`ConvertedRecord`] - Airtable-shaped values after conversion
//! - [`ValueShape`] - The closed set of runtime shapes a Zoho value can take
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── airtable-types   (type mapping + value conversion)
//!    ├─── zoho-source      (produces FieldDescriptor / RawRecord)
//!    └─── airtable-sink    (consumes FieldSpec / ConvertedRecord)
//! ```

pub mod schema;
pub mod types;
pub mod values;

pub use schema::{FieldDescriptor, PickListValue, RawRecord, TypeMap};
pub use types::{AirtableFieldType, Choice, DateFormat, FieldOptions, FieldSpec, TimeFormat};
pub use values::{ConvertedRecord, FieldValue, ValueShape};
