//! Airtable destination client.
//!
//! Defines the [`AirtableSink`] trait the sync orchestrator writes through and
//! [`AirtableClient`], its implementation over the Airtable Web API. Failed
//! calls surface as [`Error::Api`] carrying Airtable's error type, so callers
//! can tell a duplicate field or a rejected select option from other failures.

mod client;
mod error;
mod traits;

pub use client::{AirtableClient, AirtableConfig, DEFAULT_API_URL, MAX_BATCH_SIZE, PRIMARY_FIELD_NAME};
pub use error::{AirtableErrorKind, Error, Result};
pub use traits::{AirtableSink, FieldSchema, TableSchema};
