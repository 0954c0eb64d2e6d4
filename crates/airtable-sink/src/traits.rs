//! AirtableSink trait definition.

use crate::Result;
use serde::Deserialize;
use sync_core::{ConvertedRecord, FieldSpec};

/// A field as reported by the base schema endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSchema {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
}

/// A table as reported by the base schema endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableSchema {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl TableSchema {
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

/// Write access to an Airtable base.
///
/// Tables are addressed by id once they are known; [`list_tables`] and
/// [`create_table`] are the only calls that work by name.
///
/// [`list_tables`]: AirtableSink::list_tables
/// [`create_table`]: AirtableSink::create_table
#[async_trait::async_trait]
pub trait AirtableSink: Send + Sync {
    /// All tables in the base, with their fields.
    async fn list_tables(&self) -> Result<Vec<TableSchema>>;

    /// Create a table whose only field is the `Name` primary field.
    async fn create_table(&self, name: &str) -> Result<TableSchema>;

    /// Create one field with the given type and options.
    async fn create_field(&self, table_id: &str, name: &str, spec: &FieldSpec) -> Result<()>;

    /// Insert up to [`MAX_BATCH_SIZE`](crate::MAX_BATCH_SIZE) records, returning
    /// the new record ids in input order.
    async fn batch_insert(&self, table_id: &str, records: &[ConvertedRecord]) -> Result<Vec<String>>;

    /// Delete up to [`MAX_BATCH_SIZE`](crate::MAX_BATCH_SIZE) records by id.
    async fn batch_delete(&self, table_id: &str, ids: &[String]) -> Result<()>;

    /// Ids of every record in the table.
    async fn list_record_ids(&self, table_id: &str) -> Result<Vec<String>>;
}
