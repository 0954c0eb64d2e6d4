//! CrmSource trait definition.

use crate::Result;
use sync_core::{FieldDescriptor, RawRecord};

/// A module the source exposes through its API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub api_name: String,
    pub plural_label: String,
}

/// One page of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordsPage {
    pub records: Vec<RawRecord>,
    /// Whether another page follows this one
    pub more_records: bool,
}

/// Read access to a CRM.
///
/// The orchestrator is generic over this trait so that tests can drive it
/// with in-memory fixtures.
#[async_trait::async_trait]
pub trait CrmSource: Send + Sync {
    /// All modules that support API access.
    async fn list_modules(&self) -> Result<Vec<ModuleInfo>>;

    /// Field metadata for one module.
    async fn module_fields(&self, module: &str) -> Result<Vec<FieldDescriptor>>;

    /// One page of full records. Pages are numbered from 1.
    async fn records_page(&self, module: &str, page: u32, per_page: u32) -> Result<RecordsPage>;
}
