//! Per-run report.
//!
//! Failures the sync recovers from are not lost in the log: each one becomes a
//! [`Diagnostic`] on the report of the module it happened in.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    TableEnsure,
    SchemaFetch,
    PageFetch,
    ValueConversion,
    FieldCreation,
    BatchDelete,
    BatchInsert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_index: Option<usize>,
    pub reason: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            module: module.into(),
            field: None,
            record_index: None,
            batch_index: None,
            reason: reason.into(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_record(mut self, index: usize) -> Self {
        self.record_index = Some(index);
        self
    }

    pub fn with_batch(mut self, index: usize) -> Self {
        self.batch_index = Some(index);
        self
    }
}

/// Progress of one module through the sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    NotStarted,
    TableEnsured,
    SchemaFetched,
    RecordsFetched,
    Converted,
    FieldsReconciled,
    Cleared,
    Loaded,
    Done,
    /// The destination table could not be found or created
    Aborted,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not started",
            Self::TableEnsured => "table ensured",
            Self::SchemaFetched => "schema fetched",
            Self::RecordsFetched => "records fetched",
            Self::Converted => "converted",
            Self::FieldsReconciled => "fields reconciled",
            Self::Cleared => "cleared",
            Self::Loaded => "loaded",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleReport {
    pub module: String,
    pub state: SyncState,
    pub records_fetched: usize,
    pub records_converted: usize,
    pub records_inserted: usize,
    /// Records dropped because none of their fields exist in the table
    pub records_dropped: usize,
    pub records_deleted: usize,
    pub fields_created: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ModuleReport {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            state: SyncState::NotStarted,
            records_fetched: 0,
            records_converted: 0,
            records_inserted: 0,
            records_dropped: 0,
            records_deleted: 0,
            fields_created: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn advance(&mut self, state: SyncState) {
        info!("{}: {} -> {}", self.module, self.state, state);
        self.state = state;
    }

    /// Log a recovered failure and keep it on the report.
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        match &diagnostic.field {
            Some(field) => warn!(
                "{} [{:?}] field {field}: {}",
                self.module, diagnostic.kind, diagnostic.reason
            ),
            None => warn!("{} [{:?}]: {}", self.module, diagnostic.kind, diagnostic.reason),
        }
        self.diagnostics.push(diagnostic);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub modules: Vec<ModuleReport>,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            modules: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total_inserted(&self) -> usize {
        self.modules.iter().map(|m| m.records_inserted).sum()
    }

    pub fn warning_counts(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for diagnostic in self.modules.iter().flat_map(|m| &m.diagnostics) {
            *counts.entry(diagnostic.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.module == name)
    }

    pub fn log_summary(&self) {
        info!("Sync run {} finished", self.run_id);
        for module in &self.modules {
            info!(
                "  {}: {} of {} records synced ({}, {} warnings)",
                module.module,
                module.records_inserted,
                module.records_fetched,
                module.state,
                module.diagnostics.len()
            );
        }
        info!("Total records synced: {}", self.total_inserted());
        for (kind, count) in self.warning_counts() {
            warn!("  {count} {kind:?} warnings");
        }
    }

    pub async fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(self).context("Failed to serialize sync report")?;
        let mut file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create report file: {path:?}"))?;
        file.write_all(&json).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}
