//! Sync orchestration.
//!
//! One module is mirrored into the table of the same name in these steps:
//! ensure the table exists, read the module's field metadata and build the
//! type map, fetch every record, convert, create missing fields, optionally
//! clear the table, then insert in batches. Steps are strictly sequential.
//!
//! Most failures only degrade the result and are recorded as diagnostics on
//! the [`ModuleReport`]. A rejected Zoho refresh token aborts the whole run:
//! nothing further can succeed until the user re-authorizes.

use crate::config::SyncSettings;
use crate::reconcile::{reconcile_fields, FieldNameCorrespondence};
use crate::report::{Diagnostic, DiagnosticKind, ModuleReport, SyncReport, SyncState};
use airtable_sink::{AirtableSink, TableSchema};
use airtable_types::{build_type_map, convert_record_with_diagnostics};
use anyhow::Context;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::time::Duration;
use sync_core::{ConvertedRecord, RawRecord, TypeMap};
use tracing::{debug, info, warn};
use zoho_source::{CrmSource, ModuleInfo};

/// Which modules a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSelection {
    All,
    /// 1-based positions in the module listing
    Indices(Vec<usize>),
    Names(Vec<String>),
}

impl ModuleSelection {
    /// Resolve to module API names, in selection order.
    pub fn resolve(&self, available: &[ModuleInfo]) -> anyhow::Result<Vec<String>> {
        match self {
            Self::All => Ok(available.iter().map(|m| m.api_name.clone()).collect()),
            Self::Indices(indices) => indices
                .iter()
                .map(|&i| {
                    i.checked_sub(1)
                        .and_then(|i| available.get(i))
                        .map(|m| m.api_name.clone())
                        .with_context(|| {
                            format!("Module index {i} is out of range (1-{})", available.len())
                        })
                })
                .collect(),
            Self::Names(names) => Ok(names.clone()),
        }
    }
}

/// Zoho record id to Airtable record id, per module.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    modules: IndexMap<String, IndexMap<String, String>>,
}

impl IdMap {
    pub fn record(&mut self, module: &str, zoho_id: String, airtable_id: String) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(zoho_id, airtable_id);
    }

    pub fn get(&self, module: &str, zoho_id: &str) -> Option<&str> {
        self.modules
            .get(module)
            .and_then(|ids| ids.get(zoho_id))
            .map(String::as_str)
    }

    pub fn len(&self, module: &str) -> usize {
        self.modules.get(module).map_or(0, IndexMap::len)
    }
}

/// A converted record with the source id it came from.
struct PendingRecord {
    zoho_id: Option<String>,
    record: ConvertedRecord,
}

fn zoho_id(record: &RawRecord) -> Option<String> {
    match record.get("id")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Turn a source error into a fatal run error when it is an authentication
/// failure; otherwise hand it back for local recovery.
fn fatal_if_auth(err: zoho_source::Error, module: &str) -> anyhow::Result<zoho_source::Error> {
    if err.is_authentication() {
        return Err(anyhow::Error::new(err)
            .context(format!("Zoho authentication failed while syncing {module}")));
    }
    Ok(err)
}

/// Describe a rejected batch, naming the offending option or field when
/// Airtable reports one.
fn insert_failure(table: &str, batch_index: usize, err: &airtable_sink::Error) -> Diagnostic {
    if let Some(option) = err.rejected_choice() {
        let reason = format!(
            "Select option '{option}' is not allowed; convert the select field to single line text or add the option in Airtable: {err}"
        );
        return Diagnostic::new(DiagnosticKind::BatchInsert, table, reason).with_batch(batch_index);
    }
    if let Some(field) = err.problem_field() {
        let reason = format!(
            "Field '{field}' rejected the value; it may exist in Airtable with a different type: {err}"
        );
        return Diagnostic::new(DiagnosticKind::BatchInsert, table, reason)
            .with_batch(batch_index)
            .with_field(field);
    }
    Diagnostic::new(DiagnosticKind::BatchInsert, table, err.to_string()).with_batch(batch_index)
}

pub struct Orchestrator<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    sink: &'a D,
    settings: SyncSettings,
    tables: Vec<TableSchema>,
    id_map: IdMap,
    visited: HashSet<String>,
}

impl<'a, S, D> Orchestrator<'a, S, D>
where
    S: CrmSource + ?Sized,
    D: AirtableSink + ?Sized,
{
    pub fn new(source: &'a S, sink: &'a D, settings: SyncSettings) -> Self {
        Self {
            source,
            sink,
            settings,
            tables: Vec::new(),
            id_map: IdMap::default(),
            visited: HashSet::new(),
        }
    }

    pub fn id_map(&self) -> &IdMap {
        &self.id_map
    }

    /// Sync each module in turn. A module named twice is synced once.
    ///
    /// Fails only when the Airtable base cannot be read at the start, or when
    /// Zoho rejects the credentials.
    pub async fn sync_modules(&mut self, modules: &[String], clear: bool) -> anyhow::Result<SyncReport> {
        let mut report = SyncReport::new(self.settings.dry_run);
        info!("Starting sync run {} for {} modules", report.run_id, modules.len());
        if self.settings.dry_run {
            info!("Dry run: nothing will be written to Airtable");
        }

        self.tables = self
            .sink
            .list_tables()
            .await
            .context("Failed to read the Airtable base schema")?;
        info!("Found {} existing tables in Airtable", self.tables.len());

        for module in modules {
            if !self.visited.insert(module.clone()) {
                info!("Module {module} already synced, skipping");
                continue;
            }
            let module_report = self.sync_module(module, clear).await?;
            report.modules.push(module_report);
        }

        report.finish();
        Ok(report)
    }

    async fn sync_module(&mut self, module: &str, clear: bool) -> anyhow::Result<ModuleReport> {
        info!("Syncing module: {module}");
        let mut report = ModuleReport::new(module);

        let table = match self.ensure_table(module, &mut report).await {
            Some(table) => table,
            None => {
                report.advance(SyncState::Aborted);
                return Ok(report);
            }
        };
        report.advance(SyncState::TableEnsured);

        let type_map = self.fetch_type_map(module, &mut report).await?;
        report.advance(SyncState::SchemaFetched);

        let records = self.fetch_records(module, &mut report).await?;
        report.records_fetched = records.len();
        report.advance(SyncState::RecordsFetched);
        if records.is_empty() {
            info!("No records found in {module}");
            report.advance(SyncState::Done);
            return Ok(report);
        }

        let pending = self.convert(module, &records, &type_map, &mut report);
        report.records_converted = pending.len();
        report.advance(SyncState::Converted);

        let correspondence = self.reconcile(&table, &type_map, &mut report).await;
        report.advance(SyncState::FieldsReconciled);

        if clear {
            self.clear(&table, &mut report).await;
            report.advance(SyncState::Cleared);
        }

        self.load(&table, &correspondence, pending, &mut report).await;
        report.advance(SyncState::Loaded);

        info!(
            "Synced {} of {} records from {module}",
            report.records_inserted, report.records_fetched
        );
        report.advance(SyncState::Done);
        Ok(report)
    }

    /// The table named after `module`, created when missing. In a dry run a
    /// missing table is stood in for by an empty schema.
    async fn ensure_table(&mut self, module: &str, report: &mut ModuleReport) -> Option<TableSchema> {
        if let Some(table) = self.tables.iter().find(|t| t.name == module) {
            return Some(table.clone());
        }

        if self.settings.dry_run {
            info!("Table {module} does not exist and would be created");
            return Some(TableSchema {
                id: String::new(),
                name: module.to_string(),
                fields: Vec::new(),
            });
        }

        info!("Table {module} does not exist in Airtable, creating it");
        match self.sink.create_table(module).await {
            Ok(table) => {
                info!("Created table {module}");
                self.tables.push(table.clone());
                pause(self.settings.delays.table).await;
                Some(table)
            }
            Err(e) => {
                report.warn(Diagnostic::new(
                    DiagnosticKind::TableEnsure,
                    module,
                    format!("Failed to create table: {e}"),
                ));
                None
            }
        }
    }

    async fn fetch_type_map(&self, module: &str, report: &mut ModuleReport) -> anyhow::Result<TypeMap> {
        match self.source.module_fields(module).await {
            Ok(fields) => {
                let type_map = build_type_map(&fields);
                debug!("Type map for {module} has {} fields", type_map.len());
                Ok(type_map)
            }
            Err(e) => {
                let e = fatal_if_auth(e, module)?;
                report.warn(Diagnostic::new(
                    DiagnosticKind::SchemaFetch,
                    module,
                    format!("Could not fetch field metadata, continuing without types: {e}"),
                ));
                Ok(TypeMap::new())
            }
        }
    }

    /// Every record of `module`. A failed page ends pagination but keeps the
    /// records fetched before it.
    async fn fetch_records(&self, module: &str, report: &mut ModuleReport) -> anyhow::Result<Vec<RawRecord>> {
        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let result = self
                .source
                .records_page(module, page, self.settings.page_size)
                .await;
            let batch = match result {
                Ok(batch) => batch,
                Err(e) => {
                    let e = fatal_if_auth(e, module)?;
                    report.warn(Diagnostic::new(
                        DiagnosticKind::PageFetch,
                        module,
                        format!("Failed to fetch page {page}, keeping {} records: {e}", records.len()),
                    ));
                    break;
                }
            };

            if batch.records.is_empty() {
                break;
            }
            records.extend(batch.records);
            info!("Fetched page {page} from {module} ({} records so far)", records.len());

            if !batch.more_records {
                break;
            }
            page += 1;
            pause(self.settings.delays.page).await;
        }
        Ok(records)
    }

    fn convert(
        &self,
        module: &str,
        records: &[RawRecord],
        type_map: &TypeMap,
        report: &mut ModuleReport,
    ) -> Vec<PendingRecord> {
        info!("Converting {} records to Airtable format", records.len());
        let blacklist = self.settings.blacklist(module);
        records
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let (record, skipped) = convert_record_with_diagnostics(raw, type_map, &blacklist);
                for skip in skipped {
                    report.warn(
                        Diagnostic::new(DiagnosticKind::ValueConversion, module, skip.reason.to_string())
                            .with_field(skip.field)
                            .with_record(index),
                    );
                }
                PendingRecord {
                    zoho_id: zoho_id(raw),
                    record,
                }
            })
            .collect()
    }

    /// Create missing fields and return the lookup used to name fields on
    /// insert.
    async fn reconcile(
        &mut self,
        table: &TableSchema,
        type_map: &TypeMap,
        report: &mut ModuleReport,
    ) -> FieldNameCorrespondence {
        let existing = table.field_names();

        if self.settings.dry_run {
            let mut correspondence = FieldNameCorrespondence::from_names(existing);
            let missing: Vec<&String> = type_map
                .keys()
                .filter(|name| correspondence.resolve(name).is_none())
                .collect();
            info!("{} fields would be created in {}", missing.len(), table.name);
            for name in missing {
                correspondence.insert(name.clone());
            }
            return correspondence;
        }

        if type_map.is_empty() {
            return FieldNameCorrespondence::from_names(existing);
        }

        info!("Checking fields in Airtable table {}", table.name);
        let outcome = reconcile_fields(
            self.sink,
            &table.id,
            &existing,
            type_map,
            self.settings.delays.field,
        )
        .await;
        report.fields_created = outcome.created.len();
        for (field, reason) in outcome.failed {
            report.warn(
                Diagnostic::new(DiagnosticKind::FieldCreation, &table.name, reason).with_field(field),
            );
        }

        if outcome.created.is_empty() {
            return FieldNameCorrespondence::from_names(existing);
        }

        // Re-read the table so inserts use the names Airtable actually holds
        match self.sink.list_tables().await {
            Ok(tables) => {
                let refreshed = tables.iter().find(|t| t.id == table.id).cloned();
                self.tables = tables;
                match refreshed {
                    Some(refreshed) => FieldNameCorrespondence::from_names(refreshed.field_names()),
                    None => FieldNameCorrespondence::from_names(existing.into_iter().chain(outcome.created)),
                }
            }
            Err(e) => {
                warn!("Could not re-read fields of {}: {e}", table.name);
                FieldNameCorrespondence::from_names(existing.into_iter().chain(outcome.created))
            }
        }
    }

    async fn clear(&self, table: &TableSchema, report: &mut ModuleReport) {
        if self.settings.dry_run {
            info!("Existing records in {} would be deleted", table.name);
            return;
        }

        info!("Clearing existing records from {}", table.name);
        let ids = match self.sink.list_record_ids(&table.id).await {
            Ok(ids) => ids,
            Err(e) => {
                report.warn(Diagnostic::new(
                    DiagnosticKind::BatchDelete,
                    &table.name,
                    format!("Failed to list records to delete: {e}"),
                ));
                return;
            }
        };

        for (index, batch) in ids.chunks(self.settings.batch_size).enumerate() {
            match self.sink.batch_delete(&table.id, batch).await {
                Ok(()) => report.records_deleted += batch.len(),
                Err(e) => report.warn(
                    Diagnostic::new(DiagnosticKind::BatchDelete, &table.name, e.to_string())
                        .with_batch(index),
                ),
            }
            pause(self.settings.delays.delete).await;
        }
        info!("Cleared {} records from {}", report.records_deleted, table.name);
    }

    async fn load(
        &mut self,
        table: &TableSchema,
        correspondence: &FieldNameCorrespondence,
        pending: Vec<PendingRecord>,
        report: &mut ModuleReport,
    ) {
        let mut ready = Vec::with_capacity(pending.len());
        for PendingRecord { zoho_id, record } in pending {
            let record = correspondence.map_record(record);
            if record.is_empty() {
                report.records_dropped += 1;
                continue;
            }
            ready.push((zoho_id, record));
        }
        if report.records_dropped > 0 {
            warn!(
                "{} records of {} have no fields in common with the table and were dropped",
                report.records_dropped, table.name
            );
        }

        if self.settings.dry_run {
            info!(
                "Would insert {} records into {} in batches of {}",
                ready.len(),
                table.name,
                self.settings.batch_size
            );
            return;
        }

        info!("Importing {} records to Airtable", ready.len());
        for (index, batch) in ready.chunks(self.settings.batch_size).enumerate() {
            let records: Vec<ConvertedRecord> = batch.iter().map(|(_, r)| r.clone()).collect();
            match self.sink.batch_insert(&table.id, &records).await {
                Ok(ids) => {
                    for ((zoho_id, _), airtable_id) in batch.iter().zip(ids) {
                        if let Some(zoho_id) = zoho_id {
                            self.id_map.record(&table.name, zoho_id.clone(), airtable_id);
                        }
                    }
                    report.records_inserted += batch.len();
                    debug!("Created batch {}: {} records", index + 1, batch.len());
                }
                Err(e) => report.warn(insert_failure(&table.name, index, &e)),
            }
            pause(self.settings.delays.insert).await;
        }
    }
}
