//! In-memory source and destination for exercising the sync without network
//! access.
//!
//! [`FakeSource`] serves fixed modules, fields and record pages.
//! [`FakeSink`] keeps tables in memory and enforces the Airtable rules the
//! sync depends on: case-insensitive field names, select choices and batch
//! size. Both can be told to fail specific calls.

use airtable_sink::{AirtableSink, FieldSchema, TableSchema, MAX_BATCH_SIZE, PRIMARY_FIELD_NAME};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use sync_core::{AirtableFieldType, ConvertedRecord, FieldDescriptor, FieldSpec, RawRecord};
use zoho_source::{CrmSource, ModuleInfo, RecordsPage};

/// Build a [`RawRecord`] from a JSON object literal.
pub fn raw_record(value: serde_json::Value) -> RawRecord {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("raw_record expects a JSON object, got {other}"),
    }
}

#[derive(Default)]
pub struct FakeSource {
    modules: Vec<ModuleInfo>,
    fields: HashMap<String, Vec<FieldDescriptor>>,
    records: HashMap<String, Vec<RawRecord>>,
    failing_schemas: HashSet<String>,
    failing_pages: HashMap<String, u32>,
    reject_token: bool,
    page_requests: Mutex<Vec<(String, u32)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module with its field metadata and records.
    pub fn with_module(
        mut self,
        name: &str,
        fields: Vec<FieldDescriptor>,
        records: Vec<RawRecord>,
    ) -> Self {
        self.modules.push(ModuleInfo {
            api_name: name.to_string(),
            plural_label: name.to_string(),
        });
        self.fields.insert(name.to_string(), fields);
        self.records.insert(name.to_string(), records);
        self
    }

    /// Make the field metadata request for `module` fail.
    pub fn fail_schema(mut self, module: &str) -> Self {
        self.failing_schemas.insert(module.to_string());
        self
    }

    /// Make page `page` of `module` and every later page fail.
    pub fn fail_page(mut self, module: &str, page: u32) -> Self {
        self.failing_pages.insert(module.to_string(), page);
        self
    }

    /// Reject every call as if the refresh token had been revoked.
    pub fn reject_token(mut self) -> Self {
        self.reject_token = true;
        self
    }

    /// Every `(module, page)` requested so far.
    pub fn page_requests(&self) -> Vec<(String, u32)> {
        self.page_requests.lock().unwrap().clone()
    }

    fn check_token(&self) -> zoho_source::Result<()> {
        if self.reject_token {
            return Err(zoho_source::Error::Authentication {
                status: 200,
                body: "invalid_code".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CrmSource for FakeSource {
    async fn list_modules(&self) -> zoho_source::Result<Vec<ModuleInfo>> {
        self.check_token()?;
        Ok(self.modules.clone())
    }

    async fn module_fields(&self, module: &str) -> zoho_source::Result<Vec<FieldDescriptor>> {
        self.check_token()?;
        if self.failing_schemas.contains(module) {
            return Err(zoho_source::Error::Api {
                url: format!("fake://settings/fields?module={module}"),
                status: 500,
                body: "schema unavailable".to_string(),
            });
        }
        Ok(self.fields.get(module).cloned().unwrap_or_default())
    }

    async fn records_page(
        &self,
        module: &str,
        page: u32,
        per_page: u32,
    ) -> zoho_source::Result<RecordsPage> {
        self.check_token()?;
        self.page_requests
            .lock()
            .unwrap()
            .push((module.to_string(), page));
        if self.failing_pages.get(module).is_some_and(|&p| page >= p) {
            return Err(zoho_source::Error::Api {
                url: format!("fake://{module}?page={page}"),
                status: 500,
                body: "page unavailable".to_string(),
            });
        }

        let all = self.records.get(module).map(Vec::as_slice).unwrap_or(&[]);
        let per_page = per_page.max(1) as usize;
        let start = (page.saturating_sub(1) as usize) * per_page;
        let end = (start + per_page).min(all.len());
        let records = all.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
        Ok(RecordsPage {
            records,
            more_records: end < all.len(),
        })
    }
}

struct FakeTable {
    schema: TableSchema,
    specs: HashMap<String, FieldSpec>,
    records: Vec<(String, ConvertedRecord)>,
}

#[derive(Default)]
struct FakeBase {
    tables: Vec<FakeTable>,
    next_id: usize,
    create_field_calls: usize,
    insert_calls: usize,
}

impl FakeBase {
    fn new_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn table_mut(&mut self, id: &str) -> airtable_sink::Result<&mut FakeTable> {
        self.tables
            .iter_mut()
            .find(|t| t.schema.id == id)
            .ok_or_else(|| api_error(404, "NOT_FOUND", &format!("Table {id} not found")))
    }

    fn table_by_name(&self, name: &str) -> Option<&FakeTable> {
        self.tables.iter().find(|t| t.schema.name == name)
    }
}

fn api_error(status: u16, error_type: &str, message: &str) -> airtable_sink::Error {
    let body = json!({"error": {"type": error_type, "message": message}}).to_string();
    airtable_sink::Error::from_response("fake://airtable", status, &body)
}

/// In-memory Airtable base.
#[derive(Default)]
pub struct FakeSink {
    base: Mutex<FakeBase>,
    unreachable: bool,
    failing_tables: HashSet<String>,
    failing_fields: HashSet<String>,
    failing_deletes: bool,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call, as if the base could not be reached.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Refuse to create a table with this name.
    pub fn fail_table(mut self, name: &str) -> Self {
        self.failing_tables.insert(name.to_string());
        self
    }

    /// Refuse to create a field with this name.
    pub fn fail_field(mut self, name: &str) -> Self {
        self.failing_fields.insert(name.to_string());
        self
    }

    /// Fail every batch delete.
    pub fn fail_deletes(mut self) -> Self {
        self.failing_deletes = true;
        self
    }

    /// Add a table with plain text fields. Returns its id.
    pub fn add_table(&self, name: &str, fields: &[&str]) -> String {
        let mut base = self.base.lock().unwrap();
        let id = base.new_id("tbl");
        let mut schema = TableSchema {
            id: id.clone(),
            name: name.to_string(),
            fields: Vec::new(),
        };
        let mut specs = HashMap::new();
        for field in fields {
            schema.fields.push(FieldSchema {
                id: base.new_id("fld"),
                name: field.to_string(),
                field_type: "singleLineText".to_string(),
            });
            specs.insert(field.to_string(), FieldSpec::single_line_text());
        }
        base.tables.push(FakeTable {
            schema,
            specs,
            records: Vec::new(),
        });
        id
    }

    /// Add a field with an explicit spec to an existing table.
    pub fn add_field(&self, table: &str, name: &str, spec: FieldSpec) {
        let mut base = self.base.lock().unwrap();
        let field_id = base.new_id("fld");
        if let Some(table) = base.tables.iter_mut().find(|t| t.schema.name == table) {
            table.schema.fields.push(FieldSchema {
                id: field_id,
                name: name.to_string(),
                field_type: spec.field_type.as_str().to_string(),
            });
            table.specs.insert(name.to_string(), spec);
        }
    }

    /// Add records directly, bypassing validation.
    pub fn seed_records(&self, table: &str, records: Vec<ConvertedRecord>) {
        let mut base = self.base.lock().unwrap();
        let ids: Vec<String> = records.iter().map(|_| base.new_id("rec")).collect();
        if let Some(table) = base.tables.iter_mut().find(|t| t.schema.name == table) {
            table.records.extend(ids.into_iter().zip(records));
        }
    }

    pub fn table_names(&self) -> Vec<String> {
        let base = self.base.lock().unwrap();
        base.tables.iter().map(|t| t.schema.name.clone()).collect()
    }

    pub fn field_names(&self, table: &str) -> Vec<String> {
        let base = self.base.lock().unwrap();
        base.table_by_name(table)
            .map(|t| t.schema.field_names())
            .unwrap_or_default()
    }

    pub fn field_spec(&self, table: &str, field: &str) -> Option<FieldSpec> {
        let base = self.base.lock().unwrap();
        base.table_by_name(table)
            .and_then(|t| t.specs.get(field).cloned())
    }

    pub fn records(&self, table: &str) -> Vec<ConvertedRecord> {
        let base = self.base.lock().unwrap();
        base.table_by_name(table)
            .map(|t| t.records.iter().map(|(_, r)| r.clone()).collect())
            .unwrap_or_default()
    }

    pub fn record_ids(&self, table: &str) -> Vec<String> {
        let base = self.base.lock().unwrap();
        base.table_by_name(table)
            .map(|t| t.records.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn create_field_calls(&self) -> usize {
        self.base.lock().unwrap().create_field_calls
    }

    pub fn insert_calls(&self) -> usize {
        self.base.lock().unwrap().insert_calls
    }

    fn check_reachable(&self) -> airtable_sink::Result<()> {
        if self.unreachable {
            return Err(api_error(503, "SERVICE_UNAVAILABLE", "Base unreachable"));
        }
        Ok(())
    }
}

fn validate(table: &FakeTable, record: &ConvertedRecord) -> airtable_sink::Result<()> {
    for (key, value) in record.iter() {
        let Some(spec) = table.specs.get(key) else {
            return Err(api_error(
                422,
                "UNKNOWN_FIELD_NAME",
                &format!("Unknown field name: \"{key}\""),
            ));
        };
        if spec.field_type.is_select() {
            let text = value.as_str().unwrap_or_default();
            let choices: Vec<&str> = spec.choices().iter().map(|c| c.name.as_str()).collect();
            let rejected = match spec.field_type {
                AirtableFieldType::MultipleSelects => {
                    text.split(", ").find(|option| !choices.contains(option))
                }
                _ => (!choices.contains(&text)).then_some(text),
            };
            if let Some(option) = rejected {
                return Err(api_error(
                    422,
                    "INVALID_MULTIPLE_CHOICE_OPTIONS",
                    &format!("Insufficient permissions to create new select option \"\"{option}\"\""),
                ));
            }
        }
        if spec.field_type.is_numeric() && !value.is_numeric() {
            return Err(api_error(
                422,
                "INVALID_VALUE_FOR_COLUMN",
                &format!("Field \"{key}\" cannot accept the provided value"),
            ));
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl AirtableSink for FakeSink {
    async fn list_tables(&self) -> airtable_sink::Result<Vec<TableSchema>> {
        self.check_reachable()?;
        let base = self.base.lock().unwrap();
        Ok(base.tables.iter().map(|t| t.schema.clone()).collect())
    }

    async fn create_table(&self, name: &str) -> airtable_sink::Result<TableSchema> {
        self.check_reachable()?;
        if self.failing_tables.contains(name) {
            return Err(api_error(
                403,
                "INVALID_PERMISSIONS_OR_MODEL_NOT_FOUND",
                "Not allowed to create tables",
            ));
        }
        let id = self.add_table(name, &[PRIMARY_FIELD_NAME]);
        let base = self.base.lock().unwrap();
        base.tables
            .iter()
            .find(|t| t.schema.id == id)
            .map(|t| t.schema.clone())
            .ok_or_else(|| api_error(500, "SERVER_ERROR", "table vanished"))
    }

    async fn create_field(
        &self,
        table_id: &str,
        name: &str,
        spec: &FieldSpec,
    ) -> airtable_sink::Result<()> {
        self.check_reachable()?;
        let mut base = self.base.lock().unwrap();
        base.create_field_calls += 1;
        if self.failing_fields.contains(name) {
            return Err(api_error(422, "INVALID_FIELD_TYPE", "Field type not allowed"));
        }
        let field_id = base.new_id("fld");
        let table = base.table_mut(table_id)?;
        let lower = name.to_lowercase();
        if name.is_empty() || table.specs.keys().any(|f| f.to_lowercase() == lower) {
            return Err(api_error(
                422,
                "DUPLICATE_OR_EMPTY_FIELD_NAME",
                &format!("Field \"{name}\" already exists"),
            ));
        }
        table.schema.fields.push(FieldSchema {
            id: field_id,
            name: name.to_string(),
            field_type: spec.field_type.as_str().to_string(),
        });
        table.specs.insert(name.to_string(), spec.clone());
        Ok(())
    }

    async fn batch_insert(
        &self,
        table_id: &str,
        records: &[ConvertedRecord],
    ) -> airtable_sink::Result<Vec<String>> {
        self.check_reachable()?;
        let mut base = self.base.lock().unwrap();
        base.insert_calls += 1;
        if records.len() > MAX_BATCH_SIZE {
            return Err(api_error(422, "INVALID_RECORDS", "Too many records"));
        }
        let ids: Vec<String> = records.iter().map(|_| base.new_id("rec")).collect();
        let table = base.table_mut(table_id)?;
        for record in records {
            validate(table, record)?;
        }
        table
            .records
            .extend(ids.iter().cloned().zip(records.iter().cloned()));
        Ok(ids)
    }

    async fn batch_delete(&self, table_id: &str, ids: &[String]) -> airtable_sink::Result<()> {
        self.check_reachable()?;
        if self.failing_deletes {
            return Err(api_error(503, "SERVICE_UNAVAILABLE", "Delete failed"));
        }
        if ids.len() > MAX_BATCH_SIZE {
            return Err(api_error(422, "INVALID_RECORDS", "Too many records"));
        }
        let mut base = self.base.lock().unwrap();
        let table = base.table_mut(table_id)?;
        table.records.retain(|(id, _)| !ids.contains(id));
        Ok(())
    }

    async fn list_record_ids(&self, table_id: &str) -> airtable_sink::Result<Vec<String>> {
        self.check_reachable()?;
        let mut base = self.base.lock().unwrap();
        let table = base.table_mut(table_id)?;
        Ok(table.records.iter().map(|(id, _)| id.clone()).collect())
    }
}
