//! Airtable Web API client.

use crate::{AirtableSink, Error, Result, TableSchema};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sync_core::{ConvertedRecord, FieldSpec};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";

/// Airtable accepts at most this many records per create or delete call.
pub const MAX_BATCH_SIZE: usize = 10;

/// Primary field every created table starts with.
pub const PRIMARY_FIELD_NAME: &str = "Name";

const LIST_PAGE_SIZE: &str = "100";

#[derive(Debug, Clone)]
pub struct AirtableConfig {
    /// Personal access token
    pub token: String,
    pub base_id: String,
    pub api_url: String,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_id: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Serialize)]
struct CreateFieldRequest<'a> {
    name: &'a str,
    #[serde(flatten)]
    spec: &'a FieldSpec,
}

#[derive(Serialize)]
struct CreateTableRequest<'a> {
    name: &'a str,
    fields: Vec<CreateFieldRequest<'a>>,
}

#[derive(Serialize)]
struct InsertRequest<'a> {
    records: Vec<InsertRecord<'a>>,
}

#[derive(Serialize)]
struct InsertRecord<'a> {
    fields: &'a ConvertedRecord,
}

#[derive(Deserialize)]
struct TablesResponse {
    #[serde(default)]
    tables: Vec<TableSchema>,
}

#[derive(Deserialize)]
struct RecordRef {
    id: String,
}

#[derive(Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<RecordRef>,
    offset: Option<String>,
}

#[derive(Deserialize)]
struct Ignored {}

pub struct AirtableClient {
    http: reqwest::Client,
    config: AirtableConfig,
}

impl AirtableClient {
    pub fn new(config: AirtableConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(Error::InvalidConfig(
                "Airtable access token is not set".to_string(),
            ));
        }
        if config.base_id.is_empty() {
            return Err(Error::InvalidConfig("Airtable base id is not set".to_string()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    pub fn config(&self) -> &AirtableConfig {
        &self.config
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| Error::InvalidConfig(format!("invalid Airtable API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig("Airtable API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn meta_tables(&self) -> Result<Url> {
        self.endpoint(&["meta", "bases", &self.config.base_id, "tables"])
    }

    fn table_records(&self, table_id: &str) -> Result<Url> {
        self.endpoint(&[&self.config.base_id, table_id])
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, url: &Url) -> Result<T> {
        let response = request.bearer_auth(&self.config.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_response(url.as_str(), status.as_u16(), &body));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait::async_trait]
impl AirtableSink for AirtableClient {
    async fn list_tables(&self) -> Result<Vec<TableSchema>> {
        let url = self.meta_tables()?;
        let response: TablesResponse = self.send(self.http.get(url.clone()), &url).await?;
        Ok(response.tables)
    }

    async fn create_table(&self, name: &str) -> Result<TableSchema> {
        let url = self.meta_tables()?;
        let primary = FieldSpec::single_line_text();
        let body = CreateTableRequest {
            name,
            fields: vec![CreateFieldRequest {
                name: PRIMARY_FIELD_NAME,
                spec: &primary,
            }],
        };
        let table: TableSchema = self.send(self.http.post(url.clone()).json(&body), &url).await?;
        debug!("Created table {} ({})", table.name, table.id);
        Ok(table)
    }

    async fn create_field(&self, table_id: &str, name: &str, spec: &FieldSpec) -> Result<()> {
        let url = self.endpoint(&["meta", "bases", &self.config.base_id, "tables", table_id, "fields"])?;
        let body = CreateFieldRequest { name, spec };
        let _: Ignored = self.send(self.http.post(url.clone()).json(&body), &url).await?;
        debug!("Created field {name} ({})", spec.field_type);
        Ok(())
    }

    async fn batch_insert(&self, table_id: &str, records: &[ConvertedRecord]) -> Result<Vec<String>> {
        let url = self.table_records(table_id)?;
        let body = InsertRequest {
            records: records.iter().map(|fields| InsertRecord { fields }).collect(),
        };
        let response: RecordsResponse = self.send(self.http.post(url.clone()).json(&body), &url).await?;
        if response.records.len() != records.len() {
            return Err(Error::InvalidResponse(format!(
                "sent {} records but {} were created",
                records.len(),
                response.records.len()
            )));
        }
        Ok(response.records.into_iter().map(|r| r.id).collect())
    }

    async fn batch_delete(&self, table_id: &str, ids: &[String]) -> Result<()> {
        let mut url = self.table_records(table_id)?;
        {
            let mut query = url.query_pairs_mut();
            for id in ids {
                query.append_pair("records[]", id);
            }
        }
        let _: Ignored = self.send(self.http.delete(url.clone()), &url).await?;
        Ok(())
    }

    async fn list_record_ids(&self, table_id: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let mut url = self.table_records(table_id)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", LIST_PAGE_SIZE);
                if let Some(offset) = &offset {
                    query.append_pair("offset", offset);
                }
            }
            let page: RecordsResponse = self.send(self.http.get(url.clone()), &url).await?;
            ids.extend(page.records.into_iter().map(|r| r.id));
            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sync_core::FieldValue;

    fn config() -> AirtableConfig {
        AirtableConfig {
            token: "pat".to_string(),
            base_id: "appBase".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_credentials_are_rejected() {
        let no_token = AirtableConfig {
            token: String::new(),
            ..config()
        };
        assert!(matches!(AirtableClient::new(no_token), Err(Error::InvalidConfig(_))));

        let no_base = AirtableConfig {
            base_id: String::new(),
            ..config()
        };
        assert!(matches!(AirtableClient::new(no_base), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_endpoints() {
        let client = AirtableClient::new(config()).unwrap();
        assert_eq!(
            client.meta_tables().unwrap().as_str(),
            "https://api.airtable.com/v0/meta/bases/appBase/tables"
        );
        assert_eq!(
            client.table_records("tblLeads").unwrap().as_str(),
            "https://api.airtable.com/v0/appBase/tblLeads"
        );
    }

    #[test]
    fn test_create_field_body_flattens_spec() {
        let spec = FieldSpec::number(0);
        let body = CreateFieldRequest {
            name: "Employees",
            spec: &spec,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"name": "Employees", "type": "number", "options": {"precision": 0}})
        );
    }

    #[test]
    fn test_insert_body() {
        let record: ConvertedRecord = [
            ("Name".to_string(), FieldValue::text("Acme")),
            ("Employees".to_string(), FieldValue::Integer(250)),
        ]
        .into_iter()
        .collect();
        let body = InsertRequest {
            records: vec![InsertRecord { fields: &record }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"records": [{"fields": {"Name": "Acme", "Employees": 250}}]})
        );
    }
}
