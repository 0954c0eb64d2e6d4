//! Zoho CRM v8 REST client.

use crate::token::{TokenCache, DEFAULT_TOKEN_LIFETIME};
use crate::{CrmSource, Error, ModuleInfo, RecordsPage, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use sync_core::{FieldDescriptor, RawRecord};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Largest page Zoho serves for record listings.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// The Users module is served by `/users` rather than the generic record API.
pub const USERS_MODULE: &str = "Users";

const OAUTH_SCOPES: &str = "ZohoCRM.modules.ALL,ZohoCRM.settings.ALL,ZohoCRM.users.READ";

/// OAuth `error` codes meaning the client or refresh token was not accepted.
/// Anything else from the token endpoint (throttling, outages) is transient.
const OAUTH_REJECTIONS: &[&str] = &[
    "invalid_code",
    "invalid_client",
    "invalid_client_secret",
    "invalid_grant",
    "invalid_token",
    "unauthorized_client",
];

fn is_oauth_rejection(error: &str) -> bool {
    OAUTH_REJECTIONS.contains(&error)
}

/// Connection settings for a Zoho CRM organisation.
#[derive(Debug, Clone)]
pub struct ZohoConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,

    /// Data center suffix (`com`, `eu`, `in`, `com.au`, ...)
    pub region: String,

    /// Override for `https://www.zohoapis.{region}/crm/v8`
    pub api_url: Option<String>,

    /// Override for `https://accounts.zoho.{region}`
    pub accounts_url: Option<String>,

    /// Number of record detail requests issued between two pauses
    pub detail_burst: usize,

    /// Pause taken after each burst of detail requests
    pub detail_delay: Duration,
}

impl Default for ZohoConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            region: "com".to_string(),
            api_url: None,
            accounts_url: None,
            detail_burst: 10,
            detail_delay: Duration::from_millis(500),
        }
    }
}

impl ZohoConfig {
    pub fn api_base(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| format!("https://www.zohoapis.{}/crm/v8", self.region))
    }

    pub fn accounts_base(&self) -> String {
        self.accounts_url
            .clone()
            .unwrap_or_else(|| format!("https://accounts.zoho.{}", self.region))
    }

    /// Browser URL that issues a new grant code with the scopes the sync needs.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}/oauth/v2/auth?scope={OAUTH_SCOPES}&client_id={}&response_type=code&access_type=offline&redirect_uri=http://localhost",
            self.accounts_base(),
            self.client_id
        )
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PageInfo {
    #[serde(default)]
    more_records: bool,
}

#[derive(Debug, Deserialize)]
struct DataResponse {
    #[serde(default)]
    data: Vec<RawRecord>,
    #[serde(default)]
    info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<RawRecord>,
    #[serde(default)]
    info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct ModulesResponse {
    #[serde(default)]
    modules: Vec<ModuleEntry>,
}

#[derive(Debug, Deserialize)]
struct ModuleEntry {
    api_name: String,
    #[serde(default)]
    plural_label: String,
    #[serde(default)]
    api_supported: bool,
}

#[derive(Debug, Deserialize)]
struct FieldsResponse {
    #[serde(default)]
    fields: Vec<FieldDescriptor>,
}

/// Zoho CRM client.
///
/// Holds its own [`TokenCache`]; the access token is refreshed on demand from
/// the configured refresh token.
pub struct ZohoClient {
    http: reqwest::Client,
    config: ZohoConfig,
    token: Mutex<TokenCache>,
}

impl ZohoClient {
    pub fn new(config: ZohoConfig) -> Result<Self> {
        if config.refresh_token.is_empty() {
            return Err(Error::InvalidConfig(
                "Zoho refresh token is not set".to_string(),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            config,
            token: Mutex::new(TokenCache::new()),
        })
    }

    pub fn config(&self) -> &ZohoConfig {
        &self.config
    }

    /// Return a valid access token, refreshing it if needed.
    async fn access_token(&self) -> Result<String> {
        let mut cache = self.token.lock().await;
        if let Some(token) = cache.get(Instant::now()) {
            return Ok(token.to_string());
        }

        info!("Refreshing Zoho access token");
        let url = format!("{}/oauth/v2/token", self.config.accounts_base());
        let response = self
            .http
            .post(&url)
            .query(&[
                ("refresh_token", self.config.refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: Option<TokenResponse> = serde_json::from_str(&body).ok();
        let rejected = parsed
            .as_ref()
            .and_then(|p| p.error.as_deref())
            .is_some_and(is_oauth_rejection);

        if !status.is_success() {
            if rejected
                && matches!(
                    status,
                    StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
                )
            {
                return Err(Error::Authentication {
                    status: status.as_u16(),
                    body,
                });
            }
            return Err(Error::Api {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let parsed = parsed.ok_or_else(|| {
            Error::InvalidResponse(format!("token response is not an OAuth token: {body}"))
        })?;

        // Zoho reports a rejected refresh token as 200 with an `error` field
        let Some(access_token) = parsed.access_token else {
            if rejected {
                return Err(Error::Authentication {
                    status: status.as_u16(),
                    body: parsed.error.unwrap_or(body),
                });
            }
            return Err(Error::Api {
                url,
                status: status.as_u16(),
                body,
            });
        };

        if let Some(scope) = &parsed.scope {
            debug!("Token scope: {scope}");
        }
        let expires_in = parsed
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        cache.store(access_token.clone(), expires_in, Instant::now());
        info!("Access token refreshed");

        Ok(access_token)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_base())
            .map_err(|e| Error::InvalidConfig(format!("invalid Zoho API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig("Zoho API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON document. `None` when Zoho answers 204 No Content, which it
    /// does for empty listings.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        let token = self.access_token().await?;
        debug!("GET {url}");
        let response = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, format!("Zoho-oauthtoken {token}"))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.token.lock().await.invalidate();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(response.json::<T>().await?))
    }

    /// List one page of record ids, then fetch each record in full.
    ///
    /// The listing endpoint omits many fields, so every record is fetched
    /// individually, pausing after each burst of requests.
    async fn fetch_module_page(&self, module: &str, page: u32, per_page: u32) -> Result<RecordsPage> {
        let mut url = self.endpoint(&[module])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string())
            .append_pair("fields", "All");

        let Some(listing) = self.get_json::<DataResponse>(url).await? else {
            return Ok(RecordsPage::default());
        };

        let ids: Vec<String> = listing.data.iter().filter_map(record_id).collect();
        if !ids.is_empty() {
            debug!("Fetching full details for {} records", ids.len());
        }

        let mut records = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let url = self.endpoint(&[module, id])?;
            if let Some(detail) = self.get_json::<DataResponse>(url).await? {
                records.extend(detail.data);
            }
            let burst = self.config.detail_burst;
            if burst > 0 && (i + 1) % burst == 0 && !self.config.detail_delay.is_zero() {
                tokio::time::sleep(self.config.detail_delay).await;
            }
        }

        Ok(RecordsPage {
            records,
            more_records: listing.info.more_records,
        })
    }

    async fn fetch_users_page(&self, page: u32, per_page: u32) -> Result<RecordsPage> {
        let mut url = self.endpoint(&["users"])?;
        url.query_pairs_mut()
            .append_pair("type", "AllUsers")
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string());

        Ok(match self.get_json::<UsersResponse>(url).await? {
            Some(response) => RecordsPage {
                records: response.users,
                more_records: response.info.more_records,
            },
            None => RecordsPage::default(),
        })
    }
}

/// Zoho ids are strings, but tolerate numeric ids.
fn record_id(record: &RawRecord) -> Option<String> {
    match record.get("id")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait::async_trait]
impl CrmSource for ZohoClient {
    async fn list_modules(&self) -> Result<Vec<ModuleInfo>> {
        let url = self.endpoint(&["settings", "modules"])?;
        let modules = self
            .get_json::<ModulesResponse>(url)
            .await?
            .map(|r| r.modules)
            .unwrap_or_default();

        Ok(modules
            .into_iter()
            .filter(|m| m.api_supported)
            .map(|m| ModuleInfo {
                api_name: m.api_name,
                plural_label: m.plural_label,
            })
            .collect())
    }

    async fn module_fields(&self, module: &str) -> Result<Vec<FieldDescriptor>> {
        let mut url = self.endpoint(&["settings", "fields"])?;
        url.query_pairs_mut().append_pair("module", module);

        let fields = self
            .get_json::<FieldsResponse>(url)
            .await?
            .map(|r| r.fields)
            .unwrap_or_default();
        debug!("Found {} fields in Zoho schema for {module}", fields.len());
        Ok(fields)
    }

    async fn records_page(&self, module: &str, page: u32, per_page: u32) -> Result<RecordsPage> {
        if module == USERS_MODULE {
            self.fetch_users_page(page, per_page).await
        } else {
            self.fetch_module_page(module, page, per_page).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ZohoConfig {
        ZohoConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_region_selects_data_center() {
        let mut cfg = config();
        assert_eq!(cfg.api_base(), "https://www.zohoapis.com/crm/v8");
        assert_eq!(cfg.accounts_base(), "https://accounts.zoho.com");

        cfg.region = "eu".to_string();
        assert_eq!(cfg.api_base(), "https://www.zohoapis.eu/crm/v8");
        assert_eq!(cfg.accounts_base(), "https://accounts.zoho.eu");
    }

    #[test]
    fn test_overrides_win_over_region() {
        let cfg = ZohoConfig {
            api_url: Some("http://127.0.0.1:9000/crm/v8".to_string()),
            accounts_url: Some("http://127.0.0.1:9000".to_string()),
            ..config()
        };
        assert_eq!(cfg.api_base(), "http://127.0.0.1:9000/crm/v8");
        assert!(cfg
            .authorization_url()
            .starts_with("http://127.0.0.1:9000/oauth/v2/auth?scope=ZohoCRM.modules.ALL"));
        assert!(cfg.authorization_url().contains("client_id=client"));
    }

    #[test]
    fn test_missing_refresh_token_is_rejected() {
        let cfg = ZohoConfig {
            refresh_token: String::new(),
            ..config()
        };
        assert!(matches!(ZohoClient::new(cfg), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = ZohoClient::new(config()).unwrap();
        let url = client.endpoint(&["Deals", "123"]).unwrap();
        assert_eq!(url.as_str(), "https://www.zohoapis.com/crm/v8/Deals/123");

        let url = client.endpoint(&["Custom Module"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.zohoapis.com/crm/v8/Custom%20Module"
        );
    }

    #[test]
    fn test_record_id_accepts_strings_and_numbers() {
        let record: RawRecord = serde_json::from_str(r#"{"id": "42"}"#).unwrap();
        assert_eq!(record_id(&record), Some("42".to_string()));
        let record: RawRecord = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(record_id(&record), Some("42".to_string()));
        let record: RawRecord = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(record_id(&record), None);
    }
}
