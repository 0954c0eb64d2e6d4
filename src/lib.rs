//! Zoho CRM to Airtable mirror.
//!
//! Copies Zoho CRM modules into same-named Airtable tables, one way. Tables
//! and fields are created as needed with types derived from Zoho's field
//! metadata; records are appended (or the table is cleared first).
//!
//! # Crates
//!
//! - `zoho_source` - Zoho CRM client and the `CrmSource` trait
//! - `airtable_sink` - Airtable client and the `AirtableSink` trait
//! - `airtable_types` - type mapping and record conversion
//! - `sync_core` - shared data model
//!
//! # CLI Usage
//!
//! ```bash
//! # List modules with their indices
//! zoho-airtable-sync modules
//!
//! # Sync everything
//! zoho-airtable-sync sync --all
//!
//! # Sync modules 1 and 3, replacing existing records, and keep a report
//! zoho-airtable-sync sync --module-index 1,3 --clear --report-file report.json
//!
//! # See what a sync would do
//! zoho-airtable-sync sync --module Leads --dry-run
//! ```

use clap::{Args, Parser};
use std::time::Duration;

pub mod config;
pub mod reconcile;
pub mod report;
pub mod sync;
pub mod testing;

pub use sync::{ModuleSelection, Orchestrator};

#[derive(Parser, Clone)]
pub struct ZohoOpts {
    /// Zoho OAuth client id
    #[arg(long, env = "CRM_CLIENTID", hide_env_values = true)]
    pub zoho_client_id: String,

    /// Zoho OAuth client secret
    #[arg(long, env = "CRM_CLIENTSECRET", hide_env_values = true)]
    pub zoho_client_secret: String,

    /// Zoho OAuth refresh token
    #[arg(long, env = "CRM_REFRESH_TOKEN", hide_env_values = true)]
    pub zoho_refresh_token: String,

    /// Zoho data center (com, eu, in, com.au, ...)
    #[arg(long, default_value = "com", env = "ZOHO_REGION")]
    pub zoho_region: String,

    /// Zoho CRM API base URL (default: https://www.zohoapis.{region}/crm/v8)
    #[arg(long, env = "ZOHO_API_URL")]
    pub zoho_api_url: Option<String>,

    /// Zoho accounts base URL (default: https://accounts.zoho.{region})
    #[arg(long, env = "ZOHO_ACCOUNTS_URL")]
    pub zoho_accounts_url: Option<String>,
}

#[derive(Parser, Clone)]
pub struct AirtableOpts {
    /// Airtable personal access token
    #[arg(long, env = "AIRTABLE_PERSONALKEY", hide_env_values = true)]
    pub airtable_token: String,

    /// Airtable base id
    #[arg(long, env = "AIRTABLE_BASE_ID")]
    pub airtable_base_id: String,

    /// Airtable API base URL
    #[arg(
        long,
        default_value = airtable_sink::DEFAULT_API_URL,
        env = "AIRTABLE_API_URL"
    )]
    pub airtable_api_url: String,
}

/// Which modules to sync. Exactly one must be given.
#[derive(Args, Clone, Debug)]
#[group(required = true, multiple = false)]
pub struct ModuleArgs {
    /// Sync every module
    #[arg(long)]
    pub all: bool,

    /// Module indices as printed by the `modules` command (e.g. 1,3,5)
    #[arg(long, value_delimiter = ',')]
    pub module_index: Vec<usize>,

    /// Module API names (e.g. Leads,Contacts)
    #[arg(long = "module", value_delimiter = ',')]
    pub modules: Vec<String>,
}

impl ModuleArgs {
    pub fn selection(&self) -> ModuleSelection {
        if self.all {
            ModuleSelection::All
        } else if !self.module_index.is_empty() {
            ModuleSelection::Indices(self.module_index.clone())
        } else {
            ModuleSelection::Names(self.modules.clone())
        }
    }
}

// CLI type → library type conversions
impl From<&ZohoOpts> for zoho_source::ZohoConfig {
    fn from(opts: &ZohoOpts) -> Self {
        Self {
            client_id: opts.zoho_client_id.clone(),
            client_secret: opts.zoho_client_secret.clone(),
            refresh_token: opts.zoho_refresh_token.clone(),
            region: opts.zoho_region.clone(),
            api_url: opts.zoho_api_url.clone(),
            accounts_url: opts.zoho_accounts_url.clone(),
            ..Default::default()
        }
    }
}

impl From<&AirtableOpts> for airtable_sink::AirtableConfig {
    fn from(opts: &AirtableOpts) -> Self {
        Self {
            token: opts.airtable_token.clone(),
            base_id: opts.airtable_base_id.clone(),
            api_url: opts.airtable_api_url.clone(),
        }
    }
}

impl ZohoOpts {
    /// Client settings with the record detail pause taken from the sync settings.
    pub fn client_config(&self, detail_delay: Duration) -> zoho_source::ZohoConfig {
        zoho_source::ZohoConfig {
            detail_delay,
            ..self.into()
        }
    }
}
