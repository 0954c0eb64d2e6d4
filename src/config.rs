//! Sync settings: built-in defaults, optionally overridden by a YAML file.
//!
//! ```yaml
//! batch_size: 10
//! page_size: 200
//! field_blacklists:
//!   Users: [offset, time_zone, Microsoft, country_locale]
//!   Deals: [Tag]
//! delays:
//!   page: 500ms
//!   field: 150ms
//!   table: 1s
//! ```

mod duration;

pub use duration::parse_delay;

use airtable_sink::MAX_BATCH_SIZE;
use airtable_types::FieldBlacklist;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use zoho_source::{DEFAULT_PAGE_SIZE, USERS_MODULE};

/// Fields of the Users module that carry no useful data in Airtable.
pub const USERS_BLACKLIST: [&str; 4] = ["offset", "time_zone", "Microsoft", "country_locale"];

/// Pauses between remote calls, to stay under both services' rate limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimits {
    /// After each page of source records
    pub page: Duration,
    /// After each burst of source record detail requests
    pub record_detail: Duration,
    /// After each field creation
    pub field: Duration,
    /// After each batch insert
    pub insert: Duration,
    /// After each batch delete
    pub delete: Duration,
    /// After a table is created
    pub table: Duration,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            page: Duration::from_millis(500),
            record_detail: Duration::from_millis(500),
            field: Duration::from_millis(150),
            insert: Duration::from_millis(200),
            delete: Duration::from_millis(200),
            table: Duration::from_secs(1),
        }
    }
}

impl RateLimits {
    /// No pauses at all.
    pub fn none() -> Self {
        Self {
            page: Duration::ZERO,
            record_detail: Duration::ZERO,
            field: Duration::ZERO,
            insert: Duration::ZERO,
            delete: Duration::ZERO,
            table: Duration::ZERO,
        }
    }
}

/// Everything the orchestrator needs besides the two clients.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Records per insert or delete call
    pub batch_size: usize,
    /// Records per source page
    pub page_size: u32,
    /// Raw source field names skipped per module
    pub field_blacklists: HashMap<String, FieldBlacklist>,
    pub delays: RateLimits,
    /// Fetch and convert only; nothing is written to Airtable
    pub dry_run: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let mut field_blacklists = HashMap::new();
        field_blacklists.insert(
            USERS_MODULE.to_string(),
            USERS_BLACKLIST.iter().map(|f| f.to_string()).collect(),
        );
        Self {
            batch_size: MAX_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            field_blacklists,
            delays: RateLimits::default(),
            dry_run: false,
        }
    }
}

impl SyncSettings {
    pub fn blacklist(&self, module: &str) -> FieldBlacklist {
        self.field_blacklists
            .get(module)
            .cloned()
            .unwrap_or_default()
    }
}

/// Delay overrides as written in the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayOverrides {
    pub page: Option<String>,
    pub record_detail: Option<String>,
    pub field: Option<String>,
    pub insert: Option<String>,
    pub delete: Option<String>,
    pub table: Option<String>,
}

/// Contents of the `--config` YAML file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncFileConfig {
    /// Extra fields to skip, added to the built-in lists
    #[serde(default)]
    pub field_blacklists: HashMap<String, Vec<String>>,
    pub batch_size: Option<usize>,
    pub page_size: Option<u32>,
    #[serde(default)]
    pub delays: DelayOverrides,
}

impl SyncFileConfig {
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse sync config YAML")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sync config file: {path:?}"))?;
        Self::from_yaml(&content)
    }

    /// Apply these overrides on top of `settings`.
    pub fn apply(self, mut settings: SyncSettings) -> anyhow::Result<SyncSettings> {
        if let Some(batch_size) = self.batch_size {
            if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
                anyhow::bail!("batch_size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}");
            }
            settings.batch_size = batch_size;
        }
        if let Some(page_size) = self.page_size {
            if page_size == 0 || page_size > DEFAULT_PAGE_SIZE {
                anyhow::bail!("page_size must be between 1 and {DEFAULT_PAGE_SIZE}, got {page_size}");
            }
            settings.page_size = page_size;
        }

        for (module, fields) in self.field_blacklists {
            settings
                .field_blacklists
                .entry(module)
                .or_default()
                .extend(fields);
        }

        let delays = &mut settings.delays;
        let overrides = [
            ("page", self.delays.page, &mut delays.page),
            ("record_detail", self.delays.record_detail, &mut delays.record_detail),
            ("field", self.delays.field, &mut delays.field),
            ("insert", self.delays.insert, &mut delays.insert),
            ("delete", self.delays.delete, &mut delays.delete),
            ("table", self.delays.table, &mut delays.table),
        ];
        for (name, value, slot) in overrides {
            if let Some(value) = value {
                *slot = parse_delay(&value).with_context(|| format!("Invalid delay for {name}"))?;
            }
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = SyncSettings::default();
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.page_size, 200);
        assert_eq!(settings.delays.field, Duration::from_millis(150));
        assert!(!settings.dry_run);

        let users = settings.blacklist("Users");
        assert_eq!(users.len(), 4);
        assert!(users.contains("time_zone"));
        assert!(settings.blacklist("Leads").is_empty());
    }

    #[test]
    fn test_empty_file_changes_nothing() {
        let config = SyncFileConfig::from_yaml("{}").unwrap();
        let settings = config.apply(SyncSettings::default()).unwrap();
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.delays, RateLimits::default());
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let yaml = r#"
batch_size: 5
page_size: 50
field_blacklists:
  Users: [status]
  Deals: [Tag]
delays:
  field: 0
  table: 2s
"#;
        let settings = SyncFileConfig::from_yaml(yaml)
            .unwrap()
            .apply(SyncSettings::default())
            .unwrap();

        assert_eq!(settings.batch_size, 5);
        assert_eq!(settings.page_size, 50);
        let users = settings.blacklist("Users");
        assert!(users.contains("offset"));
        assert!(users.contains("status"));
        assert!(settings.blacklist("Deals").contains("Tag"));
        assert_eq!(settings.delays.field, Duration::ZERO);
        assert_eq!(settings.delays.table, Duration::from_secs(2));
        assert_eq!(settings.delays.insert, Duration::from_millis(200));
    }

    #[test]
    fn test_out_of_range_batch_size_is_rejected() {
        let config = SyncFileConfig::from_yaml("batch_size: 50").unwrap();
        assert!(config.apply(SyncSettings::default()).is_err());

        let config = SyncFileConfig::from_yaml("page_size: 0").unwrap();
        assert!(config.apply(SyncSettings::default()).is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(SyncFileConfig::from_yaml("batchsize: 5").is_err());
    }

    #[test]
    fn test_bad_delay_is_reported() {
        let config = SyncFileConfig::from_yaml("delays:\n  page: soon\n").unwrap();
        let err = config.apply(SyncSettings::default()).unwrap_err();
        assert!(format!("{err:#}").contains("page"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "page_size: 100").unwrap();
        let config = SyncFileConfig::load(file.path()).unwrap();
        assert_eq!(config.page_size, Some(100));

        assert!(SyncFileConfig::load(Path::new("/nonexistent/sync.yaml")).is_err());
    }
}
