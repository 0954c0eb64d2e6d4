use clap::Parser;
use std::time::Duration;
use zoho_airtable_sync::{AirtableOpts, ModuleArgs, ModuleSelection, ZohoOpts};

#[derive(Parser)]
struct ModuleCli {
    #[command(flatten)]
    modules: ModuleArgs,
}

fn zoho_opts() -> ZohoOpts {
    ZohoOpts {
        zoho_client_id: "1000.CLIENT".to_string(),
        zoho_client_secret: "secret".to_string(),
        zoho_refresh_token: "1000.refresh".to_string(),
        zoho_region: "eu".to_string(),
        zoho_api_url: None,
        zoho_accounts_url: None,
    }
}

#[test]
fn test_zoho_opts_conversion() {
    let config: zoho_source::ZohoConfig = (&zoho_opts()).into();

    assert_eq!(config.client_id, "1000.CLIENT");
    assert_eq!(config.refresh_token, "1000.refresh");
    assert_eq!(config.api_base(), "https://www.zohoapis.eu/crm/v8");
    assert_eq!(config.accounts_base(), "https://accounts.zoho.eu");
    assert_eq!(config.detail_burst, 10);
}

#[test]
fn test_zoho_client_config_takes_detail_delay() {
    let config = zoho_opts().client_config(Duration::from_millis(250));
    assert_eq!(config.detail_delay, Duration::from_millis(250));
    assert_eq!(config.region, "eu");
}

#[test]
fn test_zoho_opts_from_args() {
    let opts = ZohoOpts::try_parse_from([
        "zoho-airtable-sync",
        "--zoho-client-id",
        "id",
        "--zoho-client-secret",
        "secret",
        "--zoho-refresh-token",
        "refresh",
        "--zoho-region",
        "in",
        "--zoho-api-url",
        "http://127.0.0.1:9000/crm/v8",
    ])
    .unwrap();

    assert_eq!(opts.zoho_region, "in");
    assert_eq!(
        opts.zoho_api_url.as_deref(),
        Some("http://127.0.0.1:9000/crm/v8")
    );
}

#[test]
fn test_airtable_opts_conversion() {
    let opts = AirtableOpts {
        airtable_token: "patXYZ".to_string(),
        airtable_base_id: "appABC".to_string(),
        airtable_api_url: airtable_sink::DEFAULT_API_URL.to_string(),
    };
    let config: airtable_sink::AirtableConfig = (&opts).into();

    assert_eq!(config.token, "patXYZ");
    assert_eq!(config.base_id, "appABC");
    assert_eq!(config.api_url, "https://api.airtable.com/v0");
}

#[test]
fn test_module_selection_flags() {
    let cli = ModuleCli::try_parse_from(["x", "--all"]).unwrap();
    assert_eq!(cli.modules.selection(), ModuleSelection::All);

    let cli = ModuleCli::try_parse_from(["x", "--module-index", "1,3"]).unwrap();
    assert_eq!(cli.modules.selection(), ModuleSelection::Indices(vec![1, 3]));

    let cli = ModuleCli::try_parse_from(["x", "--module", "Leads,Contacts"]).unwrap();
    assert_eq!(
        cli.modules.selection(),
        ModuleSelection::Names(vec!["Leads".to_string(), "Contacts".to_string()])
    );
}

#[test]
fn test_module_selection_requires_exactly_one_choice() {
    assert!(ModuleCli::try_parse_from(["x"]).is_err());
    assert!(ModuleCli::try_parse_from(["x", "--all", "--module", "Leads"]).is_err());
    assert!(ModuleCli::try_parse_from(["x", "--module-index", "one"]).is_err());
}
