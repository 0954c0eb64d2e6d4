//! Command-line interface for zoho-airtable-sync
//!
//! # Usage Examples
//!
//! ```bash
//! # Credentials come from the environment
//! export CRM_CLIENTID=... CRM_CLIENTSECRET=... CRM_REFRESH_TOKEN=...
//! export AIRTABLE_PERSONALKEY=... AIRTABLE_BASE_ID=app...
//!
//! # List the modules available for sync
//! zoho-airtable-sync modules
//!
//! # Sync two modules, clearing their tables first
//! zoho-airtable-sync sync --module Leads,Contacts --clear
//!
//! # Sync everything with overrides from a config file
//! zoho-airtable-sync sync --all --config sync.yaml --report-file report.json
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zoho_airtable_sync::config::{SyncFileConfig, SyncSettings};
use zoho_airtable_sync::{AirtableOpts, ModuleArgs, Orchestrator, ZohoOpts};
use zoho_source::{CrmSource, ZohoClient, ZohoConfig};

#[derive(Parser)]
#[command(name = "zoho-airtable-sync")]
#[command(about = "Mirror Zoho CRM modules into Airtable tables")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the Zoho CRM modules available for sync
    Modules {
        #[command(flatten)]
        zoho: ZohoOpts,
    },

    /// Copy Zoho CRM modules into Airtable
    Sync {
        #[command(flatten)]
        zoho: ZohoOpts,

        #[command(flatten)]
        airtable: AirtableOpts,

        #[command(flatten)]
        modules: ModuleArgs,

        /// Delete existing records from each table before importing
        #[arg(long)]
        clear: bool,

        /// YAML file with blacklists, batch sizes and delays
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Write the run report as JSON to this file
        #[arg(long, value_name = "PATH")]
        report_file: Option<PathBuf>,

        /// Fetch and convert only; write nothing to Airtable
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Modules { zoho } => {
            let config: ZohoConfig = (&zoho).into();
            run_list_modules(&config)
                .await
                .inspect_err(|e| explain_auth_failure(e, &config))
        }
        Commands::Sync {
            zoho,
            airtable,
            modules,
            clear,
            config,
            report_file,
            dry_run,
        } => {
            let mut settings = SyncSettings {
                dry_run,
                ..Default::default()
            };
            if let Some(path) = &config {
                settings = SyncFileConfig::load(path)?.apply(settings)?;
            }
            let zoho_config = zoho.client_config(settings.delays.record_detail);

            run_sync(
                &zoho_config,
                &airtable,
                &modules,
                clear,
                settings,
                report_file,
            )
            .await
            .inspect_err(|e| explain_auth_failure(e, &zoho_config))
        }
    }
}

async fn run_list_modules(config: &ZohoConfig) -> anyhow::Result<()> {
    let zoho = ZohoClient::new(config.clone())?;
    let modules = zoho
        .list_modules()
        .await
        .context("Failed to list Zoho CRM modules")?;

    println!("Available modules:");
    for (i, module) in modules.iter().enumerate() {
        println!("{:>4}. {} ({})", i + 1, module.api_name, module.plural_label);
    }
    Ok(())
}

async fn run_sync(
    zoho_config: &ZohoConfig,
    airtable: &AirtableOpts,
    module_args: &ModuleArgs,
    clear: bool,
    settings: SyncSettings,
    report_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let zoho = ZohoClient::new(zoho_config.clone())?;
    let airtable = airtable_sink::AirtableClient::new(airtable.into())?;

    let selection = module_args.selection();
    let modules = match &selection {
        zoho_airtable_sync::ModuleSelection::Names(names) => names.clone(),
        _ => {
            let available = zoho
                .list_modules()
                .await
                .context("Failed to list Zoho CRM modules")?;
            selection.resolve(&available)?
        }
    };
    if modules.is_empty() {
        anyhow::bail!("No modules selected");
    }
    tracing::info!("Modules to sync: {}", modules.join(", "));
    if clear {
        tracing::warn!("Existing records in the selected tables will be deleted");
    }

    let mut orchestrator = Orchestrator::new(&zoho, &airtable, settings);
    let report = orchestrator.sync_modules(&modules, clear).await?;
    report.log_summary();

    if let Some(path) = report_file {
        report.write_json(&path).await?;
        tracing::info!("Report written to {path:?}");
    }
    Ok(())
}

/// Print how to obtain a new refresh token when Zoho rejected the current one.
fn explain_auth_failure(err: &anyhow::Error, config: &ZohoConfig) {
    let rejected = err
        .chain()
        .filter_map(|e| e.downcast_ref::<zoho_source::Error>())
        .any(zoho_source::Error::is_authentication);
    if !rejected {
        return;
    }
    eprintln!("Zoho rejected the credentials. To get a new refresh token:");
    eprintln!("  1. Open {}", config.authorization_url());
    eprintln!("  2. Approve access and copy the `code` parameter from the redirect URL");
    eprintln!(
        "  3. POST it to {}/oauth/v2/token with grant_type=authorization_code, your client id and secret",
        config.accounts_base()
    );
    eprintln!("  4. Set CRM_REFRESH_TOKEN to the refresh_token in the response");
}
