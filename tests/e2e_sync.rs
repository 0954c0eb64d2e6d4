//! Full sync runs against the in-memory source and destination.

use pretty_assertions::assert_eq;
use serde_json::json;
use sync_core::{FieldDescriptor, FieldValue, PickListValue};
use tempfile::TempDir;
use zoho_airtable_sync::config::{RateLimits, SyncFileConfig, SyncSettings};
use zoho_airtable_sync::report::{DiagnosticKind, SyncReport, SyncState};
use zoho_airtable_sync::testing::{raw_record, FakeSink, FakeSource};
use zoho_airtable_sync::{ModuleSelection, Orchestrator};
use zoho_source::CrmSource;

fn crm() -> FakeSource {
    FakeSource::new()
        .with_module(
            "Leads",
            vec![
                FieldDescriptor::new("Last_Name", "text"),
                FieldDescriptor::new("Email", "email"),
                FieldDescriptor::new("Lead_Source", "picklist").with_pick_list(vec![
                    PickListValue::entry(Some("Web"), Some("Web")),
                    PickListValue::entry(Some("Referral"), None),
                ]),
                FieldDescriptor::new("Tag", "multiselectpicklist"),
            ],
            vec![
                raw_record(json!({"id": "1", "Last_Name": "Hopper", "Email": "grace@example.com", "Lead_Source": "Web", "Tag": []})),
                raw_record(json!({"id": "2", "Last_Name": "Turing", "Lead_Source": "Referral", "Tag": ["vip", "2024"]})),
            ],
        )
        .with_module(
            "Users",
            vec![
                FieldDescriptor::new("full_name", "text"),
                FieldDescriptor::new("email", "email"),
            ],
            vec![raw_record(json!({"id": "u1", "full_name": "Ada", "email": "ada@example.com", "Microsoft": false}))],
        )
}

#[tokio::test]
async fn test_sync_all_modules_and_write_report() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();

    let source = crm();
    let sink = FakeSink::new();
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("sync.yaml");
    std::fs::write(&config_path, "batch_size: 1\nfield_blacklists:\n  Leads: [Email, Tag]\n").unwrap();

    let settings = SyncFileConfig::load(&config_path)
        .unwrap()
        .apply(SyncSettings {
            delays: RateLimits::none(),
            ..Default::default()
        })
        .unwrap();

    let available = source.list_modules().await.unwrap();
    let modules = ModuleSelection::All.resolve(&available).unwrap();
    let report = Orchestrator::new(&source, &sink, settings)
        .sync_modules(&modules, false)
        .await
        .unwrap();

    assert_eq!(report.total_inserted(), 3);
    assert!(report.modules.iter().all(|m| m.state == SyncState::Done));
    assert_eq!(sink.table_names(), vec!["Leads".to_string(), "Users".to_string()]);
    assert_eq!(sink.insert_calls(), 3);

    let leads = sink.records("Leads");
    assert!(!leads[0].contains_key("Email"));
    assert!(!leads[1].contains_key("Tag"));
    assert_eq!(leads[1].get("Lead_Source"), Some(&FieldValue::text("Referral")));
    assert_eq!(sink.records("Users")[0].len(), 2);

    let report_path = dir.path().join("report.json");
    report.write_json(&report_path).await.unwrap();
    let written: SyncReport =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(written.run_id, report.run_id);
    assert_eq!(written.modules.len(), 2);
}

#[tokio::test]
async fn test_rejected_multi_select_option_is_reported() {
    let source = crm();
    let sink = FakeSink::new();
    let settings = SyncSettings {
        delays: RateLimits::none(),
        ..Default::default()
    };

    let report = Orchestrator::new(&source, &sink, settings)
        .sync_modules(&["Leads".to_string()], false)
        .await
        .unwrap();

    // Tag has no pick-list values, so only the placeholder choice exists
    let leads = report.module("Leads").unwrap();
    assert_eq!(leads.records_inserted, 0);
    assert_eq!(report.warning_counts().get(&DiagnosticKind::BatchInsert), Some(&1));
    assert!(leads.diagnostics[0].reason.contains("'vip'"));
}
