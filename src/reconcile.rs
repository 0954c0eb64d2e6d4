//! Bring a destination table's fields in line with the source schema.
//!
//! Airtable treats field names case-insensitively, so an existing `email`
//! field satisfies a source field named `Email`. Fields are only ever added;
//! existing fields are never renamed, retyped or removed.

use airtable_sink::AirtableSink;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use sync_core::{ConvertedRecord, TypeMap};
use tracing::{debug, info, warn};

/// Case-insensitive lookup from a source field name to the destination
/// field that holds it.
#[derive(Debug, Clone, Default)]
pub struct FieldNameCorrespondence {
    exact: HashSet<String>,
    by_lower: HashMap<String, String>,
}

impl FieldNameCorrespondence {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut correspondence = Self::default();
        for name in names {
            correspondence.insert(name.into());
        }
        correspondence
    }

    pub fn insert(&mut self, name: String) {
        self.by_lower
            .entry(name.to_lowercase())
            .or_insert_with(|| name.clone());
        self.exact.insert(name);
    }

    /// The destination field for `name`: an exact match first, then any
    /// field equal ignoring case.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.exact.contains(name) {
            return Some(name);
        }
        self.by_lower.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    /// Rename keys to their destination fields, dropping keys with none.
    pub fn map_record(&self, record: ConvertedRecord) -> ConvertedRecord {
        record
            .into_iter()
            .filter_map(|(key, value)| {
                self.resolve(&key)
                    .map(|field| (field.to_string(), value))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Fields that exist now and did not before
    pub created: Vec<String>,
    pub skipped_exact: usize,
    pub skipped_case: usize,
    /// Fields that could not be created, with the reason
    pub failed: Vec<(String, String)>,
}

/// Create every field of `desired` that `existing` lacks.
///
/// A creation rejected as a duplicate counts as created: another writer got
/// there first. Other failures are collected in [`ReconcileOutcome::failed`]
/// and the field is left out. `delay` is slept after every creation call.
pub async fn reconcile_fields<S: AirtableSink + ?Sized>(
    sink: &S,
    table_id: &str,
    existing: &[String],
    desired: &TypeMap,
    delay: Duration,
) -> ReconcileOutcome {
    let exact: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let mut known_lower: HashSet<String> = existing.iter().map(|n| n.to_lowercase()).collect();
    let mut outcome = ReconcileOutcome::default();

    for (name, spec) in desired {
        if exact.contains(name.as_str()) {
            outcome.skipped_exact += 1;
            continue;
        }
        let lower = name.to_lowercase();
        if known_lower.contains(&lower) {
            outcome.skipped_case += 1;
            continue;
        }

        // A name only becomes known once the field exists
        match sink.create_field(table_id, name, spec).await {
            Ok(()) => {
                debug!("Created field {name} as {}", spec.field_type);
                known_lower.insert(lower);
                outcome.created.push(name.clone());
            }
            Err(e) if e.is_duplicate_field() => {
                debug!("Field {name} already exists");
                known_lower.insert(lower);
                outcome.created.push(name.clone());
            }
            Err(e) => {
                warn!("Could not create field {name}: {e}");
                outcome.failed.push((name.clone(), e.to_string()));
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    if outcome.created.is_empty() && outcome.failed.is_empty() {
        info!(
            "All {} fields already exist ({} exact, {} case-insensitive)",
            desired.len(),
            outcome.skipped_exact,
            outcome.skipped_case
        );
    } else {
        info!(
            "Created {} new fields, {} already existed, {} failed",
            outcome.created.len(),
            outcome.skipped_exact + outcome.skipped_case,
            outcome.failed.len()
        );
    }
    outcome
}
