//! Reconciliation against the system-of-record.
//!
//! [`reconcile`] is the pure decision; [`reconcile_all`] wraps it with the
//! store lookup before and the write-back after. The run is single-threaded and
//! identity keys are unique after collection, so each key is looked up and
//! written by exactly one caller per run.
use crate::error::{ErrorKind, Stage};
use crate::integrations::RecordStore;
use crate::model::{ContactFields, EnrichedContact, RecordEntry};
use crate::pipeline::summary::RunSummary;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Create,
    Update,
    Skip,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Create => "create",
            Decision::Update => "update",
            Decision::Skip => "skip",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalized(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Tracked fields are email, company and title; phone and website never
/// force an update on their own.
fn tracked_fields_match(left: &ContactFields, right: &ContactFields) -> bool {
    normalized(&left.email) == normalized(&right.email)
        && normalized(&left.company) == normalized(&right.company)
        && normalized(&left.title) == normalized(&right.title)
}

/// Decide what to do with `contact` given its current system-of-record entry.
pub fn reconcile(contact: &EnrichedContact, existing: Option<&RecordEntry>) -> Decision {
    match existing {
        None => Decision::Create,
        Some(entry) if tracked_fields_match(&contact.fields, &entry.fields) => Decision::Skip,
        Some(_) => Decision::Update,
    }
}

/// Run the reconciliation stage. Every contact comes back with its decision.
pub fn reconcile_all(
    store: &dyn RecordStore,
    contacts: Vec<EnrichedContact>,
    summary: &mut RunSummary,
) -> Vec<(EnrichedContact, Decision)> {
    let mut decided = Vec::with_capacity(contacts.len());
    for contact in contacts {
        let existing = match store.find(contact.key()) {
            Ok(existing) => existing,
            Err(err) => {
                // Unknown state: prefer creating over silently dropping the contact.
                tracing::warn!(
                    identity_key = %contact.key(),
                    error = %err,
                    "record lookup failed, treating as new"
                );
                summary.record_error(
                    Stage::Reconcile,
                    ErrorKind::ReconciliationLookup,
                    Some(contact.key()),
                    None,
                    err.to_string(),
                );
                None
            }
        };

        let decision = reconcile(&contact, existing.as_ref());
        match decision {
            Decision::Create => summary.reconciled.created += 1,
            Decision::Update => summary.reconciled.updated += 1,
            Decision::Skip => summary.reconciled.skipped += 1,
        }
        tracing::debug!(identity_key = %contact.key(), decision = %decision, "reconciled");

        if decision != Decision::Skip {
            let entry = RecordEntry::merged(&contact, existing.as_ref());
            if let Err(err) = store.upsert(&entry) {
                tracing::warn!(
                    identity_key = %contact.key(),
                    error = %err,
                    "record write-back failed"
                );
                summary.record_error(
                    Stage::Reconcile,
                    ErrorKind::RecordWrite,
                    Some(contact.key()),
                    None,
                    err.to_string(),
                );
            }
        }
        decided.push((contact, decision));
    }
    decided
}
