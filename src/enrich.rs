//! Enrichment stage: resolve each record to contact fields.
//!
//! Records are independent. A not-found keeps the record with empty fields;
//! a transport failure drops that record only.
use crate::error::{ErrorKind, IntegrationError, Stage};
use crate::integrations::{ContactResolver, Resolution};
use crate::model::{ContactFields, EnrichedContact, EnrichmentStatus, InteractionRecord};
use crate::pipeline::summary::RunSummary;

/// Per-record result of the enrichment stage.
#[derive(Debug)]
pub enum EnrichOutcome {
    Enriched(EnrichedContact),
    /// No match upstream; the contact carries empty fields.
    Partial(EnrichedContact),
    Dropped {
        record: InteractionRecord,
        error: IntegrationError,
    },
}

pub fn enrich(resolver: &dyn ContactResolver, record: InteractionRecord) -> EnrichOutcome {
    match resolver.resolve(&record.fragment) {
        Ok(Resolution::Found(fields)) => {
            let status = if resolver.synthetic() {
                EnrichmentStatus::Synthetic
            } else {
                EnrichmentStatus::Resolved
            };
            EnrichOutcome::Enriched(EnrichedContact {
                record,
                fields,
                status,
            })
        }
        Ok(Resolution::NotFound) => EnrichOutcome::Partial(EnrichedContact {
            record,
            fields: ContactFields::default(),
            status: EnrichmentStatus::Partial,
        }),
        Err(error) => EnrichOutcome::Dropped { record, error },
    }
}

/// Run the enrichment stage over every collected record.
pub fn enrich_all(
    resolver: &dyn ContactResolver,
    records: Vec<InteractionRecord>,
    summary: &mut RunSummary,
) -> Vec<EnrichedContact> {
    let mut contacts = Vec::with_capacity(records.len());
    for record in records {
        match enrich(resolver, record) {
            EnrichOutcome::Enriched(contact) => {
                summary.enriched += 1;
                contacts.push(contact);
            }
            EnrichOutcome::Partial(contact) => {
                tracing::info!(
                    identity_key = %contact.key(),
                    "no enrichment match, keeping partial contact"
                );
                summary.enriched += 1;
                summary.partial += 1;
                summary.record_error(
                    Stage::Enrich,
                    ErrorKind::NotFound,
                    Some(contact.key()),
                    None,
                    "enrichment service has no match",
                );
                contacts.push(contact);
            }
            EnrichOutcome::Dropped { record, error } => {
                tracing::warn!(
                    identity_key = %record.key(),
                    error = %error,
                    "enrichment failed, dropping record"
                );
                summary.record_error(
                    Stage::Enrich,
                    ErrorKind::Transport,
                    Some(record.key()),
                    None,
                    error.to_string(),
                );
            }
        }
    }
    contacts
}
