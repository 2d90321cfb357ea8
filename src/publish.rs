//! Fan-out to the downstream targets.
//!
//! Targets are attempted independently for every contact: one target failing
//! never skips or undoes the other. There is no compensation step.
use crate::error::{ErrorKind, IntegrationError, Stage};
use crate::integrations::{PublishTarget, Target};
use crate::model::EnrichedContact;
use crate::pipeline::summary::RunSummary;
use crate::reconcile::Decision;

/// Result of one contact against one target.
#[derive(Debug)]
pub struct PublishResult {
    pub target: Target,
    pub outcome: Result<(), IntegrationError>,
}

/// Publish one contact to every target. Skip decisions publish nothing.
pub fn publish(
    targets: &[Box<dyn PublishTarget>],
    contact: &EnrichedContact,
    decision: Decision,
) -> Vec<PublishResult> {
    if decision == Decision::Skip {
        return Vec::new();
    }
    targets
        .iter()
        .map(|target| PublishResult {
            target: target.target(),
            outcome: target.publish(contact, decision),
        })
        .collect()
}

/// Run the publish stage over every reconciled contact.
pub fn publish_all(
    targets: &[Box<dyn PublishTarget>],
    decided: &[(EnrichedContact, Decision)],
    summary: &mut RunSummary,
) {
    for (contact, decision) in decided {
        for result in publish(targets, contact, *decision) {
            match result.outcome {
                Ok(()) => summary.record_published(result.target),
                Err(err) => {
                    tracing::warn!(
                        identity_key = %contact.key(),
                        target_system = %result.target,
                        mode = %summary.modes.mode(result.target.integration()),
                        error = %err,
                        "publish failed"
                    );
                    summary.record_error(
                        Stage::Publish,
                        ErrorKind::Publish,
                        Some(contact.key()),
                        Some(result.target),
                        err.to_string(),
                    );
                }
            }
        }
    }
}
