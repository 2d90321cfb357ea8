//! Collection stage: fetch engagements, key them, drop repeats.
use crate::error::{ErrorKind, Stage};
use crate::integrations::InteractionSource;
use crate::model::{InteractionRecord, PostId, RawInteraction};
use crate::pipeline::summary::RunSummary;
use std::collections::BTreeSet;

/// Result of keying and deduplicating one fetch.
#[derive(Debug, Default)]
pub struct Collected {
    pub records: Vec<InteractionRecord>,
    pub duplicates_dropped: u64,
    /// Rows whose handle normalized to an empty identity key.
    pub rejected: Vec<RawInteraction>,
}

/// Key every row and keep the first occurrence of each identity key.
pub fn key_and_dedupe(raw: Vec<RawInteraction>) -> Collected {
    let mut collected = Collected::default();
    let mut seen = BTreeSet::new();
    for row in raw {
        let Some(record) = InteractionRecord::from_raw(row.clone()) else {
            collected.rejected.push(row);
            continue;
        };
        if !seen.insert(record.key().clone()) {
            collected.duplicates_dropped += 1;
            continue;
        }
        collected.records.push(record);
    }
    collected
}

/// Run the collection stage against `source`.
///
/// A failed fetch is recorded and yields no records; the run carries on.
pub fn collect(
    source: &dyn InteractionSource,
    post_id: &PostId,
    summary: &mut RunSummary,
) -> Vec<InteractionRecord> {
    let raw = match source.fetch_interactions(post_id) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(stage = %Stage::Collect, error = %err, "engagement fetch failed");
            summary.record_error(
                Stage::Collect,
                ErrorKind::Transport,
                None,
                None,
                format!("fetch engagements for {post_id}: {err}"),
            );
            return Vec::new();
        }
    };

    let collected = key_and_dedupe(raw);
    for row in &collected.rejected {
        summary.record_error(
            Stage::Collect,
            ErrorKind::InvalidRecord,
            None,
            None,
            format!(
                "engagement by {:?} has no usable profile handle",
                row.fragment.display_name()
            ),
        );
    }
    summary.collected += collected.records.len() as u64;
    summary.duplicates_dropped += collected.duplicates_dropped;
    summary.rejected += collected.rejected.len() as u64;
    tracing::info!(
        collected = collected.records.len(),
        duplicates = collected.duplicates_dropped,
        rejected = collected.rejected.len(),
        "collection finished"
    );
    collected.records
}
