//! Run summary accumulated across stages.
//!
//! Stages only ever add to the counters and the error list. The summary is
//! sealed by [`RunSummary::finish`] and read-only afterwards.
use crate::error::{ErrorKind, Stage};
use crate::integrations::Target;
use crate::mode::ModePlan;
use crate::model::{IdentityKey, PostId};
use crate::util::now_epoch_ms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Orchestrator phases, strictly linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Init,
    Collecting,
    Enriching,
    Reconciling,
    Publishing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    CompletedWithErrors,
    Incomplete,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::CompletedWithErrors => "completed_with_errors",
            RunStatus::Incomplete => "incomplete",
        }
    }
}

/// One item-level (or stage-level) failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub stage: Stage,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_key: Option<IdentityKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileCounts {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub post_id: PostId,
    pub started_at_epoch_ms: u64,
    pub finished_at_epoch_ms: Option<u64>,
    pub status: RunStatus,
    /// Last phase the orchestrator entered.
    #[serde(rename = "last_phase")]
    pub phase: RunPhase,
    pub stop_requested: bool,
    pub modes: ModePlan,
    pub collected: u64,
    pub duplicates_dropped: u64,
    pub rejected: u64,
    pub enriched: u64,
    pub partial: u64,
    pub reconciled: ReconcileCounts,
    pub published: BTreeMap<Target, u64>,
    pub follow_up_triggered: bool,
    pub stage_ms: BTreeMap<Stage, u64>,
    pub errors_by_stage: BTreeMap<Stage, u64>,
    pub errors: Vec<ErrorEntry>,
}

impl RunSummary {
    pub fn start(post_id: &PostId, modes: &ModePlan) -> Self {
        Self {
            schema_version: SUMMARY_SCHEMA_VERSION,
            post_id: post_id.clone(),
            started_at_epoch_ms: now_epoch_ms(),
            finished_at_epoch_ms: None,
            status: RunStatus::Incomplete,
            phase: RunPhase::Init,
            stop_requested: false,
            modes: modes.clone(),
            collected: 0,
            duplicates_dropped: 0,
            rejected: 0,
            enriched: 0,
            partial: 0,
            reconciled: ReconcileCounts::default(),
            published: [(Target::Campaign, 0), (Target::Crm, 0)].into_iter().collect(),
            follow_up_triggered: false,
            stage_ms: BTreeMap::new(),
            errors_by_stage: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn record_error(
        &mut self,
        stage: Stage,
        kind: ErrorKind,
        identity_key: Option<&IdentityKey>,
        target: Option<Target>,
        message: impl Into<String>,
    ) {
        *self.errors_by_stage.entry(stage).or_insert(0) += 1;
        self.errors.push(ErrorEntry {
            stage,
            kind,
            identity_key: identity_key.cloned(),
            target,
            message: message.into(),
        });
    }

    pub fn record_published(&mut self, target: Target) {
        *self.published.entry(target).or_insert(0) += 1;
    }

    pub fn record_stage_time(&mut self, stage: Stage, elapsed: Duration) {
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        *self.stage_ms.entry(stage).or_insert(0) += millis;
    }

    #[cfg(test)]
    pub fn published_to(&self, target: Target) -> u64 {
        self.published.get(&target).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn errors_of_kind(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|entry| entry.kind == kind).count()
    }

    /// Seal the summary once the orchestrator is done with it.
    pub fn finish(mut self) -> Self {
        self.finished_at_epoch_ms = Some(now_epoch_ms());
        self.status = if self.stop_requested {
            RunStatus::Incomplete
        } else if self.errors.is_empty() {
            RunStatus::Succeeded
        } else {
            RunStatus::CompletedWithErrors
        };
        self
    }

    /// Human-readable block printed at the end of a run.
    pub fn render_text(&self) -> String {
        let mut lines = Vec::new();
        lines.push(match self.status {
            RunStatus::Succeeded => "run fully succeeded".to_string(),
            RunStatus::CompletedWithErrors => {
                format!("run completed with {} item-level error(s)", self.errors.len())
            }
            RunStatus::Incomplete => format!(
                "run incomplete: stop requested (last phase {:?})",
                self.phase
            ),
        });
        lines.push(format!("post: {}", self.post_id));
        let modes: Vec<String> = self
            .modes
            .iter()
            .map(|(integration, mode)| format!("{integration}={mode}"))
            .collect();
        lines.push(format!("modes: {}", modes.join(" ")));
        lines.push(format!(
            "collected: {} (duplicates dropped {}, rejected {})",
            self.collected, self.duplicates_dropped, self.rejected
        ));
        lines.push(format!("enriched: {} (partial {})", self.enriched, self.partial));
        lines.push(format!(
            "reconciled: created {}, updated {}, skipped {}",
            self.reconciled.created, self.reconciled.updated, self.reconciled.skipped
        ));
        let published: Vec<String> = self
            .published
            .iter()
            .map(|(target, count)| format!("{target} {count}"))
            .collect();
        lines.push(format!("published: {}", published.join(", ")));
        lines.push(format!("errors: {}", self.errors.len()));
        for entry in &self.errors {
            let key = entry
                .identity_key
                .as_ref()
                .map(|key| format!(" key={key}"))
                .unwrap_or_default();
            let target = entry
                .target
                .map(|target| format!(" target={target}"))
                .unwrap_or_default();
            lines.push(format!(
                "  - [{}/{}]{key}{target}: {}",
                entry.stage, entry.kind, entry.message
            ));
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}
