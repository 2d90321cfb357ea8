//! Orchestrates one pass: collect, enrich, reconcile, publish.
//!
//! Phases run strictly in order with no retries. Failures inside a stage only
//! shrink the item set; they never reorder or skip later stages. A stop request
//! is honoured between stages, never in the middle of a batch.
pub mod history;
pub mod summary;

use crate::collect::collect;
use crate::enrich::enrich_all;
use crate::error::{ErrorKind, Stage};
use crate::integrations::Integrations;
use crate::mode::ModePlan;
use crate::model::PostId;
use crate::publish::publish_all;
use crate::reconcile::reconcile_all;
use crate::signal::StopSignal;
use std::time::{Duration, Instant};
use summary::{RunPhase, RunSummary};

pub struct Pipeline<'a> {
    integrations: &'a Integrations,
    modes: &'a ModePlan,
    stop: &'a StopSignal,
}

impl<'a> Pipeline<'a> {
    pub fn new(integrations: &'a Integrations, modes: &'a ModePlan, stop: &'a StopSignal) -> Self {
        Self {
            integrations,
            modes,
            stop,
        }
    }

    /// Move to `phase` unless a stop was requested.
    fn enter(&self, summary: &mut RunSummary, phase: RunPhase) -> bool {
        if self.stop.is_requested() {
            tracing::info!(last_phase = ?summary.phase, "stop requested, finalizing partial run");
            summary.stop_requested = true;
            return false;
        }
        tracing::debug!(?phase, "entering phase");
        summary.phase = phase;
        true
    }

    /// Execute one complete run. Never fails: item and stage errors end up in
    /// the returned summary.
    pub fn run(&self, post_id: &PostId) -> RunSummary {
        let mut summary = RunSummary::start(post_id, self.modes);
        tracing::info!(post_id = %post_id, "run started");

        if !self.enter(&mut summary, RunPhase::Collecting) {
            return summary.finish();
        }
        let started = Instant::now();
        let records = collect(self.integrations.source.as_ref(), post_id, &mut summary);
        summary.record_stage_time(Stage::Collect, started.elapsed());

        if !self.enter(&mut summary, RunPhase::Enriching) {
            return summary.finish();
        }
        let started = Instant::now();
        let contacts = enrich_all(self.integrations.resolver.as_ref(), records, &mut summary);
        summary.record_stage_time(Stage::Enrich, started.elapsed());

        if !self.enter(&mut summary, RunPhase::Reconciling) {
            return summary.finish();
        }
        let started = Instant::now();
        let decided = reconcile_all(self.integrations.store.as_ref(), contacts, &mut summary);
        summary.record_stage_time(Stage::Reconcile, started.elapsed());

        if !self.enter(&mut summary, RunPhase::Publishing) {
            return summary.finish();
        }
        let started = Instant::now();
        publish_all(&self.integrations.targets, &decided, &mut summary);
        summary.record_stage_time(Stage::Publish, started.elapsed());

        match self.integrations.source.trigger_follow_up() {
            Ok(triggered) => summary.follow_up_triggered = triggered,
            Err(err) => {
                tracing::warn!(error = %err, "follow-up scrape launch failed");
                summary.record_error(
                    Stage::Collect,
                    ErrorKind::Transport,
                    None,
                    None,
                    format!("launch follow-up scrape: {err}"),
                );
            }
        }

        summary.phase = RunPhase::Done;
        let summary = summary.finish();
        tracing::info!(
            status = summary.status.as_str(),
            collected = summary.collected,
            enriched = summary.enriched,
            created = summary.reconciled.created,
            updated = summary.reconciled.updated,
            skipped = summary.reconciled.skipped,
            errors = summary.errors.len(),
            "run finished"
        );
        summary
    }

    /// Run once, or every `interval` until a stop is requested, handing each
    /// finished summary to `on_summary`.
    pub fn run_every<F>(
        &self,
        post_id: &PostId,
        interval: Option<Duration>,
        mut on_summary: F,
    ) -> anyhow::Result<()>
    where
        F: FnMut(&RunSummary) -> anyhow::Result<()>,
    {
        loop {
            let summary = self.run(post_id);
            on_summary(&summary)?;

            let Some(interval) = interval else {
                return Ok(());
            };
            if self.stop.is_requested() {
                return Ok(());
            }
            tracing::info!(wait_secs = interval.as_secs(), "waiting for next run");
            if !self.stop.sleep(interval) {
                tracing::info!("stop requested, leaving interval loop");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests;
