//! Report snapshots and run history.
//!
//! The report is overwritten each run; history is append-only JSONL so past
//! runs stay auditable.
use super::summary::{RunStatus, RunSummary};
use crate::integrations::Target;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HISTORY_SCHEMA_VERSION: u32 = 1;

/// One line of `history.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHistoryEntry {
    pub schema_version: u32,
    pub started_at_epoch_ms: u64,
    pub finished_at_epoch_ms: Option<u64>,
    pub post_id: String,
    pub status: RunStatus,
    pub collected: u64,
    pub enriched: u64,
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub published: BTreeMap<Target, u64>,
    pub errors: usize,
}

impl RunHistoryEntry {
    pub fn from_summary(summary: &RunSummary) -> Self {
        Self {
            schema_version: HISTORY_SCHEMA_VERSION,
            started_at_epoch_ms: summary.started_at_epoch_ms,
            finished_at_epoch_ms: summary.finished_at_epoch_ms,
            post_id: summary.post_id.to_string(),
            status: summary.status,
            collected: summary.collected,
            enriched: summary.enriched,
            created: summary.reconciled.created,
            updated: summary.reconciled.updated,
            skipped: summary.reconciled.skipped,
            published: summary.published.clone(),
            errors: summary.errors.len(),
        }
    }
}

/// `<data dir>/leadsync/history.jsonl`, falling back to the home directory.
pub fn default_history_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("no data or home directory to keep run history in"))?;
    Ok(data_dir.join("leadsync").join("history.jsonl"))
}

/// Write the latest run summary snapshot.
pub fn write_report(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(summary).context("serialize run summary")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Append a history entry as JSONL.
pub fn append_history(path: &Path, entry: &RunHistoryEntry) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let line = serde_json::to_string(entry).context("serialize run history entry")?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
