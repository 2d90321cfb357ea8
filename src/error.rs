//! Error types shared by integrations and the pipeline.
//!
//! Only [`ConfigError`] is fatal. [`IntegrationError`] is what a single external
//! call can fail with; stages convert it into an [`ErrorKind`] entry on the run
//! summary instead of propagating it.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Fatal configuration problems detected before any stage starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing target post id (pass --post or set {0})")]
    MissingPostId(&'static str),

    #[error("invalid target post id: {0}")]
    InvalidPostId(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Failure of one call to an external integration.
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication rejected (HTTP {status})")]
    Auth { status: u16 },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("request rejected before sending: {0}")]
    Rejected(String),
}

/// Pipeline stage that an error entry is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Collect,
    Enrich,
    Reconcile,
    Publish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Collect => "collect",
            Stage::Enrich => "enrich",
            Stage::Reconcile => "reconcile",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error taxonomy recorded on the run summary. Config errors never get here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    NotFound,
    ReconciliationLookup,
    Publish,
    RecordWrite,
    InvalidRecord,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ReconciliationLookup => "reconciliation_lookup",
            ErrorKind::Publish => "publish",
            ErrorKind::RecordWrite => "record_write",
            ErrorKind::InvalidRecord => "invalid_record",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
