//! Settings read once at process start and passed down by reference.
//!
//! Everything comes from a flat name → value mapping (normally the process
//! environment). Absent credentials are not errors; they select mock mode in
//! [`crate::mode`]. Only malformed values and a missing post id are fatal.
use crate::error::ConfigError;
use crate::mode::{CredentialSet, Integration};
use crate::model::PostId;
use std::time::Duration;

pub const POST_ID_VAR: &str = "LEADSYNC_POST_ID";
pub const HTTP_TIMEOUT_VAR: &str = "LEADSYNC_HTTP_TIMEOUT_SECS";
pub const SETTLE_SECS_VAR: &str = "LEADSYNC_SETTLE_SECS";
pub const AIRTABLE_TABLE_VAR: &str = "AIRTABLE_TABLE";
pub const FOLLOWUP_AGENT_VAR: &str = "PHANTOMBUSTER_FOLLOWUP_AGENT_ID";

pub const DEFAULT_AIRTABLE_TABLE: &str = "Contacts";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_SETTLE_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Raw post id from the environment; validated by [`Settings::post_id`].
    pub post_id: Option<String>,
    pub credentials: CredentialSet,
    pub airtable_table: String,
    pub followup_agent_id: Option<String>,
    /// Upper bound for every HTTP request, connect through body read.
    pub http_timeout: Duration,
    /// Pause between the commenters and likers fetch in live scraping.
    pub settle_delay: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut credentials = CredentialSet::new();
        for integration in Integration::ALL {
            for slot in integration.required_slots() {
                if let Some(value) = non_empty(slot) {
                    credentials.insert(slot, &value);
                }
            }
        }

        let http_timeout_secs =
            parse_secs(HTTP_TIMEOUT_VAR, non_empty(HTTP_TIMEOUT_VAR), DEFAULT_HTTP_TIMEOUT_SECS)?;
        if http_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: HTTP_TIMEOUT_VAR,
                reason: "must be greater than zero".to_string(),
            });
        }
        let settle_secs =
            parse_secs(SETTLE_SECS_VAR, non_empty(SETTLE_SECS_VAR), DEFAULT_SETTLE_SECS)?;

        Ok(Self {
            post_id: non_empty(POST_ID_VAR),
            credentials,
            airtable_table: non_empty(AIRTABLE_TABLE_VAR)
                .unwrap_or_else(|| DEFAULT_AIRTABLE_TABLE.to_string()),
            followup_agent_id: non_empty(FOLLOWUP_AGENT_VAR),
            http_timeout: Duration::from_secs(http_timeout_secs),
            settle_delay: Duration::from_secs(settle_secs),
        })
    }

    /// Resolve the target post, preferring an explicit override (CLI flag).
    pub fn post_id(&self, override_id: Option<&str>) -> Result<PostId, ConfigError> {
        let raw = override_id
            .or(self.post_id.as_deref())
            .ok_or(ConfigError::MissingPostId(POST_ID_VAR))?;
        PostId::parse(raw).map_err(ConfigError::InvalidPostId)
    }
}

fn parse_secs(name: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<u64>().map_err(|err| ConfigError::InvalidSetting {
            name,
            reason: format!("expected whole seconds, got {value:?} ({err})"),
        }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
