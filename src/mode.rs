//! Live/mock resolution per external integration.
//!
//! An integration runs live only when every one of its credential slots is
//! non-empty. Anything less falls back to mock for that integration alone;
//! missing credentials are an expected input, never an error.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const PHANTOMBUSTER_API_KEY: &str = "PHANTOMBUSTER_API_KEY";
pub const PHANTOMBUSTER_COMMENTERS_AGENT_ID: &str = "PHANTOMBUSTER_COMMENTERS_AGENT_ID";
pub const PHANTOMBUSTER_LIKERS_AGENT_ID: &str = "PHANTOMBUSTER_LIKERS_AGENT_ID";
pub const DROPCONTACT_API_KEY: &str = "DROPCONTACT_API_KEY";
pub const AIRTABLE_API_KEY: &str = "AIRTABLE_API_KEY";
pub const AIRTABLE_BASE_ID: &str = "AIRTABLE_BASE_ID";
pub const LEMLIST_API_KEY: &str = "LEMLIST_API_KEY";
pub const LEMLIST_CAMPAIGN_ID: &str = "LEMLIST_CAMPAIGN_ID";
pub const HUBSPOT_API_KEY: &str = "HUBSPOT_API_KEY";

/// External integrations the pipeline depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integration {
    Scraper,
    Enrichment,
    SystemOfRecord,
    Campaign,
    Crm,
}

impl Integration {
    pub const ALL: [Integration; 5] = [
        Integration::Scraper,
        Integration::Enrichment,
        Integration::SystemOfRecord,
        Integration::Campaign,
        Integration::Crm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Integration::Scraper => "scraper",
            Integration::Enrichment => "enrichment",
            Integration::SystemOfRecord => "system_of_record",
            Integration::Campaign => "campaign",
            Integration::Crm => "crm",
        }
    }

    /// Vendor behind the integration, for logs and summaries.
    pub fn service(&self) -> &'static str {
        match self {
            Integration::Scraper => "phantombuster",
            Integration::Enrichment => "dropcontact",
            Integration::SystemOfRecord => "airtable",
            Integration::Campaign => "lemlist",
            Integration::Crm => "hubspot",
        }
    }

    /// Credential slots that must all be set for live mode.
    pub fn required_slots(&self) -> &'static [&'static str] {
        match self {
            Integration::Scraper => &[
                PHANTOMBUSTER_API_KEY,
                PHANTOMBUSTER_COMMENTERS_AGENT_ID,
                PHANTOMBUSTER_LIKERS_AGENT_ID,
            ],
            Integration::Enrichment => &[DROPCONTACT_API_KEY],
            Integration::SystemOfRecord => &[AIRTABLE_API_KEY, AIRTABLE_BASE_ID],
            Integration::Campaign => &[LEMLIST_API_KEY, LEMLIST_CAMPAIGN_ID],
            Integration::Crm => &[HUBSPOT_API_KEY],
        }
    }
}

impl fmt::Display for Integration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Live,
    Mock,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Live => "live",
            Mode::Mock => "mock",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named credential slots, as read from the environment.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    slots: BTreeMap<String, String>,
}

impl CredentialSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.slots.insert(name.to_string(), value.trim().to_string());
    }

    /// Slot value, or `None` when absent or blank.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.slots
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Value of a slot that mode resolution already proved present.
    pub fn require(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }
}

/// Resolved mode for every integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModePlan {
    modes: BTreeMap<Integration, Mode>,
}

impl ModePlan {
    /// Every integration in mock mode, regardless of credentials.
    pub fn all_mock() -> Self {
        Self {
            modes: Integration::ALL
                .iter()
                .map(|integration| (*integration, Mode::Mock))
                .collect(),
        }
    }

    pub fn mode(&self, integration: Integration) -> Mode {
        self.modes
            .get(&integration)
            .copied()
            .unwrap_or(Mode::Mock)
    }

    pub fn is_live(&self, integration: Integration) -> bool {
        self.mode(integration) == Mode::Live
    }

    pub fn iter(&self) -> impl Iterator<Item = (Integration, Mode)> + '_ {
        self.modes.iter().map(|(integration, mode)| (*integration, *mode))
    }
}

/// Decide live vs mock for each integration from credential presence.
pub fn resolve_modes(credentials: &CredentialSet) -> ModePlan {
    let modes = Integration::ALL
        .iter()
        .map(|integration| {
            let live = integration
                .required_slots()
                .iter()
                .all(|slot| credentials.get(slot).is_some());
            let mode = if live { Mode::Live } else { Mode::Mock };
            (*integration, mode)
        })
        .collect();
    ModePlan { modes }
}
