//! Capability traits for every external integration, plus their live and mock
//! implementations.
//!
//! The mode resolver picks one implementation per capability at startup and
//! the orchestrator only ever sees the trait objects, so business logic never
//! branches on live vs mock.
mod airtable;
mod dropcontact;
mod hubspot;
mod http;
mod lemlist;
pub mod mock;
mod phantombuster;

use crate::config::Settings;
use crate::error::IntegrationError;
use crate::mode::{Integration, ModePlan};
use crate::model::{
    ContactFields, EnrichedContact, IdentityFragment, IdentityKey, PostId, RawInteraction,
    RecordEntry,
};
use crate::reconcile::Decision;
use crate::signal::StopSignal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use airtable::AirtableStore;
pub use dropcontact::DropcontactResolver;
pub use http::HttpClient;
pub use hubspot::HubspotTarget;
pub use lemlist::LemlistTarget;
pub use phantombuster::PhantombusterSource;

/// Scraping integration: engagements on a post.
pub trait InteractionSource {
    fn fetch_interactions(
        &self,
        post_id: &PostId,
    ) -> Result<Vec<RawInteraction>, IntegrationError>;

    /// Launch the follow-up scrape, if one is configured.
    ///
    /// Returns `Ok(false)` when there is nothing to launch.
    fn trigger_follow_up(&self) -> Result<bool, IntegrationError>;
}

/// Outcome of a successful enrichment call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ContactFields),
    NotFound,
}

/// Enrichment integration: identity fragment to contact fields.
pub trait ContactResolver {
    fn resolve(&self, fragment: &IdentityFragment) -> Result<Resolution, IntegrationError>;

    /// Whether found fields are placeholders rather than real data.
    fn synthetic(&self) -> bool {
        false
    }
}

/// System-of-record table keyed by identity key.
pub trait RecordStore {
    fn find(&self, key: &IdentityKey) -> Result<Option<RecordEntry>, IntegrationError>;
    fn upsert(&self, entry: &RecordEntry) -> Result<(), IntegrationError>;
}

/// Downstream publish destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Campaign,
    Crm,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Campaign => "campaign",
            Target::Crm => "crm",
        }
    }

    pub fn integration(&self) -> Integration {
        match self {
            Target::Campaign => Integration::Campaign,
            Target::Crm => Integration::Crm,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One downstream system that accepts reconciled contacts.
pub trait PublishTarget {
    fn target(&self) -> Target;
    fn publish(
        &self,
        contact: &EnrichedContact,
        decision: Decision,
    ) -> Result<(), IntegrationError>;
}

/// The full set of collaborators a pipeline run needs.
pub struct Integrations {
    pub source: Box<dyn InteractionSource>,
    pub resolver: Box<dyn ContactResolver>,
    pub store: Box<dyn RecordStore>,
    pub targets: Vec<Box<dyn PublishTarget>>,
}

impl Integrations {
    /// Pick live or mock for each capability according to `modes`.
    pub fn from_settings(settings: &Settings, modes: &ModePlan, stop: &StopSignal) -> Self {
        let http = HttpClient::new(settings.http_timeout);
        let credentials = &settings.credentials;

        let source: Box<dyn InteractionSource> = if modes.is_live(Integration::Scraper) {
            Box::new(PhantombusterSource::new(
                http.clone(),
                credentials,
                settings.followup_agent_id.clone(),
                settings.settle_delay,
                stop.clone(),
            ))
        } else {
            Box::new(mock::MockSource::new())
        };

        let resolver: Box<dyn ContactResolver> = if modes.is_live(Integration::Enrichment) {
            Box::new(DropcontactResolver::new(http.clone(), credentials))
        } else {
            Box::new(mock::MockResolver)
        };

        let store: Box<dyn RecordStore> = if modes.is_live(Integration::SystemOfRecord) {
            Box::new(AirtableStore::new(
                http.clone(),
                credentials,
                &settings.airtable_table,
            ))
        } else {
            Box::new(mock::MemoryStore::new())
        };

        let campaign: Box<dyn PublishTarget> = if modes.is_live(Integration::Campaign) {
            Box::new(LemlistTarget::new(http.clone(), credentials))
        } else {
            Box::new(mock::MockTarget::new(Target::Campaign))
        };

        let crm: Box<dyn PublishTarget> = if modes.is_live(Integration::Crm) {
            Box::new(HubspotTarget::new(http, credentials))
        } else {
            Box::new(mock::MockTarget::new(Target::Crm))
        };

        Self {
            source,
            resolver,
            store,
            targets: vec![campaign, crm],
        }
    }
}
