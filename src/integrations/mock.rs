//! Offline stand-ins used when an integration has no credentials.
//!
//! All data here is deterministic and visibly fake (`example` domains,
//! `mock-` handles) so it can never be mistaken for scraped leads.
use super::{
    ContactResolver, InteractionSource, PublishTarget, RecordStore, Resolution, Target,
};
use crate::error::IntegrationError;
use crate::model::{
    ContactFields, EnrichedContact, IdentityFragment, IdentityKey, InteractionKind, PostId,
    RawInteraction, RecordEntry,
};
use crate::reconcile::Decision;
use std::cell::RefCell;
use std::collections::BTreeMap;

const MOCK_PROFILE_BASE: &str = "https://linkedin.example/in";
const MOCK_EPOCH_MS: u64 = 1_700_000_000_000;
const MOCK_STEP_MS: u64 = 60_000;

const MOCK_PEOPLE: [(&str, &str, InteractionKind); 3] = [
    ("Ada", "Lovelace", InteractionKind::Comment),
    ("Alan", "Turing", InteractionKind::Comment),
    ("Grace", "Hopper", InteractionKind::Like),
];

/// Fixed three-person engagement list: two commenters and one liker.
#[derive(Debug, Default)]
pub struct MockSource;

impl MockSource {
    pub fn new() -> Self {
        Self
    }
}

impl InteractionSource for MockSource {
    fn fetch_interactions(
        &self,
        post_id: &PostId,
    ) -> Result<Vec<RawInteraction>, IntegrationError> {
        tracing::info!(post_id = %post_id, "using mock engagement data");
        let interactions = MOCK_PEOPLE
            .iter()
            .zip(0u64..)
            .map(|((first, last, kind), index)| RawInteraction {
                fragment: IdentityFragment {
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    full_name: format!("{first} {last}"),
                    profile_url: format!(
                        "{MOCK_PROFILE_BASE}/mock-{}-{}",
                        first.to_lowercase(),
                        last.to_lowercase()
                    ),
                },
                kind: *kind,
                timestamp_ms: Some(MOCK_EPOCH_MS + index * MOCK_STEP_MS),
            })
            .collect();
        Ok(interactions)
    }

    fn trigger_follow_up(&self) -> Result<bool, IntegrationError> {
        tracing::info!("simulated follow-up scrape launch");
        Ok(true)
    }
}

/// Derives placeholder contact data from the name alone.
#[derive(Debug, Default)]
pub struct MockResolver;

fn email_local_part(fragment: &IdentityFragment) -> String {
    let parts: Vec<String> = [&fragment.first_name, &fragment.last_name]
        .iter()
        .map(|part| {
            part.chars()
                .filter(|ch| ch.is_ascii_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        return "mock.lead".to_string();
    }
    parts.join(".")
}

impl ContactResolver for MockResolver {
    fn resolve(&self, fragment: &IdentityFragment) -> Result<Resolution, IntegrationError> {
        Ok(Resolution::Found(ContactFields {
            email: format!("{}@example.com", email_local_part(fragment)),
            company: "Example Ltd".to_string(),
            title: "Synthetic Lead".to_string(),
            phone: String::new(),
            website: "https://example.com".to_string(),
        }))
    }

    fn synthetic(&self) -> bool {
        true
    }
}

/// In-process system-of-record. Lives as long as the process, so repeated
/// runs in interval mode see earlier writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<IdentityKey, RecordEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_entries(entries: Vec<RecordEntry>) -> Self {
        let store = Self::new();
        for entry in entries {
            store.entries.borrow_mut().insert(entry.key.clone(), entry);
        }
        store
    }

    #[cfg(test)]
    pub fn get(&self, key: &IdentityKey) -> Option<RecordEntry> {
        self.entries.borrow().get(key).cloned()
    }
}

impl RecordStore for MemoryStore {
    fn find(&self, key: &IdentityKey) -> Result<Option<RecordEntry>, IntegrationError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn upsert(&self, entry: &RecordEntry) -> Result<(), IntegrationError> {
        let mut entries = self.entries.borrow_mut();
        let record_id = entries
            .get(&entry.key)
            .and_then(|existing| existing.record_id.clone())
            .unwrap_or_else(|| format!("mock-rec-{}", entries.len() + 1));
        let mut stored = entry.clone();
        stored.record_id = Some(record_id);
        entries.insert(entry.key.clone(), stored);
        Ok(())
    }
}

/// Accepts every publish without network I/O.
#[derive(Debug)]
pub struct MockTarget {
    target: Target,
}

impl MockTarget {
    pub fn new(target: Target) -> Self {
        Self { target }
    }
}

impl PublishTarget for MockTarget {
    fn target(&self) -> Target {
        self.target
    }

    fn publish(
        &self,
        contact: &EnrichedContact,
        decision: Decision,
    ) -> Result<(), IntegrationError> {
        tracing::debug!(
            target_system = %self.target,
            identity_key = %contact.key(),
            decision = %decision,
            "simulated publish"
        );
        Ok(())
    }
}
