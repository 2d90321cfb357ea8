//! Records that flow between pipeline stages.
//!
//! Every stage after collection joins on [`IdentityKey`]. The key is computed
//! once from the scraped profile handle and carried unchanged through
//! enrichment, reconciliation, and publishing.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Longest post identifier accepted from config or CLI.
pub const MAX_POST_ID_BYTES: usize = 512;

/// Validated identifier of the tracked post (URN, numeric id, or post URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    /// Parse a post identifier, rejecting empty, oversized, or whitespace-bearing input.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("post id must not be empty".to_string());
        }
        if trimmed.len() > MAX_POST_ID_BYTES {
            return Err(format!(
                "post id must be at most {MAX_POST_ID_BYTES} bytes (got {})",
                trimmed.len()
            ));
        }
        if trimmed
            .chars()
            .any(|ch| ch.is_whitespace() || ch.is_control())
        {
            return Err(format!(
                "post id must not contain whitespace or control characters (got {trimmed:?})"
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized platform handle; the sole join key across stages.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

fn profile_handle_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)linkedin\.[a-z.]+/in/([^/?#]+)").expect("profile handle regex is valid")
    })
}

impl IdentityKey {
    /// Derive the key from a profile URL or bare handle.
    ///
    /// Returns `None` when nothing usable remains after normalization.
    pub fn from_handle(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let handle = profile_handle_regex()
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(trimmed);
        let normalized = handle.trim().trim_matches('/').trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        Some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of engagement observed on the tracked post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Comment,
    Like,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Comment => "comment",
            InteractionKind::Like => "like",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity fragment as scraped from the platform, before enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFragment {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub profile_url: String,
}

impl IdentityFragment {
    /// Display name, falling back to first + last when no full name was scraped.
    pub fn display_name(&self) -> String {
        if !self.full_name.trim().is_empty() {
            return self.full_name.trim().to_string();
        }
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// One row as returned by a scraping source, not yet keyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInteraction {
    pub fragment: IdentityFragment,
    pub kind: InteractionKind,
    pub timestamp_ms: Option<u64>,
}

/// A keyed engagement produced by the collector. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionRecord {
    key: IdentityKey,
    pub fragment: IdentityFragment,
    pub kind: InteractionKind,
    pub timestamp_ms: Option<u64>,
}

impl InteractionRecord {
    /// Key a raw row; `None` when the handle normalizes to nothing.
    pub fn from_raw(raw: RawInteraction) -> Option<Self> {
        let key = IdentityKey::from_handle(&raw.fragment.profile_url)?;
        Some(Self {
            key,
            fragment: raw.fragment,
            kind: raw.kind,
            timestamp_ms: raw.timestamp_ms,
        })
    }

    pub fn key(&self) -> &IdentityKey {
        &self.key
    }
}

/// Contact fields resolved by enrichment. Empty strings mean "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    pub email: String,
    pub company: String,
    pub title: String,
    pub phone: String,
    pub website: String,
}

impl ContactFields {
    /// Keep `self`'s non-empty values and fill the gaps from `fallback`.
    pub fn or_fill_from(self, fallback: &ContactFields) -> Self {
        let pick = |value: String, fallback: &str| {
            if value.trim().is_empty() {
                fallback.to_string()
            } else {
                value
            }
        };
        Self {
            email: pick(self.email, &fallback.email),
            company: pick(self.company, &fallback.company),
            title: pick(self.title, &fallback.title),
            phone: pick(self.phone, &fallback.phone),
            website: pick(self.website, &fallback.website),
        }
    }
}

/// How the enrichment fields of a contact were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// Live service returned contact data.
    Resolved,
    /// Live service had no match; fields are empty.
    Partial,
    /// Mock mode derived placeholder data.
    Synthetic,
}

/// An interaction record with its enrichment attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedContact {
    pub record: InteractionRecord,
    pub fields: ContactFields,
    pub status: EnrichmentStatus,
}

impl EnrichedContact {
    pub fn key(&self) -> &IdentityKey {
        self.record.key()
    }
}

/// Row in the system-of-record table, keyed by identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub key: IdentityKey,
    /// Store-assigned id, when the entry came from the store.
    pub record_id: Option<String>,
    pub name: String,
    pub profile_url: String,
    pub fields: ContactFields,
}

impl RecordEntry {
    pub fn from_contact(contact: &EnrichedContact) -> Self {
        Self {
            key: contact.key().clone(),
            record_id: None,
            name: contact.record.fragment.display_name(),
            profile_url: contact.record.fragment.profile_url.clone(),
            fields: contact.fields.clone(),
        }
    }

    /// Entry to write back for `contact`, never blanking what `existing` holds.
    pub fn merged(contact: &EnrichedContact, existing: Option<&RecordEntry>) -> Self {
        let mut entry = Self::from_contact(contact);
        let Some(existing) = existing else {
            return entry;
        };
        entry.record_id = existing.record_id.clone();
        entry.fields = entry.fields.or_fill_from(&existing.fields);
        if entry.name.is_empty() {
            entry.name = existing.name.clone();
        }
        if entry.profile_url.trim().is_empty() {
            entry.profile_url = existing.profile_url.clone();
        }
        entry
    }
}
