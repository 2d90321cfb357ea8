//! Dropcontact batch enrichment, one contact per request.
//!
//! The API is asynchronous: a submit returns a request id which is polled
//! until the result is ready. Polling is capped so a slow batch becomes a
//! timeout for that record instead of stalling the run.
use super::{ContactResolver, HttpClient, Resolution};
use crate::error::IntegrationError;
use crate::mode::{CredentialSet, DROPCONTACT_API_KEY};
use crate::model::{ContactFields, IdentityFragment};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const API_BASE: &str = "https://api.dropcontact.io";
const TOKEN_HEADER: &str = "X-Access-Token";
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_POLLS: u32 = 12;

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    success: bool,
    request_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<EnrichedRow>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct EnrichedRow {
    email: Vec<EmailCandidate>,
    company: Option<String>,
    job: Option<String>,
    phone: Option<String>,
    website: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailCandidate {
    email: String,
}

pub struct DropcontactResolver {
    http: HttpClient,
    api_key: String,
}

impl DropcontactResolver {
    pub fn new(http: HttpClient, credentials: &CredentialSet) -> Self {
        Self {
            http,
            api_key: credentials.require(DROPCONTACT_API_KEY).to_string(),
        }
    }

    fn submit(&self, fragment: &IdentityFragment) -> Result<String, IntegrationError> {
        let body = json!({
            "data": [{
                "first_name": fragment.first_name,
                "last_name": fragment.last_name,
                "full_name": fragment.display_name(),
                "linkedin": fragment.profile_url,
            }],
            "siren": false,
            "language": "en",
        });
        let response = self
            .http
            .agent()
            .post(format!("{API_BASE}/batch"))
            .header(TOKEN_HEADER, &self.api_key)
            .send_json(body)
            .map_err(|err| self.http.classify(err))?;
        let submitted: SubmitResponse = self.http.read_json(self.http.check(response)?)?;
        match submitted.request_id {
            Some(id) if submitted.success => Ok(id),
            _ => Err(IntegrationError::Protocol(format!(
                "batch submit refused: {}",
                submitted.reason.as_deref().unwrap_or("no reason given")
            ))),
        }
    }

    fn poll(&self, request_id: &str) -> Result<Option<EnrichedRow>, IntegrationError> {
        for attempt in 1..=MAX_POLLS {
            std::thread::sleep(POLL_INTERVAL);
            let response = self
                .http
                .agent()
                .get(format!("{API_BASE}/batch/{request_id}"))
                .header(TOKEN_HEADER, &self.api_key)
                .call()
                .map_err(|err| self.http.classify(err))?;
            let polled: PollResponse = self.http.read_json(self.http.check(response)?)?;
            if polled.success {
                return Ok(polled.data.into_iter().next());
            }
            tracing::debug!(request_id, attempt, "enrichment not ready");
        }
        Err(IntegrationError::Timeout(POLL_INTERVAL * MAX_POLLS))
    }
}

fn into_resolution(row: Option<EnrichedRow>) -> Resolution {
    let Some(row) = row else {
        return Resolution::NotFound;
    };
    let fields = ContactFields {
        email: row
            .email
            .into_iter()
            .map(|candidate| candidate.email.trim().to_string())
            .find(|email| !email.is_empty())
            .unwrap_or_default(),
        company: row.company.unwrap_or_default(),
        title: row.job.unwrap_or_default(),
        phone: row.phone.unwrap_or_default(),
        website: row.website.unwrap_or_default(),
    };
    if fields.email.is_empty() && fields.company.is_empty() && fields.title.is_empty() {
        return Resolution::NotFound;
    }
    Resolution::Found(fields)
}

impl ContactResolver for DropcontactResolver {
    fn resolve(&self, fragment: &IdentityFragment) -> Result<Resolution, IntegrationError> {
        let request_id = self.submit(fragment)?;
        let row = self.poll(&request_id)?;
        Ok(into_resolution(row))
    }
}
