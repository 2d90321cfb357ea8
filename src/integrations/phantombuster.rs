//! Phantombuster scraping agents (post commenters and post likers).
//!
//! Each agent stores its latest result set as `result.json` in its S3 folder.
//! We look the folder up through the agents API, download the rows, and keep
//! those that reference the tracked post.
use super::{HttpClient, InteractionSource};
use crate::error::IntegrationError;
use crate::mode::{
    CredentialSet, PHANTOMBUSTER_API_KEY, PHANTOMBUSTER_COMMENTERS_AGENT_ID,
    PHANTOMBUSTER_LIKERS_AGENT_ID,
};
use crate::model::{IdentityFragment, InteractionKind, PostId, RawInteraction};
use crate::signal::StopSignal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const API_BASE: &str = "https://api.phantombuster.com/api/v2";
const RESULTS_BASE: &str = "https://phantombuster.s3.amazonaws.com";
const KEY_HEADER: &str = "X-Phantombuster-Key";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentInfo {
    s3_folder: Option<String>,
    org_s3_folder: Option<String>,
}

/// One row of an agent's `result.json`. Field names vary by phantom, hence the
/// aliases; any field may be missing or `null`.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ResultRow {
    first_name: Option<String>,
    last_name: Option<String>,
    full_name: Option<String>,
    #[serde(alias = "linkedinProfileUrl")]
    profile_url: Option<String>,
    post_url: Option<String>,
    #[serde(alias = "commentDate", alias = "likeDate")]
    timestamp: Option<Value>,
}

pub struct PhantombusterSource {
    http: HttpClient,
    api_key: String,
    commenters_agent: String,
    likers_agent: String,
    followup_agent: Option<String>,
    settle_delay: Duration,
    stop: StopSignal,
}

impl PhantombusterSource {
    pub fn new(
        http: HttpClient,
        credentials: &CredentialSet,
        followup_agent: Option<String>,
        settle_delay: Duration,
        stop: StopSignal,
    ) -> Self {
        Self {
            http,
            api_key: credentials.require(PHANTOMBUSTER_API_KEY).to_string(),
            commenters_agent: credentials
                .require(PHANTOMBUSTER_COMMENTERS_AGENT_ID)
                .to_string(),
            likers_agent: credentials.require(PHANTOMBUSTER_LIKERS_AGENT_ID).to_string(),
            followup_agent,
            settle_delay,
            stop,
        }
    }

    fn fetch_agent_rows(&self, agent_id: &str) -> Result<Vec<ResultRow>, IntegrationError> {
        let response = self
            .http
            .agent()
            .get(format!("{API_BASE}/agents/fetch"))
            .query("id", agent_id)
            .header(KEY_HEADER, &self.api_key)
            .call()
            .map_err(|err| self.http.classify(err))?;
        let info: AgentInfo = self.http.read_json(self.http.check(response)?)?;
        let (Some(org_folder), Some(folder)) = (info.org_s3_folder, info.s3_folder) else {
            return Err(IntegrationError::Protocol(format!(
                "agent {agent_id} has no result folder yet"
            )));
        };

        let response = self
            .http
            .agent()
            .get(format!("{RESULTS_BASE}/{org_folder}/{folder}/result.json"))
            .call()
            .map_err(|err| self.http.classify(err))?;
        if response.status().as_u16() == 404 {
            tracing::info!(agent_id, "agent has not produced results yet");
            return Ok(Vec::new());
        }
        self.http.read_json(self.http.check(response)?)
    }
}

fn into_interaction(row: ResultRow, kind: InteractionKind) -> RawInteraction {
    RawInteraction {
        timestamp_ms: row.timestamp.as_ref().and_then(timestamp_ms_from_value),
        fragment: IdentityFragment {
            first_name: row.first_name.unwrap_or_default(),
            last_name: row.last_name.unwrap_or_default(),
            full_name: row.full_name.unwrap_or_default(),
            profile_url: row.profile_url.unwrap_or_default(),
        },
        kind,
    }
}

/// Rows without a post URL are assumed to belong to the configured post.
fn row_matches_post(row: &ResultRow, post_id: &PostId) -> bool {
    match row.post_url.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(url) => url.contains(post_id.as_str()),
    }
}

fn timestamp_ms_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().and_then(epoch_to_ms),
        Value::String(text) => text.trim().parse::<u64>().ok().and_then(epoch_to_ms),
        _ => None,
    }
}

/// Accepts epoch milliseconds or epoch seconds.
fn epoch_to_ms(value: u64) -> Option<u64> {
    // Ten digits or fewer is seconds until the year 2286.
    if value < 10_000_000_000 {
        return value.checked_mul(1000);
    }
    Some(value)
}

impl InteractionSource for PhantombusterSource {
    fn fetch_interactions(
        &self,
        post_id: &PostId,
    ) -> Result<Vec<RawInteraction>, IntegrationError> {
        let mut interactions = Vec::new();
        let plan = [
            (&self.commenters_agent, InteractionKind::Comment),
            (&self.likers_agent, InteractionKind::Like),
        ];
        for (index, (agent_id, kind)) in plan.into_iter().enumerate() {
            if index > 0 && !self.settle_delay.is_zero() {
                tracing::info!(
                    settle_secs = self.settle_delay.as_secs(),
                    "waiting for scraping agents to settle"
                );
                if !self.stop.sleep(self.settle_delay) {
                    tracing::info!("settle wait interrupted by stop request");
                    break;
                }
            }
            let rows = self.fetch_agent_rows(agent_id)?;
            let before = interactions.len();
            interactions.extend(
                rows.into_iter()
                    .filter(|row| row_matches_post(row, post_id))
                    .map(|row| into_interaction(row, kind)),
            );
            tracing::info!(
                agent_id = %agent_id,
                kind = %kind,
                rows = interactions.len() - before,
                "fetched engagements"
            );
        }
        Ok(interactions)
    }

    fn trigger_follow_up(&self) -> Result<bool, IntegrationError> {
        let Some(agent_id) = self.followup_agent.as_deref() else {
            return Ok(false);
        };
        let response = self
            .http
            .agent()
            .post(format!("{API_BASE}/agents/launch"))
            .header(KEY_HEADER, &self.api_key)
            .send_json(json!({ "id": agent_id }))
            .map_err(|err| self.http.classify(err))?;
        self.http.check(response)?;
        tracing::info!(agent_id, "launched follow-up scrape");
        Ok(true)
    }
}
