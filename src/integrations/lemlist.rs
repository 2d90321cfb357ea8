//! Lemlist campaign sequencing target.
use super::{HttpClient, PublishTarget, Target};
use crate::error::IntegrationError;
use crate::mode::{CredentialSet, LEMLIST_API_KEY, LEMLIST_CAMPAIGN_ID};
use crate::model::EnrichedContact;
use crate::reconcile::Decision;
use crate::util::encode_path_segment;
use serde_json::json;

const API_BASE: &str = "https://api.lemlist.com/api";

pub struct LemlistTarget {
    http: HttpClient,
    api_key: String,
    campaign_id: String,
}

impl LemlistTarget {
    pub fn new(http: HttpClient, credentials: &CredentialSet) -> Self {
        Self {
            http,
            api_key: credentials.require(LEMLIST_API_KEY).to_string(),
            campaign_id: credentials.require(LEMLIST_CAMPAIGN_ID).to_string(),
        }
    }
}

impl PublishTarget for LemlistTarget {
    fn target(&self) -> Target {
        Target::Campaign
    }

    fn publish(
        &self,
        contact: &EnrichedContact,
        _decision: Decision,
    ) -> Result<(), IntegrationError> {
        let email = contact.fields.email.trim();
        if email.is_empty() {
            return Err(IntegrationError::Rejected(
                "lemlist leads are keyed by email and this contact has none".to_string(),
            ));
        }
        let fragment = &contact.record.fragment;
        let url = format!(
            "{API_BASE}/campaigns/{}/leads/{}",
            encode_path_segment(&self.campaign_id),
            encode_path_segment(email)
        );
        let response = self
            .http
            .agent()
            .post(url)
            .query("access_token", &self.api_key)
            .query("deduplicate", "true")
            .send_json(json!({
                "firstName": fragment.first_name,
                "lastName": fragment.last_name,
                "companyName": contact.fields.company,
                "jobTitle": contact.fields.title,
                "linkedinUrl": fragment.profile_url,
            }))
            .map_err(|err| self.http.classify(err))?;
        // Already in the campaign counts as delivered.
        if response.status().as_u16() == 409 {
            return Ok(());
        }
        self.http.check(response)?;
        Ok(())
    }
}
