//! HubSpot CRM contact upsert, keyed on email.
use super::{HttpClient, PublishTarget, Target};
use crate::error::IntegrationError;
use crate::mode::{CredentialSet, HUBSPOT_API_KEY};
use crate::model::EnrichedContact;
use crate::reconcile::Decision;
use serde_json::{json, Value};

const UPSERT_URL: &str = "https://api.hubapi.com/crm/v3/objects/contacts/batch/upsert";

pub struct HubspotTarget {
    http: HttpClient,
    token: String,
}

impl HubspotTarget {
    pub fn new(http: HttpClient, credentials: &CredentialSet) -> Self {
        Self {
            http,
            token: credentials.require(HUBSPOT_API_KEY).to_string(),
        }
    }
}

fn upsert_body(contact: &EnrichedContact, email: &str) -> Value {
    let fragment = &contact.record.fragment;
    json!({
        "inputs": [{
            "idProperty": "email",
            "id": email,
            "properties": {
                "email": email,
                "firstname": fragment.first_name,
                "lastname": fragment.last_name,
                "company": contact.fields.company,
                "jobtitle": contact.fields.title,
                "phone": contact.fields.phone,
                "website": contact.fields.website,
            }
        }]
    })
}

impl PublishTarget for HubspotTarget {
    fn target(&self) -> Target {
        Target::Crm
    }

    fn publish(
        &self,
        contact: &EnrichedContact,
        _decision: Decision,
    ) -> Result<(), IntegrationError> {
        let email = contact.fields.email.trim();
        if email.is_empty() {
            return Err(IntegrationError::Rejected(
                "hubspot upsert is keyed by email and this contact has none".to_string(),
            ));
        }
        let response = self
            .http
            .agent()
            .post(UPSERT_URL)
            .header("Authorization", format!("Bearer {}", self.token))
            .send_json(upsert_body(contact, email))
            .map_err(|err| self.http.classify(err))?;
        self.http.check(response)?;
        Ok(())
    }
}
