//! Airtable table used as the system-of-record.
//!
//! Rows are matched on the `Handle` column, which holds the identity key.
//! Writes use Airtable's upsert mode merging on that same column, so a create
//! racing another writer still lands on a single row.
use super::{HttpClient, RecordStore};
use crate::error::IntegrationError;
use crate::mode::{CredentialSet, AIRTABLE_API_KEY, AIRTABLE_BASE_ID};
use crate::model::{ContactFields, IdentityKey, RecordEntry};
use crate::util::encode_path_segment;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

const API_BASE: &str = "https://api.airtable.com/v0";
const HANDLE_FIELD: &str = "Handle";

/// Airtable omits empty cells, but a `null` can still come back; read it as "".
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Column layout of the contacts table.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ContactRow {
    #[serde(rename = "Handle", deserialize_with = "null_as_empty")]
    handle: String,
    #[serde(rename = "Name", deserialize_with = "null_as_empty")]
    name: String,
    #[serde(rename = "Email", deserialize_with = "null_as_empty")]
    email: String,
    #[serde(rename = "Account", deserialize_with = "null_as_empty")]
    account: String,
    #[serde(rename = "Title", deserialize_with = "null_as_empty")]
    title: String,
    #[serde(rename = "Phone", deserialize_with = "null_as_empty")]
    phone: String,
    #[serde(rename = "LinkedIn", deserialize_with = "null_as_empty")]
    linkedin: String,
    #[serde(rename = "Company website", deserialize_with = "null_as_empty")]
    website: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    records: Vec<ListedRecord>,
}

#[derive(Debug, Deserialize)]
struct ListedRecord {
    id: String,
    fields: ContactRow,
}

pub struct AirtableStore {
    http: HttpClient,
    api_key: String,
    table_url: String,
}

impl AirtableStore {
    pub fn new(http: HttpClient, credentials: &CredentialSet, table: &str) -> Self {
        let base_id = credentials.require(AIRTABLE_BASE_ID);
        Self {
            http,
            api_key: credentials.require(AIRTABLE_API_KEY).to_string(),
            table_url: format!(
                "{API_BASE}/{}/{}",
                encode_path_segment(base_id),
                encode_path_segment(table)
            ),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

/// Airtable formula matching one handle, with quotes escaped.
fn handle_formula(key: &IdentityKey) -> String {
    let escaped = key.as_str().replace('\\', "\\\\").replace('\'', "\\'");
    format!("{{{HANDLE_FIELD}}}='{escaped}'")
}

fn entry_from_row(key: &IdentityKey, record: ListedRecord) -> RecordEntry {
    let row = record.fields;
    RecordEntry {
        key: key.clone(),
        record_id: Some(record.id),
        name: row.name,
        profile_url: row.linkedin,
        fields: ContactFields {
            email: row.email,
            company: row.account,
            title: row.title,
            phone: row.phone,
            website: row.website,
        },
    }
}

fn row_from_entry(entry: &RecordEntry) -> ContactRow {
    ContactRow {
        handle: entry.key.as_str().to_string(),
        name: entry.name.clone(),
        email: entry.fields.email.clone(),
        account: entry.fields.company.clone(),
        title: entry.fields.title.clone(),
        phone: entry.fields.phone.clone(),
        linkedin: entry.profile_url.clone(),
        website: entry.fields.website.clone(),
    }
}

impl RecordStore for AirtableStore {
    fn find(&self, key: &IdentityKey) -> Result<Option<RecordEntry>, IntegrationError> {
        let response = self
            .http
            .agent()
            .get(&self.table_url)
            .query("filterByFormula", handle_formula(key))
            .query("maxRecords", "1")
            .header("Authorization", self.bearer())
            .call()
            .map_err(|err| self.http.classify(err))?;
        let listed: ListResponse = self.http.read_json(self.http.check(response)?)?;
        Ok(listed
            .records
            .into_iter()
            .next()
            .map(|record| entry_from_row(key, record)))
    }

    fn upsert(&self, entry: &RecordEntry) -> Result<(), IntegrationError> {
        let body = json!({
            "performUpsert": { "fieldsToMergeOn": [HANDLE_FIELD] },
            "records": [{ "fields": row_from_entry(entry) }],
            "typecast": true,
        });
        let response = self
            .http
            .agent()
            .patch(&self.table_url)
            .header("Authorization", self.bearer())
            .send_json(body)
            .map_err(|err| self.http.classify(err))?;
        self.http.check(response)?;
        Ok(())
    }
}
