use super::summary::RunStatus;
use super::*;
use crate::collect::collect;
use crate::enrich::enrich_all;
use crate::error::IntegrationError;
use crate::integrations::mock::{MemoryStore, MockResolver, MockSource, MockTarget};
use crate::integrations::{
    ContactResolver, HttpClient, HubspotTarget, InteractionSource, LemlistTarget, PublishTarget,
    RecordStore, Resolution, Target,
};
use crate::mode::{CredentialSet, ModePlan};
use crate::model::{
    ContactFields, EnrichedContact, IdentityFragment, IdentityKey, InteractionKind, PostId,
    RawInteraction, RecordEntry,
};
use crate::reconcile::Decision;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

fn post() -> PostId {
    PostId::parse("post-123").expect("post id")
}

fn key(handle: &str) -> IdentityKey {
    IdentityKey::from_handle(handle).expect("key")
}

fn person(handle: &str, kind: InteractionKind) -> RawInteraction {
    RawInteraction {
        fragment: IdentityFragment {
            first_name: handle.to_string(),
            last_name: "Tester".to_string(),
            full_name: String::new(),
            profile_url: format!("https://www.linkedin.com/in/{handle}"),
        },
        kind,
        timestamp_ms: Some(1_700_000_000_000),
    }
}

struct ScriptedSource {
    rows: Result<Vec<RawInteraction>, String>,
    stop_on_fetch: Option<StopSignal>,
}

impl ScriptedSource {
    fn rows(rows: Vec<RawInteraction>) -> Self {
        Self {
            rows: Ok(rows),
            stop_on_fetch: None,
        }
    }
}

impl InteractionSource for ScriptedSource {
    fn fetch_interactions(
        &self,
        _post_id: &PostId,
    ) -> Result<Vec<RawInteraction>, IntegrationError> {
        if let Some(stop) = &self.stop_on_fetch {
            stop.request();
        }
        self.rows.clone().map_err(IntegrationError::Transport)
    }

    fn trigger_follow_up(&self) -> Result<bool, IntegrationError> {
        Ok(false)
    }
}

/// Resolves everyone except the configured handles, like a live service.
#[derive(Default)]
struct ScriptedResolver {
    not_found: BTreeSet<String>,
    failing: BTreeSet<String>,
}

impl ContactResolver for ScriptedResolver {
    fn resolve(&self, fragment: &IdentityFragment) -> Result<Resolution, IntegrationError> {
        let handle = fragment.first_name.as_str();
        if self.failing.contains(handle) {
            return Err(IntegrationError::Timeout(std::time::Duration::from_secs(20)));
        }
        if self.not_found.contains(handle) {
            return Ok(Resolution::NotFound);
        }
        Ok(Resolution::Found(ContactFields {
            email: format!("{handle}@corp.test"),
            company: "Corp".to_string(),
            title: "Engineer".to_string(),
            phone: String::new(),
            website: String::new(),
        }))
    }
}

/// Store whose lookups fail for selected keys.
struct FlakyStore {
    inner: Rc<MemoryStore>,
    failing_lookups: BTreeSet<IdentityKey>,
}

impl RecordStore for FlakyStore {
    fn find(&self, key: &IdentityKey) -> Result<Option<RecordEntry>, IntegrationError> {
        if self.failing_lookups.contains(key) {
            return Err(IntegrationError::Transport("connection reset".to_string()));
        }
        self.inner.find(key)
    }

    fn upsert(&self, entry: &RecordEntry) -> Result<(), IntegrationError> {
        self.inner.upsert(entry)
    }
}

impl RecordStore for Rc<MemoryStore> {
    fn find(&self, key: &IdentityKey) -> Result<Option<RecordEntry>, IntegrationError> {
        (**self).find(key)
    }

    fn upsert(&self, entry: &RecordEntry) -> Result<(), IntegrationError> {
        (**self).upsert(entry)
    }
}

/// Target that remembers every attempt and optionally fails all of them.
struct RecordingTarget {
    target: Target,
    fail: bool,
    attempts: Rc<RefCell<Vec<IdentityKey>>>,
}

impl RecordingTarget {
    fn new(target: Target, fail: bool) -> (Self, Rc<RefCell<Vec<IdentityKey>>>) {
        let attempts = Rc::new(RefCell::new(Vec::new()));
        let recorder = Self {
            target,
            fail,
            attempts: Rc::clone(&attempts),
        };
        (recorder, attempts)
    }
}

impl PublishTarget for RecordingTarget {
    fn target(&self) -> Target {
        self.target
    }

    fn publish(
        &self,
        contact: &EnrichedContact,
        _decision: Decision,
    ) -> Result<(), IntegrationError> {
        self.attempts.borrow_mut().push(contact.key().clone());
        if self.fail {
            return Err(IntegrationError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn mock_integrations() -> Integrations {
    Integrations {
        source: Box::new(MockSource::new()),
        resolver: Box::new(MockResolver),
        store: Box::new(MemoryStore::new()),
        targets: vec![
            Box::new(MockTarget::new(Target::Campaign)),
            Box::new(MockTarget::new(Target::Crm)),
        ],
    }
}

fn run(integrations: &Integrations) -> RunSummary {
    let modes = ModePlan::all_mock();
    let stop = StopSignal::new();
    Pipeline::new(integrations, &modes, &stop).run(&post())
}

#[test]
fn mock_run_creates_and_publishes_every_synthetic_lead() {
    let summary = run(&mock_integrations());
    assert_eq!(summary.status, RunStatus::Succeeded);
    assert_eq!(summary.phase, RunPhase::Done);
    assert_eq!(summary.collected, 3);
    assert_eq!(summary.enriched, 3);
    assert_eq!(summary.reconciled.created, 3);
    assert_eq!(summary.reconciled.updated, 0);
    assert_eq!(summary.reconciled.skipped, 0);
    assert_eq!(summary.published_to(Target::Campaign), 3);
    assert_eq!(summary.published_to(Target::Crm), 3);
    assert!(summary.errors.is_empty());
    assert!(summary.follow_up_triggered);
}

#[test]
fn mock_mode_is_deterministic_across_runs() {
    let source = MockSource::new();
    let first_summary = &mut RunSummary::start(&post(), &ModePlan::all_mock());
    let first_records = collect(&source, &post(), first_summary);
    let first_contacts = enrich_all(&MockResolver, first_records.clone(), first_summary);

    let second_summary = &mut RunSummary::start(&post(), &ModePlan::all_mock());
    let second_records = collect(&MockSource::new(), &post(), second_summary);
    let second_contacts = enrich_all(&MockResolver, second_records.clone(), second_summary);

    assert_eq!(first_records, second_records);
    assert_eq!(first_contacts, second_contacts);
    assert_eq!(
        serde_json::to_string(&first_contacts).expect("json"),
        serde_json::to_string(&second_contacts).expect("json")
    );
}

#[test]
fn second_run_against_same_store_skips_everything() {
    let integrations = mock_integrations();
    let first = run(&integrations);
    assert_eq!(first.reconciled.created, 3);

    let second = run(&integrations);
    assert_eq!(second.status, RunStatus::Succeeded);
    assert_eq!(second.reconciled.created, 0);
    assert_eq!(second.reconciled.skipped, 3);
    assert_eq!(second.published_to(Target::Campaign), 0);
    assert_eq!(second.published_to(Target::Crm), 0);
}

#[test]
fn not_found_keeps_partial_contact_in_the_pipeline() {
    let handles = ["ada", "alan", "grace", "edsger", "barbara"];
    let resolver = ScriptedResolver {
        not_found: ["grace".to_string()].into_iter().collect(),
        ..ScriptedResolver::default()
    };
    let integrations = Integrations {
        source: Box::new(ScriptedSource::rows(
            handles
                .iter()
                .map(|h| person(h, InteractionKind::Comment))
                .collect(),
        )),
        resolver: Box::new(resolver),
        store: Box::new(MemoryStore::new()),
        targets: vec![
            Box::new(MockTarget::new(Target::Campaign)),
            Box::new(MockTarget::new(Target::Crm)),
        ],
    };
    let summary = run(&integrations);
    assert_eq!(summary.collected, 5);
    assert_eq!(summary.enriched, 5);
    assert_eq!(summary.partial, 1);
    assert_eq!(summary.reconciled.created, 5);
    assert_eq!(summary.published_to(Target::Crm), 5);
    assert_eq!(summary.errors.len(), 1);
    let entry = &summary.errors[0];
    assert_eq!(entry.kind, ErrorKind::NotFound);
    assert_eq!(entry.stage, Stage::Enrich);
    assert_eq!(entry.identity_key, Some(key("grace")));
    assert_eq!(summary.status, RunStatus::CompletedWithErrors);
}

#[test]
fn lookup_failure_falls_back_to_create() {
    let store = Rc::new(MemoryStore::with_entries(vec![RecordEntry {
        key: key("mock-ada-lovelace"),
        record_id: Some("rec-existing".to_string()),
        name: "Ada Lovelace".to_string(),
        profile_url: String::new(),
        fields: ContactFields::default(),
    }]));
    let integrations = Integrations {
        store: Box::new(FlakyStore {
            inner: Rc::clone(&store),
            failing_lookups: [key("mock-ada-lovelace")].into_iter().collect(),
        }),
        ..mock_integrations()
    };
    let summary = run(&integrations);
    assert_eq!(summary.reconciled.created, 3);
    assert_eq!(summary.errors_of_kind(ErrorKind::ReconciliationLookup), 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].identity_key, Some(key("mock-ada-lovelace")));
    assert_eq!(summary.published_to(Target::Campaign), 3);
}

#[test]
fn failing_target_does_not_block_the_other() {
    let (campaign, campaign_attempts) = RecordingTarget::new(Target::Campaign, true);
    let (crm, crm_attempts) = RecordingTarget::new(Target::Crm, false);
    let integrations = Integrations {
        targets: vec![Box::new(campaign), Box::new(crm)],
        ..mock_integrations()
    };
    let summary = run(&integrations);
    assert_eq!(campaign_attempts.borrow().len(), 3);
    assert_eq!(crm_attempts.borrow().len(), 3);
    assert_eq!(summary.published_to(Target::Campaign), 0);
    assert_eq!(summary.published_to(Target::Crm), 3);
    assert_eq!(summary.errors_of_kind(ErrorKind::Publish), 3);
    assert!(summary
        .errors
        .iter()
        .all(|entry| entry.target == Some(Target::Campaign)));
    assert_eq!(summary.phase, RunPhase::Done);
}

#[test]
fn one_enrichment_failure_does_not_reduce_the_rest() {
    let resolver = ScriptedResolver {
        failing: ["alan".to_string()].into_iter().collect(),
        ..ScriptedResolver::default()
    };
    let integrations = Integrations {
        source: Box::new(ScriptedSource::rows(vec![
            person("ada", InteractionKind::Comment),
            person("alan", InteractionKind::Comment),
            person("grace", InteractionKind::Like),
        ])),
        resolver: Box::new(resolver),
        ..mock_integrations()
    };
    let summary = run(&integrations);
    assert_eq!(summary.collected, 3);
    assert_eq!(summary.enriched, 2);
    assert_eq!(summary.reconciled.created, 2);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].kind, ErrorKind::Transport);
    assert_eq!(summary.errors[0].identity_key, Some(key("alan")));
}

#[test]
fn collection_failure_still_reaches_done() {
    let integrations = Integrations {
        source: Box::new(ScriptedSource {
            rows: Err("401 from scraper".to_string()),
            stop_on_fetch: None,
        }),
        ..mock_integrations()
    };
    let summary = run(&integrations);
    assert_eq!(summary.phase, RunPhase::Done);
    assert_eq!(summary.status, RunStatus::CompletedWithErrors);
    assert_eq!(summary.collected, 0);
    assert_eq!(summary.errors_by_stage.get(&Stage::Collect), Some(&1));
}

#[test]
fn identity_keys_survive_every_stage_unchanged() {
    let store = Rc::new(MemoryStore::new());
    let (crm, crm_attempts) = RecordingTarget::new(Target::Crm, false);
    let integrations = Integrations {
        source: Box::new(ScriptedSource::rows(vec![
            person("Ada-L", InteractionKind::Comment),
            person("ALAN", InteractionKind::Like),
        ])),
        resolver: Box::new(ScriptedResolver::default()),
        store: Box::new(Rc::clone(&store)),
        targets: vec![Box::new(crm)],
    };
    let summary_seed = &mut RunSummary::start(&post(), &ModePlan::all_mock());
    let collected: Vec<IdentityKey> = collect(integrations.source.as_ref(), &post(), summary_seed)
        .iter()
        .map(|record| record.key().clone())
        .collect();

    run(&integrations);
    assert_eq!(collected, vec![key("ada-l"), key("alan")]);
    assert_eq!(*crm_attempts.borrow(), collected);
    for k in &collected {
        assert_eq!(store.get(k).map(|entry| entry.key), Some(k.clone()));
    }
}

#[test]
fn matching_entries_are_skipped_and_not_published() {
    let store = MemoryStore::new();
    let seed_summary = &mut RunSummary::start(&post(), &ModePlan::all_mock());
    let records = collect(&MockSource::new(), &post(), seed_summary);
    for contact in enrich_all(&MockResolver, records, seed_summary) {
        store
            .upsert(&RecordEntry::from_contact(&contact))
            .expect("seed");
    }
    let (campaign, attempts) = RecordingTarget::new(Target::Campaign, false);
    let integrations = Integrations {
        store: Box::new(store),
        targets: vec![Box::new(campaign)],
        ..mock_integrations()
    };
    let summary = run(&integrations);
    assert_eq!(summary.reconciled.skipped, 3);
    assert!(attempts.borrow().is_empty());
}

#[test]
fn changed_fields_update_and_keep_record_id() {
    let store = Rc::new(MemoryStore::with_entries(vec![RecordEntry {
        key: key("mock-grace-hopper"),
        record_id: Some("rec-grace".to_string()),
        name: "Grace Hopper".to_string(),
        profile_url: String::new(),
        fields: ContactFields {
            email: "grace.hopper@example.com".to_string(),
            company: "US Navy".to_string(),
            title: "Rear Admiral".to_string(),
            phone: String::new(),
            website: String::new(),
        },
    }]));
    let integrations = Integrations {
        store: Box::new(Rc::clone(&store)),
        ..mock_integrations()
    };
    let summary = run(&integrations);
    assert_eq!(summary.reconciled.updated, 1);
    assert_eq!(summary.reconciled.created, 2);
    let stored = store.get(&key("mock-grace-hopper")).expect("stored");
    assert_eq!(stored.record_id.as_deref(), Some("rec-grace"));
    assert_eq!(stored.fields.company, "Example Ltd");
}

#[test]
fn stop_before_start_yields_incomplete_summary() {
    let integrations = mock_integrations();
    let modes = ModePlan::all_mock();
    let stop = StopSignal::new();
    stop.request();
    let summary = Pipeline::new(&integrations, &modes, &stop).run(&post());
    assert_eq!(summary.status, RunStatus::Incomplete);
    assert_eq!(summary.phase, RunPhase::Init);
    assert_eq!(summary.collected, 0);
    assert!(summary.finished_at_epoch_ms.is_some());
}

#[test]
fn stop_during_collection_keeps_partial_counts() {
    let stop = StopSignal::new();
    let integrations = Integrations {
        source: Box::new(ScriptedSource {
            rows: Ok(vec![
                person("ada", InteractionKind::Comment),
                person("alan", InteractionKind::Like),
            ]),
            stop_on_fetch: Some(stop.clone()),
        }),
        ..mock_integrations()
    };
    let modes = ModePlan::all_mock();
    let summary = Pipeline::new(&integrations, &modes, &stop).run(&post());
    assert_eq!(summary.status, RunStatus::Incomplete);
    assert_eq!(summary.phase, RunPhase::Collecting);
    assert!(summary.stop_requested);
    assert_eq!(summary.collected, 2);
    assert_eq!(summary.enriched, 0);
}

#[test]
fn not_found_never_blanks_an_existing_record() {
    let store = Rc::new(MemoryStore::with_entries(vec![RecordEntry {
        key: key("grace"),
        record_id: Some("rec-grace".to_string()),
        name: "Grace Hopper".to_string(),
        profile_url: "https://www.linkedin.com/in/grace".to_string(),
        fields: ContactFields {
            email: "grace@navy.mil".to_string(),
            company: "US Navy".to_string(),
            title: "Rear Admiral".to_string(),
            phone: "+1 555".to_string(),
            website: String::new(),
        },
    }]));
    let integrations = Integrations {
        source: Box::new(ScriptedSource::rows(vec![person("grace", InteractionKind::Like)])),
        resolver: Box::new(ScriptedResolver {
            not_found: ["grace".to_string()].into_iter().collect(),
            ..ScriptedResolver::default()
        }),
        store: Box::new(Rc::clone(&store)),
        ..mock_integrations()
    };
    let summary = run(&integrations);
    assert_eq!(summary.reconciled.updated, 1);
    let stored = store.get(&key("grace")).expect("stored");
    assert_eq!(stored.record_id.as_deref(), Some("rec-grace"));
    assert_eq!(stored.fields.email, "grace@navy.mil");
    assert_eq!(stored.fields.company, "US Navy");
    assert_eq!(stored.fields.title, "Rear Admiral");
    assert_eq!(stored.fields.phone, "+1 555");
}

#[test]
fn live_targets_reject_partial_contacts_without_email() {
    let http = HttpClient::new(std::time::Duration::from_secs(1));
    let credentials = CredentialSet::new();
    let integrations = Integrations {
        source: Box::new(ScriptedSource::rows(vec![person("grace", InteractionKind::Like)])),
        resolver: Box::new(ScriptedResolver {
            not_found: ["grace".to_string()].into_iter().collect(),
            ..ScriptedResolver::default()
        }),
        targets: vec![
            Box::new(LemlistTarget::new(http.clone(), &credentials)),
            Box::new(HubspotTarget::new(http, &credentials)),
        ],
        ..mock_integrations()
    };
    let summary = run(&integrations);
    assert_eq!(summary.partial, 1);
    assert_eq!(summary.reconciled.created, 1);
    assert_eq!(summary.published_to(Target::Campaign), 0);
    assert_eq!(summary.published_to(Target::Crm), 0);
    assert_eq!(summary.errors_of_kind(ErrorKind::NotFound), 1);
    assert_eq!(summary.errors_of_kind(ErrorKind::Publish), 2);
    assert_eq!(summary.errors.len(), 3);
    let targets: Vec<Option<Target>> = summary
        .errors
        .iter()
        .filter(|entry| entry.kind == ErrorKind::Publish)
        .map(|entry| entry.target)
        .collect();
    assert_eq!(targets, vec![Some(Target::Campaign), Some(Target::Crm)]);
    assert_eq!(summary.status, RunStatus::CompletedWithErrors);
}

#[test]
fn single_shot_runs_exactly_once() {
    let integrations = mock_integrations();
    let modes = ModePlan::all_mock();
    let stop = StopSignal::new();
    let mut runs = 0;
    Pipeline::new(&integrations, &modes, &stop)
        .run_every(&post(), None, |_| {
            runs += 1;
            Ok(())
        })
        .expect("run");
    assert_eq!(runs, 1);
}

#[test]
fn interval_runs_repeat_until_stopped_and_share_the_store() {
    let integrations = mock_integrations();
    let modes = ModePlan::all_mock();
    let stop = StopSignal::new();
    let mut summaries = Vec::new();
    Pipeline::new(&integrations, &modes, &stop)
        .run_every(&post(), Some(std::time::Duration::from_millis(5)), |summary| {
            summaries.push(summary.clone());
            if summaries.len() == 2 {
                stop.request();
            }
            Ok(())
        })
        .expect("interval runs");
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].reconciled.created, 3);
    assert_eq!(summaries[1].reconciled.skipped, 3);
    assert_eq!(summaries[1].status, RunStatus::Succeeded);
}

#[test]
fn summary_handler_errors_end_the_loop() {
    let integrations = mock_integrations();
    let modes = ModePlan::all_mock();
    let stop = StopSignal::new();
    let result = Pipeline::new(&integrations, &modes, &stop).run_every(
        &post(),
        Some(std::time::Duration::from_millis(5)),
        |_| Err(anyhow::anyhow!("stdout closed")),
    );
    assert!(result.is_err());
}
