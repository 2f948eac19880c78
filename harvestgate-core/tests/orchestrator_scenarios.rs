// harvestgate-core/tests/orchestrator_scenarios.rs
//! Exercises `Orchestrator::execute_run` end to end against in-memory fakes
//! for every collaborator (spec §8 "End-to-end scenarios"). Each fake is a
//! fresh instance per test, per the "global singletons become process-
//! scoped services ... tests inject fresh instances" design note (spec §9).

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use harvestgate_core::interfaces::AdapterError;
use harvestgate_core::interfaces::AdapterRequest;
use harvestgate_core::interfaces::AdapterResponse;
use harvestgate_core::interfaces::Broker;
use harvestgate_core::interfaces::BrokerError;
use harvestgate_core::interfaces::EngineAdapter;
use harvestgate_core::interfaces::EventBus;
use harvestgate_core::interfaces::OrchestratorEvent;
use harvestgate_core::interfaces::RunStore;
use harvestgate_core::interfaces::SessionPool;
use harvestgate_core::interfaces::SessionProbeOutcome;
use harvestgate_core::interfaces::SessionProber;
use harvestgate_core::interfaces::StoreError;
use harvestgate_core::AttemptDecision;
use harvestgate_core::CrawlMode;
use harvestgate_core::DomainAccessClass;
use harvestgate_core::DomainConfig;
use harvestgate_core::DomainStats;
use harvestgate_core::Engine;
use harvestgate_core::EngineMode;
use harvestgate_core::FailureKind;
use harvestgate_core::FieldMap;
use harvestgate_core::InterventionKind;
use harvestgate_core::InterventionPriority;
use harvestgate_core::InterventionTask;
use harvestgate_core::Job;
use harvestgate_core::JobId;
use harvestgate_core::ListConfig;
use harvestgate_core::Orchestrator;
use harvestgate_core::OrchestratorConfig;
use harvestgate_core::Record;
use harvestgate_core::RuleCandidate;
use harvestgate_core::Run;
use harvestgate_core::RunEvent;
use harvestgate_core::RunId;
use harvestgate_core::RunStatus;
use harvestgate_core::SessionKey;
use harvestgate_core::SessionVault;
use harvestgate_fields::FieldType;
use harvestgate_fields::FieldValue;

// ============================================================================
// SECTION: Fakes
// ============================================================================

#[derive(Default)]
struct StoreInner {
    jobs: BTreeMap<JobId, Job>,
    field_maps: BTreeMap<JobId, Vec<FieldMap>>,
    runs: BTreeMap<RunId, Run>,
    run_events: BTreeMap<RunId, Vec<RunEvent>>,
    records: BTreeMap<RunId, Vec<Record>>,
    sessions: BTreeMap<SessionKey, SessionVault>,
    domain_stats: BTreeMap<(String, Engine), DomainStats>,
    domain_configs: BTreeMap<String, DomainConfig>,
    interventions: BTreeMap<harvestgate_core::InterventionTaskId, InterventionTask>,
    rule_candidates: Vec<RuleCandidate>,
}

/// An in-memory `RunStore`, sharing state across clones the way
/// `SqliteRunStore` shares one `Arc<Mutex<Connection>>` (DESIGN.md), so a
/// test can inspect what the orchestrator persisted after `execute_run`
/// returns.
#[derive(Clone, Default)]
struct FakeStore(Arc<Mutex<StoreInner>>);

impl FakeStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        #[allow(clippy::unwrap_used, reason = "test-only fake, a poisoned lock means a prior assertion already panicked")]
        self.0.lock().unwrap()
    }

    fn seed_job(&self, job: &Job, field_maps: &[FieldMap]) {
        let mut inner = self.lock();
        inner.jobs.insert(job.id, job.clone());
        inner.field_maps.insert(job.id, field_maps.to_vec());
    }

    fn seed_run(&self, run: &Run) {
        self.lock().runs.insert(run.id, run.clone());
    }

    fn seed_domain_config(&self, config: DomainConfig) {
        self.lock().domain_configs.insert(config.domain.clone(), config);
    }

    fn load_run(&self, run_id: RunId) -> Run {
        self.lock().runs.get(&run_id).cloned().expect("run seeded")
    }

    fn records_for(&self, run_id: RunId) -> Vec<Record> {
        self.lock().records.get(&run_id).cloned().unwrap_or_default()
    }

    fn interventions_for(&self, run_id: RunId) -> Vec<InterventionTask> {
        self.lock().interventions.values().filter(|task| task.run_id == run_id).cloned().collect()
    }
}

impl RunStore for FakeStore {
    fn load_job(&self, job_id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.lock().jobs.get(&job_id).cloned())
    }

    fn save_job(&self, job: &Job) -> Result<(), StoreError> {
        self.lock().jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn load_field_maps(&self, job_id: JobId) -> Result<Vec<FieldMap>, StoreError> {
        Ok(self.lock().field_maps.get(&job_id).cloned().unwrap_or_default())
    }

    fn save_field_map(&self, field_map: &FieldMap) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let maps = inner.field_maps.entry(field_map.job_id).or_default();
        if let Some(existing) = maps.iter_mut().find(|candidate| candidate.id == field_map.id) {
            *existing = field_map.clone();
        } else {
            maps.push(field_map.clone());
        }
        Ok(())
    }

    fn load_run(&self, run_id: RunId) -> Result<Option<Run>, StoreError> {
        Ok(self.lock().runs.get(&run_id).cloned())
    }

    fn save_run(&self, run: &Run) -> Result<(), StoreError> {
        self.lock().runs.insert(run.id, run.clone());
        Ok(())
    }

    fn append_run_event(&self, event: &RunEvent) -> Result<(), StoreError> {
        self.lock().run_events.entry(event.run_id).or_default().push(event.clone());
        Ok(())
    }

    fn persist_records_and_complete(&self, run: &Run, records: &[Record]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.records.insert(run.id, records.to_vec());
        inner.runs.insert(run.id, run.clone());
        Ok(())
    }

    fn load_records(&self, run_id: RunId) -> Result<Vec<Record>, StoreError> {
        Ok(self.lock().records.get(&run_id).cloned().unwrap_or_default())
    }

    fn load_session(&self, key: &SessionKey) -> Result<Option<SessionVault>, StoreError> {
        Ok(self.lock().sessions.get(key).cloned())
    }

    fn save_session(&self, session: &SessionVault) -> Result<(), StoreError> {
        self.lock().sessions.insert(session.key.clone(), session.clone());
        Ok(())
    }

    fn delete_session(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.lock().sessions.remove(key);
        Ok(())
    }

    fn load_domain_stats(&self, domain: &str, engine: Engine) -> Result<Option<DomainStats>, StoreError> {
        Ok(self.lock().domain_stats.get(&(domain.to_string(), engine)).cloned())
    }

    fn save_domain_stats(&self, stats: &DomainStats) -> Result<(), StoreError> {
        self.lock().domain_stats.insert((stats.domain.clone(), stats.engine), stats.clone());
        Ok(())
    }

    fn load_domain_config(&self, domain: &str) -> Result<Option<DomainConfig>, StoreError> {
        Ok(self.lock().domain_configs.get(domain).cloned())
    }

    fn save_domain_config(&self, config: &DomainConfig) -> Result<(), StoreError> {
        self.lock().domain_configs.insert(config.domain.clone(), config.clone());
        Ok(())
    }

    fn load_active_intervention(&self, run_id: RunId) -> Result<Option<InterventionTask>, StoreError> {
        Ok(self
            .lock()
            .interventions
            .values()
            .find(|task| task.run_id == run_id && task.status.keeps_run_paused())
            .cloned())
    }

    fn load_intervention(&self, task_id: harvestgate_core::InterventionTaskId) -> Result<Option<InterventionTask>, StoreError> {
        Ok(self.lock().interventions.get(&task_id).cloned())
    }

    fn save_intervention(&self, task: &InterventionTask) -> Result<(), StoreError> {
        self.lock().interventions.insert(task.id, task.clone());
        Ok(())
    }

    fn load_overdue_interventions(&self, _now: time::OffsetDateTime) -> Result<Vec<InterventionTask>, StoreError> {
        Ok(Vec::new())
    }

    fn save_rule_candidate(&self, rule: &RuleCandidate) -> Result<(), StoreError> {
        self.lock().rule_candidates.push(rule.clone());
        Ok(())
    }
}

/// An in-memory `SessionPool` fake: no trust scoring or circuit breaking
/// (that math is covered directly in `harvestgate-sessions`), just enough
/// to drive the orchestrator's session-aware branches.
#[derive(Clone, Default)]
struct FakeSessionPool(Arc<Mutex<BTreeMap<SessionKey, SessionVault>>>);

impl SessionPool for FakeSessionPool {
    fn get(&self, domain: &str, proxy_identity: Option<&str>) -> Option<SessionVault> {
        #[allow(clippy::unwrap_used, reason = "test-only fake")]
        self.0.lock().unwrap().get(&SessionKey::new(domain, proxy_identity)).cloned()
    }

    fn create(&self, session: SessionVault) {
        #[allow(clippy::unwrap_used, reason = "test-only fake")]
        self.0.lock().unwrap().insert(session.key.clone(), session);
    }

    fn mark_success(&self, _domain: &str, _proxy_identity: Option<&str>, _had_captcha: bool) {}

    fn mark_failure(&self, _domain: &str, _proxy_identity: Option<&str>) {}
}

/// A `SessionProber` fake returning a fixed outcome.
struct FixedProber(SessionProbeOutcome);

impl SessionProber for FixedProber {
    fn probe(&self, _domain: &str, _session: Option<&SessionVault>) -> SessionProbeOutcome {
        self.0
    }
}

/// A no-op `Broker` fake.
#[derive(Default)]
struct NoopBroker;

impl Broker for NoopBroker {
    fn enqueue(&self, _run_id: RunId) -> Result<(), BrokerError> {
        Ok(())
    }
}

/// An `EventBus` fake that records every event published, for assertions.
#[derive(Clone, Default)]
struct RecordingEventBus(Arc<Mutex<Vec<OrchestratorEvent>>>);

impl EventBus for RecordingEventBus {
    fn publish(&self, event: &OrchestratorEvent) -> Result<(), BrokerError> {
        #[allow(clippy::unwrap_used, reason = "test-only fake")]
        self.0.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// An `EngineAdapter` fake that returns a scripted sequence of responses,
/// one per call, repeating the last once the script is exhausted.
struct ScriptedAdapter {
    engine: Engine,
    script: Mutex<VecDeque<Result<AdapterResponse, AdapterError>>>,
}

impl ScriptedAdapter {
    fn new(engine: Engine, script: Vec<Result<AdapterResponse, AdapterError>>) -> Self {
        Self {
            engine,
            script: Mutex::new(script.into()),
        }
    }
}

impl EngineAdapter for ScriptedAdapter {
    fn engine(&self) -> Engine {
        self.engine
    }

    fn run(&self, _request: &AdapterRequest) -> Result<AdapterResponse, AdapterError> {
        #[allow(clippy::unwrap_used, reason = "test-only fake")]
        let mut script = self.script.lock().unwrap();
        match script.pop_front() {
            Some(response) => {
                if script.is_empty() {
                    // keep serving the last response if the orchestrator calls again
                }
                response
            }
            None => Err(AdapterError::Other("scripted adapter exhausted".to_string())),
        }
    }
}

fn single_item_job(target_url: &str, field_names: &[&str]) -> Job {
    Job {
        id: JobId::new(),
        target_url: target_url.to_string(),
        field_names: field_names.iter().map(|name| (*name).to_string()).collect(),
        requires_auth: false,
        crawl_mode: CrawlMode::Single,
        list_config: None::<ListConfig>,
        engine_mode: EngineMode::Auto,
        browser_profile: None,
    }
}

fn success_response(status: u16, html: &str, items: Vec<BTreeMap<String, String>>) -> AdapterResponse {
    AdapterResponse {
        items,
        raw_html: Some(html.to_string()),
        http_status: Some(status),
        captured_session: None,
        navigation_failed: false,
        captcha_detected: false,
    }
}

fn item(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

#[allow(clippy::type_complexity, reason = "one alias keeps every scenario's orchestrator construction readable")]
fn build_orchestrator(
    store: FakeStore,
    adapters: BTreeMap<Engine, Box<dyn EngineAdapter + Send + Sync>>,
    sessions: FakeSessionPool,
    prober: FixedProber,
    events: RecordingEventBus,
) -> Orchestrator<FakeStore, FakeSessionPool, FixedProber, NoopBroker, RecordingEventBus> {
    Orchestrator::new(store, adapters, sessions, prober, NoopBroker, events, OrchestratorConfig::default())
}

// ============================================================================
// SECTION: Scenario 1 — fresh public domain, HTML works
// ============================================================================

#[test]
fn scenario_1_fresh_public_domain_html_works() {
    let job = single_item_job("https://example.com/item/42", &["title", "price"]);
    let field_maps = vec![
        FieldMap::new(job.id, "title", "h1", FieldType::String),
        FieldMap::new(job.id, "price", ".price", FieldType::Money),
    ];
    let run = Run::new(job.id, 3, time::OffsetDateTime::UNIX_EPOCH);

    let store = FakeStore::default();
    store.seed_job(&job, &field_maps);
    store.seed_run(&run);

    let mut adapters: BTreeMap<Engine, Box<dyn EngineAdapter + Send + Sync>> = BTreeMap::new();
    adapters.insert(
        Engine::Http,
        Box::new(ScriptedAdapter::new(
            Engine::Http,
            vec![Ok(success_response(200, "<html><h1>Widget</h1></html>", vec![item(&[("title", "Widget"), ("price", "$9.99")])]))],
        )),
    );

    let orchestrator = build_orchestrator(store.clone(), adapters, FakeSessionPool::default(), FixedProber(SessionProbeOutcome::Missing), RecordingEventBus::default());
    orchestrator.execute_run(run.id).expect("execute_run succeeds");

    let finished = store.load_run(run.id);
    assert_eq!(finished.status, RunStatus::Completed);
    assert_eq!(finished.engine_attempts.len(), 1);
    assert_eq!(finished.engine_attempts[0].engine, Engine::Http);
    assert!(matches!(finished.engine_attempts[0].decision, AttemptDecision::Success));

    let records = store.records_for(run.id);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fields["title"].value, FieldValue::Text("Widget".to_string()));
    assert_eq!(
        records[0].fields["price"].value,
        FieldValue::Money(harvestgate_fields::Money {
            amount: 9.99,
            currency: "USD".to_string()
        })
    );

    let stats = store.lock().domain_stats.get(&("example.com".to_string(), Engine::Http)).cloned().expect("stats recorded");
    assert_eq!(stats.total_attempts, 1);
    assert_eq!(stats.successful_attempts, 1);
}

// ============================================================================
// SECTION: Scenario 2 — SPA detected, escalate to browser
// ============================================================================

#[test]
fn scenario_2_spa_detected_escalates_to_browser() {
    let job = single_item_job("https://example.com/item/42", &["title", "price"]);
    let field_maps = vec![
        FieldMap::new(job.id, "title", "h1", FieldType::String),
        FieldMap::new(job.id, "price", ".price", FieldType::Money),
    ];
    let run = Run::new(job.id, 3, time::OffsetDateTime::UNIX_EPOCH);

    let store = FakeStore::default();
    store.seed_job(&job, &field_maps);
    store.seed_run(&run);

    let mut adapters: BTreeMap<Engine, Box<dyn EngineAdapter + Send + Sync>> = BTreeMap::new();
    adapters.insert(
        Engine::Http,
        Box::new(ScriptedAdapter::new(
            Engine::Http,
            vec![Ok(success_response(200, "<html><div id=\"__NEXT_DATA__\"></div></html>", Vec::new()))],
        )),
    );
    adapters.insert(
        Engine::Browser,
        Box::new(ScriptedAdapter::new(
            Engine::Browser,
            vec![Ok(success_response(200, "<html><h1>Widget</h1></html>", vec![item(&[("title", "Widget"), ("price", "$9.99")])]))],
        )),
    );

    let orchestrator = build_orchestrator(store.clone(), adapters, FakeSessionPool::default(), FixedProber(SessionProbeOutcome::Missing), RecordingEventBus::default());
    orchestrator.execute_run(run.id).expect("execute_run succeeds");

    let finished = store.load_run(run.id);
    assert_eq!(finished.status, RunStatus::Completed);
    assert_eq!(finished.engine_attempts.len(), 2);
    assert!(matches!(&finished.engine_attempts[0].decision, AttemptDecision::Escalate { reason } if reason == "js_app_detected"));
    assert_eq!(finished.engine_attempts[1].engine, Engine::Browser);
    assert!(matches!(finished.engine_attempts[1].decision, AttemptDecision::Success));
}

// ============================================================================
// SECTION: Scenario 3 — 403 with no session on a `human` domain
// ============================================================================

#[test]
fn scenario_3_403_no_session_on_human_domain_pauses_manual_access() {
    let mut job = single_item_job("https://portal.example.com/item/42", &["title"]);
    // Forced to a single tier so the escalation ladder (which would also
    // treat a 403 as an escalation trigger) never fires, isolating the
    // block classifier's own pause decision.
    job.engine_mode = EngineMode::Forced(Engine::Http);
    let field_maps = vec![FieldMap::new(job.id, "title", "h1", FieldType::String)];
    let run = Run::new(job.id, 3, time::OffsetDateTime::UNIX_EPOCH);

    let store = FakeStore::default();
    store.seed_job(&job, &field_maps);
    store.seed_run(&run);
    store.seed_domain_config(DomainConfig {
        access_class: DomainAccessClass::Human,
        ..DomainConfig::default_for("portal.example.com")
    });

    let mut adapters: BTreeMap<Engine, Box<dyn EngineAdapter + Send + Sync>> = BTreeMap::new();
    adapters.insert(Engine::Http, Box::new(ScriptedAdapter::new(Engine::Http, vec![Ok(success_response(403, "<html>forbidden</html>", Vec::new()))])));

    let orchestrator = build_orchestrator(store.clone(), adapters, FakeSessionPool::default(), FixedProber(SessionProbeOutcome::Missing), RecordingEventBus::default());
    orchestrator.execute_run(run.id).expect("execute_run succeeds");

    let finished = store.load_run(run.id);
    assert_eq!(finished.status, RunStatus::WaitingForHuman);
    assert!(store.records_for(run.id).is_empty());

    let interventions = store.interventions_for(run.id);
    assert_eq!(interventions.len(), 1);
    assert_eq!(interventions[0].kind, InterventionKind::ManualAccess);
    assert_eq!(interventions[0].priority, InterventionPriority::High);
    assert_eq!(interventions[0].payload["status"], serde_json::json!(403));
}

// ============================================================================
// SECTION: Scenario 4 — low-confidence required field
// ============================================================================

#[test]
fn scenario_4_low_confidence_required_field_completes_with_intervention() {
    let job = single_item_job("https://example.com/contact/1", &["email"]);
    let mut email_map = FieldMap::new(job.id, "email", ".email", FieldType::Email);
    email_map.validation_rules.required = true;
    let field_maps = vec![email_map];
    let run = Run::new(job.id, 3, time::OffsetDateTime::UNIX_EPOCH);

    let store = FakeStore::default();
    store.seed_job(&job, &field_maps);
    store.seed_run(&run);

    let mut adapters: BTreeMap<Engine, Box<dyn EngineAdapter + Send + Sync>> = BTreeMap::new();
    adapters.insert(
        Engine::Http,
        Box::new(ScriptedAdapter::new(
            Engine::Http,
            vec![Ok(success_response(200, "<html></html>", vec![item(&[("email", "john at example dot com")])]))],
        )),
    );

    let orchestrator = build_orchestrator(store.clone(), adapters, FakeSessionPool::default(), FixedProber(SessionProbeOutcome::Missing), RecordingEventBus::default());
    orchestrator.execute_run(run.id).expect("execute_run succeeds");

    // Scenario 4's chosen resolution (spec §8): the Run completes, carrying
    // a `field_confirm` intervention alongside the persisted Record.
    let finished = store.load_run(run.id);
    assert_eq!(finished.status, RunStatus::Completed);

    let records = store.records_for(run.id);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fields["email"].value, FieldValue::Null);
    assert_eq!(records[0].fields["email"].errors, vec!["invalid_email_format".to_string()]);

    let interventions = store.interventions_for(run.id);
    assert_eq!(interventions.len(), 1);
    assert_eq!(interventions[0].kind, InterventionKind::FieldConfirm);
}

// ============================================================================
// SECTION: selector_drift wiring — a field selector that never matches
// ============================================================================

#[test]
fn selector_never_matching_across_all_items_creates_selector_fix() {
    let job = single_item_job("https://example.com/listing", &["title", "price"]);
    let field_maps = vec![
        FieldMap::new(job.id, "title", "h1", FieldType::String),
        FieldMap::new(job.id, "price", ".price", FieldType::Money),
    ];
    let run = Run::new(job.id, 3, time::OffsetDateTime::UNIX_EPOCH);

    let store = FakeStore::default();
    store.seed_job(&job, &field_maps);
    store.seed_run(&run);

    let mut adapters: BTreeMap<Engine, Box<dyn EngineAdapter + Send + Sync>> = BTreeMap::new();
    adapters.insert(
        Engine::Http,
        Box::new(ScriptedAdapter::new(
            Engine::Http,
            vec![Ok(success_response(200, "<html></html>", vec![item(&[("title", "Widget One")]), item(&[("title", "Widget Two")])]))],
        )),
    );

    let orchestrator = build_orchestrator(store.clone(), adapters, FakeSessionPool::default(), FixedProber(SessionProbeOutcome::Missing), RecordingEventBus::default());
    orchestrator.execute_run(run.id).expect("execute_run succeeds");

    assert_eq!(store.load_run(run.id).status, RunStatus::Completed);
    assert_eq!(store.records_for(run.id).len(), 2);

    let interventions = store.interventions_for(run.id);
    assert_eq!(interventions.len(), 1);
    assert_eq!(interventions[0].kind, InterventionKind::SelectorFix);
    assert_eq!(interventions[0].payload["field_name"], serde_json::json!("price"));
}

// ============================================================================
// SECTION: hard_block wiring — chronic block pattern pauses instead of fails
// ============================================================================

#[test]
fn chronic_block_pattern_pauses_instead_of_terminal_failure() {
    let mut job = single_item_job("https://example.com/item/1", &["title"]);
    job.engine_mode = EngineMode::Forced(Engine::Http);
    let field_maps = vec![FieldMap::new(job.id, "title", "h1", FieldType::String)];
    let mut run = Run::new(job.id, 3, time::OffsetDateTime::UNIX_EPOCH);

    // Simulate three prior pause/resume cycles that each logged a blocked
    // attempt on this same Run (engine_attempts persists across resumes).
    for _ in 0..3 {
        run.record_attempt(
            harvestgate_core::EngineAttempt {
                engine: Engine::Http,
                status_code: Some(403),
                signals: vec!["status_403".to_string()],
                decision: AttemptDecision::Pause { reason: "forbidden_no_session".to_string() },
                success: false,
                timestamp: time::OffsetDateTime::UNIX_EPOCH,
            },
            time::OffsetDateTime::UNIX_EPOCH,
        );
    }

    let store = FakeStore::default();
    store.seed_job(&job, &field_maps);
    store.seed_run(&run);

    let mut adapters: BTreeMap<Engine, Box<dyn EngineAdapter + Send + Sync>> = BTreeMap::new();
    // A 500 with zero items: the simple per-attempt block classifier does
    // not pause on this status, so only `hard_block` can rescue it.
    adapters.insert(Engine::Http, Box::new(ScriptedAdapter::new(Engine::Http, vec![Ok(success_response(500, "<html></html>", Vec::new()))])));

    let orchestrator = build_orchestrator(store.clone(), adapters, FakeSessionPool::default(), FixedProber(SessionProbeOutcome::Missing), RecordingEventBus::default());
    orchestrator.execute_run(run.id).expect("execute_run succeeds");

    let finished = store.load_run(run.id);
    assert_eq!(finished.status, RunStatus::WaitingForHuman);
    assert_ne!(finished.failure_kind, Some(FailureKind::BadResponse));

    let interventions = store.interventions_for(run.id);
    assert_eq!(interventions.len(), 1);
    assert_eq!(interventions[0].kind, InterventionKind::ManualAccess);
}

// ============================================================================
// SECTION: resume-from-intervention round trip (spec §8 round-trip property)
// ============================================================================

#[test]
fn resume_from_intervention_requeues_without_duplicating_records() {
    let job = single_item_job("https://example.com/item/1", &["title"]);
    let field_maps = vec![FieldMap::new(job.id, "title", "h1", FieldType::String)];
    let mut run = Run::new(job.id, 3, time::OffsetDateTime::UNIX_EPOCH);
    run.pause(time::OffsetDateTime::UNIX_EPOCH);

    let store = FakeStore::default();
    store.seed_job(&job, &field_maps);
    store.seed_run(&run);

    let orchestrator = build_orchestrator(store.clone(), BTreeMap::new(), FakeSessionPool::default(), FixedProber(SessionProbeOutcome::Missing), RecordingEventBus::default());
    orchestrator.resume_from_intervention(run.id).expect("resume succeeds");

    let resumed = store.load_run(run.id);
    assert_eq!(resumed.status, RunStatus::Queued);
    assert!(store.records_for(run.id).is_empty());
    assert_eq!(store.lock().run_events.get(&run.id).map(Vec::len).unwrap_or(0), 1);
}
