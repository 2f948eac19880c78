// harvestgate-core/src/orchestrator.rs
// ============================================================================
// Module: Orchestrator (C7)
// Description: The Run state machine's single entry point, `execute_run`
//              (spec §4.7).
// ============================================================================

//! ## Overview
//! [`Orchestrator`] is generic over every external collaborator named in
//! spec §6: the repository, the three engine adapters, the session pool
//! and prober, the broker, and the event bus. It owns no network, disk, or
//! database access itself — every suspension point (spec §5) lives behind
//! one of those injected collaborators.

use std::collections::BTreeMap;

use harvestgate_fields::FieldResult;
use thiserror::Error;
use tracing::info_span;

use crate::adaptive;
use crate::classifier;
use crate::classifier::TransportError;
use crate::confidence_filter;
use crate::confidence_filter::RecordDisposition;
use crate::core::AttemptDecision;
use crate::core::CrawlMode;
use crate::core::DomainAccessClass;
use crate::core::DomainConfig;
use crate::core::DomainStats;
use crate::core::Engine;
use crate::core::EngineAttempt;
use crate::core::FailureKind;
use crate::core::FieldMap;
use crate::core::InterventionTask;
use crate::core::Job;
use crate::core::Record;
use crate::core::Run;
use crate::core::RunEvent;
use crate::core::RunEventLevel;
use crate::core::RunId;
use crate::core::SessionRequirement;
use crate::escalation;
use crate::escalation::EscalationInput;
use crate::interfaces::AdapterError;
use crate::interfaces::AdapterRequest;
use crate::interfaces::AdapterResponse;
use crate::interfaces::Broker;
use crate::interfaces::BrokerError;
use crate::interfaces::EngineAdapter;
use crate::interfaces::EventBus;
use crate::interfaces::OrchestratorEvent;
use crate::interfaces::RunStore;
use crate::interfaces::SessionPool;
use crate::interfaces::SessionProbeOutcome;
use crate::interfaces::SessionProber;
use crate::interfaces::StoreError;
use crate::intervention_engine;
use crate::intervention_engine::BlockDecision;
use crate::intervention_engine::InterventionSpec;
use crate::intervention_engine::SessionPresence;

/// Upper bound on escalations per Run when the Job (and
/// `default_max_attempts` config) do not override it (spec §4.7).
pub const MAX_ESCALATIONS: u32 = 3;

/// Rolling 403 rate at or above which a `human`-class domain without a
/// session is routed straight to `provider` (spec §4.7 step 3).
pub const HUMAN_NO_SESSION_403_THRESHOLD: f64 = 0.8;

/// Default confidence floor for [`confidence_filter::filter_low_confidence`]
/// in `list` crawl mode.
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.5;

/// Every error [`Orchestrator::execute_run`] can surface. Per spec §9 design
/// notes, an *unhandled* exception at the run-loop boundary is instead
/// caught and mapped to [`FailureKind::Unknown`] on the Run itself; this
/// enum is for failures in the collaborators the loop cannot route around
/// (it could not even load the Run to fail it).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The repository failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The broker or event bus failed to accept a message.
    #[error(transparent)]
    Broker(#[from] BrokerError),
    /// The requested Run does not exist.
    #[error("run {0} not found")]
    RunNotFound(RunId),
    /// No adapter is registered for the tier the routing logic selected.
    #[error("no engine adapter registered for {0:?}")]
    MissingAdapter(Engine),
    /// The Job's `target_url` could not be parsed as a URL.
    #[error("invalid target url: {0}")]
    InvalidUrl(String),
}

/// Tunables the orchestrator reads once per `execute_run` call (spec §6
/// configuration: `default_max_attempts`).
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Upper bound on escalations per Run.
    pub max_escalations: u32,
    /// Confidence floor applied to list-mode Records before persistence.
    /// Ignored for `single`-mode Jobs, which always keep their one Record.
    pub confidence_floor: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_escalations: MAX_ESCALATIONS,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
        }
    }
}

/// The run state machine (spec §4.7), generic over every injected
/// collaborator.
pub struct Orchestrator<Store, Pool, Prober, Br, Events> {
    store: Store,
    adapters: BTreeMap<Engine, Box<dyn EngineAdapter + Send + Sync>>,
    sessions: Pool,
    prober: Prober,
    broker: Br,
    events: Events,
    config: OrchestratorConfig,
}

impl<Store, Pool, Prober, Br, Events> Orchestrator<Store, Pool, Prober, Br, Events>
where
    Store: RunStore,
    Pool: SessionPool,
    Prober: SessionProber,
    Br: Broker,
    Events: EventBus,
{
    /// Builds an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        store: Store,
        adapters: BTreeMap<Engine, Box<dyn EngineAdapter + Send + Sync>>,
        sessions: Pool,
        prober: Prober,
        broker: Br,
        events: Events,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            adapters,
            sessions,
            prober,
            broker,
            events,
            config,
        }
    }

    fn publish(&self, event: OrchestratorEvent) {
        if self.events.publish(&event).is_err() {
            tracing::warn!("event bus rejected an event; continuing (bus is not authoritative)");
        }
    }

    fn adapter_for(&self, engine: Engine) -> Result<&(dyn EngineAdapter + Send + Sync), OrchestratorError> {
        self.adapters
            .get(&engine)
            .map(std::convert::AsRef::as_ref)
            .ok_or(OrchestratorError::MissingAdapter(engine))
    }

    /// Drives one Run through the state machine (spec §4.7 "Execution
    /// algorithm"). Transitions are linear within this single invocation;
    /// `waiting_for_human -> queued` happens out of band, via
    /// [`Orchestrator::resume_from_intervention`].
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] only when a collaborator itself fails
    /// (store/broker unreachable, the Run does not exist, routing selected
    /// an unregistered adapter). Every extraction-domain failure instead
    /// becomes a terminal `Run.status == failed` with a [`FailureKind`], or
    /// a `waiting_for_human` pause; those paths return `Ok(())`.
    pub fn execute_run(&self, run_id: RunId) -> Result<(), OrchestratorError> {
        let span = info_span!("run", run_id = %run_id);
        let _entered = span.enter();

        let now = time::OffsetDateTime::now_utc();
        let mut run = self.store.load_run(run_id)?.ok_or(OrchestratorError::RunNotFound(run_id))?;
        let job = self.store.load_job(run.job_id)?.ok_or_else(|| OrchestratorError::Store(StoreError::NotFound(format!("job {}", run.job_id))))?;
        let field_maps = self.store.load_field_maps(job.id)?;

        run.status = crate::core::RunStatus::Running;
        run.updated_at = now;
        self.store.save_run(&run)?;
        self.publish(OrchestratorEvent::RunStarted { run_id, timestamp: now });

        let domain = extract_domain(&job.target_url)?;
        let maps_by_field: BTreeMap<&str, &FieldMap> = field_maps.iter().map(|field_map| (field_map.field_name.as_str(), field_map)).collect();
        let selector_map: BTreeMap<String, String> = job
            .field_names
            .iter()
            .map(|field_name| {
                let selector = maps_by_field
                    .get(field_name.as_str())
                    .map_or_else(|| FieldMap::default_selector_for(field_name).to_string(), |field_map| field_map.selector.clone());
                (field_name.clone(), selector)
            })
            .collect();
        let required_selector_count = selector_map.values().filter(|selector| !selector.is_empty()).count();

        let domain_config = self.store.load_domain_config(&domain)?.unwrap_or_else(|| DomainConfig::default_for(&domain));

        // Step 2: probe a session when the Job requires auth.
        if job.requires_auth {
            let session = self.sessions.get(&domain, None);
            let probe = self.prober.probe(&domain, session.as_ref());
            let needs_pause = match probe {
                SessionProbeOutcome::Valid => None,
                SessionProbeOutcome::Invalid if domain_config.session_requirement == SessionRequirement::Required => {
                    Some(intervention_engine::auth_expired("auth_expired", &job, &run))
                }
                SessionProbeOutcome::Missing if domain_config.session_requirement == SessionRequirement::Required => {
                    Some(intervention_engine::auth_expired("forbidden", &job, &run))
                }
                _ => None,
            };
            if let Some(Some(spec)) = needs_pause {
                return self.pause_run(&mut run, spec, now);
            }
        }

        // Step 3: routing.
        let mut forced_tier = job.forces_engine();
        if forced_tier.is_none() {
            forced_tier = match domain_config.access_class {
                DomainAccessClass::Infra => Some(Engine::Provider),
                DomainAccessClass::Human if self.sessions.get(&domain, None).is_none() && domain_config.rolling_403_rate >= HUMAN_NO_SESSION_403_THRESHOLD => {
                    Some(Engine::Provider)
                }
                _ => None,
            };
        }
        let mut current_engine = if let Some(engine) = forced_tier {
            engine
        } else {
            let http_stats = self.store.load_domain_stats(&domain, Engine::Http)?;
            let browser_stats = self.store.load_domain_stats(&domain, Engine::Browser)?;
            adaptive::bias_initial_engine(job.engine_mode, http_stats.as_ref(), browser_stats.as_ref()).engine
        };
        run.resolved_engine = current_engine;
        run.requested_engine = Some(current_engine);

        // Step 4: the escalation loop.
        let max_escalations = self.config.max_escalations.max(run.max_attempts);
        loop {
            let adapter = self.adapter_for(current_engine)?;
            let request = AdapterRequest {
                url: job.target_url.clone(),
                selector_map: selector_map.clone(),
                session: self.sessions.get(&domain, None),
                browser_profile: job.browser_profile.clone(),
                crawl_mode: job.crawl_mode,
                list_config: job.list_config.clone(),
            };

            match adapter.run(&request) {
                Ok(response) => {
                    if !response.items.is_empty() {
                        return self.finish_success(&mut run, &job, &field_maps, &domain, current_engine, response, now);
                    }
                    let escalation_input = EscalationInput {
                        current_engine,
                        html: response.raw_html.as_deref(),
                        status: response.http_status,
                        extracted_count: 0,
                        required_selector_count,
                        navigation_failed: response.navigation_failed,
                        captcha: response.captcha_detected,
                        engine_forced: forced_tier.is_some(),
                    };
                    if let Some(decision) = escalation::decide_escalation(&escalation_input) {
                        if run.attempt_count < max_escalations {
                            run.attempt_count += 1;
                            run.record_attempt(
                                EngineAttempt {
                                    engine: current_engine,
                                    status_code: response.http_status,
                                    signals: decision.signals.clone(),
                                    decision: AttemptDecision::Escalate { reason: decision.reason.to_string() },
                                    success: false,
                                    timestamp: time::OffsetDateTime::now_utc(),
                                },
                                time::OffsetDateTime::now_utc(),
                            );
                            self.publish(OrchestratorEvent::RunProgress {
                                run_id,
                                engine: current_engine,
                                message: format!("escalating: {}", decision.reason),
                                timestamp: time::OffsetDateTime::now_utc(),
                            });
                            current_engine = decision.to;
                            continue;
                        }
                    }

                    let block = intervention_engine::classify_block(
                        response.http_status,
                        None,
                        session_presence(&request),
                        domain_config.access_class,
                        response.items.len(),
                    );
                    return self.handle_terminal_attempt(
                        &mut run,
                        &job,
                        current_engine,
                        &response,
                        block,
                        &domain,
                        domain_config.rolling_403_rate,
                        now,
                    );
                }
                Err(adapter_err) => {
                    let signal = adapter_error_signal(&adapter_err);
                    if forced_tier.is_none() && current_engine.next_tier().is_some() && run.attempt_count < max_escalations {
                        run.attempt_count += 1;
                        run.record_attempt(
                            EngineAttempt {
                                engine: current_engine,
                                status_code: None,
                                signals: vec![signal],
                                decision: AttemptDecision::Escalate { reason: "adapter_error".to_string() },
                                success: false,
                                timestamp: time::OffsetDateTime::now_utc(),
                            },
                            time::OffsetDateTime::now_utc(),
                        );
                        current_engine = current_engine.next_tier().unwrap_or(current_engine);
                        continue;
                    }
                    let classified = match adapter_err {
                        AdapterError::Timeout => classifier::classify_transport_error(TransportError::Timeout),
                        AdapterError::Transport(_) => classifier::classify_transport_error(TransportError::ConnectionFailed),
                        AdapterError::Other(message) => classifier::ClassifiedFailure { kind: FailureKind::Unknown, message },
                    };
                    return self.fail_run(&mut run, classified.kind, classified.message, &job, now);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments, reason = "mirrors the collaborators execute_run already holds plus the attempt's own response")]
    fn finish_success(
        &self,
        run: &mut Run,
        job: &Job,
        field_maps: &[FieldMap],
        domain: &str,
        engine: Engine,
        response: AdapterResponse,
        now: time::OffsetDateTime,
    ) -> Result<(), OrchestratorError> {
        let maps_by_field: BTreeMap<&str, &FieldMap> = field_maps.iter().map(|field_map| (field_map.field_name.as_str(), field_map)).collect();
        let mut records = Vec::with_capacity(response.items.len());
        let mut pending_intervention: Option<InterventionSpec> = None;

        // A selector that matched in no item at all, across a run that did
        // extract other items, is selector drift (spec §4.6
        // `selector_drift`) rather than a per-value confidence problem —
        // checked once per field, ahead of the low-confidence scan below.
        for field_name in &job.field_names {
            let Some(field_map) = maps_by_field.get(field_name.as_str()) else {
                continue;
            };
            if field_map.selector.is_empty() {
                continue;
            }
            let matched = response.items.iter().any(|item| item.get(field_name).is_some_and(|raw| !raw.trim().is_empty()));
            if !matched {
                pending_intervention = intervention_engine::selector_drift(field_name, &field_map.selector, response.raw_html.as_deref().unwrap_or_default(), 0);
                if pending_intervention.is_some() {
                    break;
                }
            }
        }

        for (sequence, item) in response.items.iter().enumerate() {
            let mut fields: BTreeMap<String, FieldResult> = BTreeMap::new();
            for field_name in &job.field_names {
                let raw = item.get(field_name).map(String::as_str);
                let (field_type, smart, rules) = maps_by_field.get(field_name.as_str()).map_or_else(
                    || (harvestgate_fields::FieldType::String, harvestgate_fields::SmartConfig::default(), harvestgate_fields::ValidationRules::default()),
                    |field_map| (field_map.field_type, field_map.smart_config.clone(), field_map.validation_rules.clone()),
                );
                let result = harvestgate_fields::run_pipeline(raw, field_type, &smart, &rules, None)
                    .unwrap_or_else(|_| harvestgate_fields::FieldResult {
                        value: harvestgate_fields::FieldValue::Null,
                        raw: raw.unwrap_or_default().to_string(),
                        confidence: 0.0,
                        reasons: Vec::new(),
                        errors: vec!["pipeline_misconfigured".to_string()],
                        field_type,
                    });

                if pending_intervention.is_none() {
                    let required = maps_by_field.get(field_name.as_str()).is_some_and(|field_map| field_map.validation_rules.required);
                    pending_intervention = intervention_engine::low_confidence(field_name, &result, required);
                }

                fields.insert(field_name.clone(), result);
            }
            records.push(Record::new(run.id, u32::try_from(sequence).unwrap_or(u32::MAX), fields));
        }

        let mut dropped_count = 0usize;
        let mut flagged_count = 0usize;
        if job.crawl_mode == CrawlMode::List {
            records.retain(|record| match confidence_filter::filter_low_confidence(record, self.config.confidence_floor) {
                RecordDisposition::Keep => true,
                RecordDisposition::Flag => {
                    flagged_count += 1;
                    true
                }
                RecordDisposition::Drop => {
                    dropped_count += 1;
                    false
                }
            });
        }

        run.record_attempt(
            EngineAttempt {
                engine,
                status_code: response.http_status,
                signals: Vec::new(),
                decision: AttemptDecision::Success,
                success: true,
                timestamp: now,
            },
            now,
        );
        run.complete(now);
        self.store.persist_records_and_complete(run, &records)?;

        if dropped_count > 0 || flagged_count > 0 {
            self.store.append_run_event(&RunEvent::new(
                run.id,
                RunEventLevel::Info,
                format!("confidence filter: dropped {dropped_count}, flagged {flagged_count}"),
                serde_json::json!({"dropped": dropped_count, "flagged": flagged_count}),
                now,
            ))?;
        }

        if let Some(session) = response.captured_session {
            self.sessions.create(session);
        }
        self.sessions.mark_success(domain, None, false);

        let mut stats = self
            .store
            .load_domain_stats(domain, engine)?
            .unwrap_or_else(|| DomainStats::new(domain, engine, now));
        adaptive::record_outcome(&mut stats, true, records.len() as u64, run.attempt_count, engine.cost_weight(), now);
        self.store.save_domain_stats(&stats)?;

        if let Some(spec) = pending_intervention {
            let task = InterventionTask::new(run.id, spec.kind, spec.trigger_reason, spec.priority, spec.payload, None, now);
            self.store.save_intervention(&task)?;
            self.publish(OrchestratorEvent::InterventionCreated {
                run_id: run.id,
                task_id: task.id,
                kind: format!("{:?}", task.kind).to_lowercase(),
                timestamp: now,
            });
        }

        self.publish(OrchestratorEvent::RunCompleted { run_id: run.id, record_count: records.len(), timestamp: now });
        Ok(())
    }

    #[allow(clippy::too_many_arguments, reason = "mirrors the collaborators execute_run already holds plus the attempt's own response")]
    fn handle_terminal_attempt(
        &self,
        run: &mut Run,
        job: &Job,
        engine: Engine,
        response: &AdapterResponse,
        block: BlockDecision,
        domain: &str,
        rolling_403_rate: f64,
        now: time::OffsetDateTime,
    ) -> Result<(), OrchestratorError> {
        run.record_attempt(
            EngineAttempt {
                engine,
                status_code: response.http_status,
                signals: Vec::new(),
                decision: if block.should_pause {
                    AttemptDecision::Pause { reason: format!("{:?}", block.reason) }
                } else {
                    AttemptDecision::Fail { reason: "no_escalation_possible".to_string() }
                },
                success: false,
                timestamp: now,
            },
            now,
        );

        self.sessions.mark_failure(domain, None);
        let mut stats = self
            .store
            .load_domain_stats(domain, engine)?
            .unwrap_or_else(|| DomainStats::new(domain, engine, now));
        adaptive::record_outcome(&mut stats, false, 0, run.attempt_count, engine.cost_weight(), now);
        self.store.save_domain_stats(&stats)?;

        if block.should_pause {
            let kind = block.kind.unwrap_or(crate::core::InterventionKind::ManualAccess);
            let reason = block.reason.unwrap_or(crate::core::TriggerReason::ForbiddenNoSession);
            let spec = InterventionSpec {
                kind,
                trigger_reason: reason,
                priority: intervention_engine::block_task_priority(kind, rolling_403_rate),
                payload: serde_json::json!({
                    "domain": domain,
                    "status": response.http_status,
                }),
            };
            return self.pause_run(run, spec, now);
        }

        // The simple per-attempt classifier saw nothing pausable, but a
        // chronic pattern across the whole attempts log (spec §4.6
        // `hard_block`) still warrants a human rather than a terminal
        // failure.
        if let Some(spec) = intervention_engine::hard_block(&run.engine_attempts, job, run) {
            return self.pause_run(run, spec, now);
        }

        match response.http_status {
            Some(status) if status >= 400 => {
                let classified = classifier::classify_status(status, None);
                self.fail_run(run, classified.kind, classified.message, job, now)
            }
            _ => self.fail_run(run, FailureKind::ExtractionFailed, "no engine could extract any items".to_string(), job, now),
        }
    }

    fn pause_run(&self, run: &mut Run, spec: InterventionSpec, now: time::OffsetDateTime) -> Result<(), OrchestratorError> {
        run.pause(now);
        self.store.save_run(run)?;
        let task = InterventionTask::new(run.id, spec.kind, spec.trigger_reason, spec.priority, spec.payload, None, now);
        self.store.save_intervention(&task)?;
        self.publish(OrchestratorEvent::InterventionCreated {
            run_id: run.id,
            task_id: task.id,
            kind: format!("{:?}", task.kind).to_lowercase(),
            timestamp: now,
        });
        Ok(())
    }

    fn fail_run(&self, run: &mut Run, kind: FailureKind, message: String, job: &Job, now: time::OffsetDateTime) -> Result<(), OrchestratorError> {
        if kind == FailureKind::Blocked && job.requires_auth {
            if let Some(spec) = intervention_engine::auth_expired("auth_expired", job, run) {
                return self.pause_run(run, spec, now);
            }
        }

        run.fail(kind, message, now);
        self.store.save_run(run)?;

        if job.requires_auth && matches!(kind, FailureKind::Blocked) {
            if let Some(spec) = intervention_engine::auth_expired("auth_expired", job, run) {
                let task = InterventionTask::new(run.id, spec.kind, spec.trigger_reason, spec.priority, spec.payload, None, now);
                self.store.save_intervention(&task)?;
            }
        }

        self.store.append_run_event(&RunEvent::new(
            run.id,
            RunEventLevel::Error,
            format!("run failed: {kind:?}"),
            serde_json::json!({}),
            now,
        ))?;
        self.publish(OrchestratorEvent::RunFailed {
            run_id: run.id,
            failure_kind: format!("{kind:?}").to_lowercase(),
            timestamp: now,
        });
        Ok(())
    }

    /// Resumes a Run from `waiting_for_human` after its active intervention
    /// is resolved (spec §4.7: "out of band when the intervention is
    /// resolved (re-enqueue)"). Returns `queued` status and appends a
    /// RunEvent; never duplicates Records (spec §8 round-trip property).
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the store or broker fails.
    pub fn resume_from_intervention(&self, run_id: RunId) -> Result<(), OrchestratorError> {
        let now = time::OffsetDateTime::now_utc();
        let mut run = self.store.load_run(run_id)?.ok_or(OrchestratorError::RunNotFound(run_id))?;
        run.resume_to_queued(now);
        self.store.save_run(&run)?;
        self.store.append_run_event(&RunEvent::new(
            run_id,
            RunEventLevel::Info,
            "resumed from waiting_for_human after intervention resolution".to_string(),
            serde_json::json!({}),
            now,
        ))?;
        self.broker.enqueue(run_id)?;
        Ok(())
    }
}

fn extract_domain(target_url: &str) -> Result<String, OrchestratorError> {
    let parsed = url::Url::parse(target_url).map_err(|err| OrchestratorError::InvalidUrl(err.to_string()))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| OrchestratorError::InvalidUrl(target_url.to_string()))
}

fn session_presence(request: &AdapterRequest) -> SessionPresence {
    if request.session.is_some() {
        SessionPresence::Present
    } else {
        SessionPresence::Absent
    }
}

fn adapter_error_signal(err: &AdapterError) -> String {
    match err {
        AdapterError::Timeout => "adapter_timeout".to_string(),
        AdapterError::Transport(message) => format!("adapter_transport:{message}"),
        AdapterError::Other(message) => format!("adapter_error:{message}"),
    }
}
