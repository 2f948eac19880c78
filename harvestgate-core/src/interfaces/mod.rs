// harvestgate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Harvestgate Interfaces
// Description: Backend-agnostic interfaces for engine adapters, the
//              repository, the broker, and the event bus (spec §6).
// Purpose: Define the contract surfaces the orchestrator (C7) is generic
//          over, so it never depends on a concrete transport, database, or
//          browser driver.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Everything out of scope per spec §1 ("the HTTP API surface, the
//! relational store ..., the message broker ..., the SSE fan-out, the
//! embedded browser driver, and the third-party provider HTTP clients") is
//! represented here only as a trait. Implementations live in sibling crates
//! (`harvestgate-providers`, `harvestgate-store-sqlite`, `harvestgate-broker`)
//! and are injected into [`crate::orchestrator::Orchestrator`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::CrawlMode;
use crate::core::DomainConfig;
use crate::core::DomainStats;
use crate::core::Engine;
use crate::core::FieldMap;
use crate::core::InterventionTask;
use crate::core::InterventionTaskId;
use crate::core::Job;
use crate::core::JobId;
use crate::core::ListConfig;
use crate::core::Record;
use crate::core::RuleCandidate;
use crate::core::Run;
use crate::core::RunEvent;
use crate::core::RunId;
use crate::core::SessionKey;
use crate::core::SessionVault;

// ============================================================================
// SECTION: Engine Adapter
// ============================================================================

/// What the orchestrator asks an [`EngineAdapter`] to do: fetch (or
/// navigate to) `url` and extract whatever `selector_map` describes (spec
/// §6 "Engine adapter contract").
#[derive(Debug, Clone)]
pub struct AdapterRequest {
    /// The page (or listing page) to fetch.
    pub url: String,
    /// Field name to selector spec.
    pub selector_map: BTreeMap<String, String>,
    /// A stored session to resume, when one exists.
    pub session: Option<SessionVault>,
    /// A named browser profile (user agent / viewport bundle), honored only
    /// by the `browser` adapter.
    pub browser_profile: Option<String>,
    /// Single-item vs. list crawl.
    pub crawl_mode: CrawlMode,
    /// Present only when `crawl_mode == List`.
    pub list_config: Option<ListConfig>,
}

/// One raw extracted item: field name to the raw string a selector
/// matched (or JSON-LD/entity extraction surfaced), before the field
/// pipeline (C2) has touched it.
pub type RawItem = BTreeMap<String, String>;

/// What an [`EngineAdapter`] hands back to the orchestrator (spec §6): a
/// blocked status is conveyed via `http_status`, never an exception.
#[derive(Debug, Clone, Default)]
pub struct AdapterResponse {
    /// Raw extracted items, one per record.
    pub items: Vec<RawItem>,
    /// The raw HTML fetched/rendered, when available, for escalation
    /// signal detection (spec §4.3).
    pub raw_html: Option<String>,
    /// The HTTP status observed, when applicable.
    pub http_status: Option<u16>,
    /// A freshly captured session, when the `browser` adapter captured one
    /// and none was supplied (spec §6).
    pub captured_session: Option<SessionVault>,
    /// Set by the `browser` adapter when navigation itself failed (spec
    /// §4.3 `navigation_failed` escalation trigger).
    pub navigation_failed: bool,
    /// Set by the `browser` adapter when a CAPTCHA challenge was observed
    /// (spec §4.3 `captcha_detected` escalation trigger).
    pub captcha_detected: bool,
}

/// Errors an [`EngineAdapter`] raises for conditions that are not
/// expressible as an ordinary HTTP status (spec §6: "network and engine
/// errors are caught" by the orchestrator, spec §4.7 step 4).
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The adapter's timeout budget (spec §5) was exceeded.
    #[error("engine adapter timed out")]
    Timeout,
    /// A network-level transport error occurred before any response.
    #[error("engine adapter transport error: {0}")]
    Transport(String),
    /// Any other adapter-internal failure.
    #[error("engine adapter error: {0}")]
    Other(String),
}

/// One of the three engine tiers' implementations (spec §6 "three
/// implementations: http, browser, provider").
pub trait EngineAdapter {
    /// Which tier this adapter implements.
    fn engine(&self) -> Engine;

    /// Executes one fetch/navigate/extract cycle.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] for transport-level and timeout failures;
    /// a blocked or error HTTP status is returned as `Ok` with
    /// `http_status` set, never as an `Err`.
    fn run(&self, request: &AdapterRequest) -> Result<AdapterResponse, AdapterError>;
}

// ============================================================================
// SECTION: Repository (Store Contract)
// ============================================================================

/// Errors raised by a [`RunStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A storage I/O error (disk, connection, ...).
    #[error("store io error: {0}")]
    Io(String),
    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A uniqueness or referential invariant was violated.
    #[error("store constraint violation: {0}")]
    Constraint(String),
    /// Any other store-reported failure.
    #[error("store error: {0}")]
    Store(String),
}

/// The repository contract (spec §6 "Store contract"): CRUD and status
/// transitions for every entity in spec §3, with one transactional method
/// wrapping "persist records + mark run completed".
#[allow(clippy::missing_errors_doc, reason = "every method shares the same StoreError contract, documented once above")]
pub trait RunStore {
    /// Loads a Job by id.
    fn load_job(&self, job_id: JobId) -> Result<Option<Job>, StoreError>;
    /// Persists a Job (insert or full replace).
    fn save_job(&self, job: &Job) -> Result<(), StoreError>;
    /// Loads every FieldMap belonging to a Job, in field-declaration order.
    fn load_field_maps(&self, job_id: JobId) -> Result<Vec<FieldMap>, StoreError>;
    /// Persists a FieldMap (insert or full replace, preserving history).
    fn save_field_map(&self, field_map: &FieldMap) -> Result<(), StoreError>;

    /// Loads a Run by id.
    fn load_run(&self, run_id: RunId) -> Result<Option<Run>, StoreError>;
    /// Persists a Run (insert or full replace).
    fn save_run(&self, run: &Run) -> Result<(), StoreError>;
    /// Appends a RunEvent.
    fn append_run_event(&self, event: &RunEvent) -> Result<(), StoreError>;

    /// Atomically persists a batch of Records and marks the owning Run
    /// `completed` (spec §6: "transactions must wrap 'persist records +
    /// mark run completed'").
    fn persist_records_and_complete(&self, run: &Run, records: &[Record]) -> Result<(), StoreError>;
    /// Loads every Record belonging to a Run, in insertion order.
    fn load_records(&self, run_id: RunId) -> Result<Vec<Record>, StoreError>;

    /// Loads a stored session by key.
    fn load_session(&self, key: &SessionKey) -> Result<Option<SessionVault>, StoreError>;
    /// Persists a session (insert or full replace).
    fn save_session(&self, session: &SessionVault) -> Result<(), StoreError>;
    /// Deletes a stored session, e.g. on hard retirement.
    fn delete_session(&self, key: &SessionKey) -> Result<(), StoreError>;

    /// Loads the `(domain, engine)` counter row, if it exists.
    fn load_domain_stats(&self, domain: &str, engine: Engine) -> Result<Option<DomainStats>, StoreError>;
    /// Persists a `(domain, engine)` counter row (insert or full replace).
    fn save_domain_stats(&self, stats: &DomainStats) -> Result<(), StoreError>;

    /// Loads a domain's policy cache row, if it exists.
    fn load_domain_config(&self, domain: &str) -> Result<Option<DomainConfig>, StoreError>;
    /// Persists a domain's policy cache row (insert or full replace).
    fn save_domain_config(&self, config: &DomainConfig) -> Result<(), StoreError>;

    /// Loads the active (pending/in-progress) intervention for a Run, when
    /// one exists (spec §3 cross-entity invariant).
    fn load_active_intervention(&self, run_id: RunId) -> Result<Option<InterventionTask>, StoreError>;
    /// Loads an intervention task by id.
    fn load_intervention(&self, task_id: InterventionTaskId) -> Result<Option<InterventionTask>, StoreError>;
    /// Persists an intervention task (insert or full replace).
    fn save_intervention(&self, task: &InterventionTask) -> Result<(), StoreError>;
    /// Loads every pending intervention task past its `expires_at`, for the
    /// background sweep (spec §5).
    fn load_overdue_interventions(&self, now: time::OffsetDateTime) -> Result<Vec<InterventionTask>, StoreError>;

    /// Persists a rule candidate produced by resolving an intervention.
    fn save_rule_candidate(&self, rule: &RuleCandidate) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Session Pool
// ============================================================================

/// The session-pool contract (C5, spec §4.5) the orchestrator consumes.
/// The concrete implementation (trust scoring, circuit breaking, disk
/// persistence) lives in `harvestgate-sessions`; this crate only needs the
/// shape of its public operations.
pub trait SessionPool {
    /// Returns a reusable session for `(domain, proxy)`, or `None` when no
    /// session exists, none clears the trust/hard-cap thresholds, or the
    /// site's circuit breaker is open (spec §4.5 `get`).
    fn get(&self, domain: &str, proxy_identity: Option<&str>) -> Option<SessionVault>;

    /// Stores a freshly captured session (spec §4.5 `create`).
    fn create(&self, session: SessionVault);

    /// Records a successful use (spec §4.5 `mark_success`).
    fn mark_success(&self, domain: &str, proxy_identity: Option<&str>, had_captcha: bool);

    /// Records a failed use (spec §4.5 `mark_failure`).
    fn mark_failure(&self, domain: &str, proxy_identity: Option<&str>);
}

/// The three-way outcome of probing a stored session against a domain's
/// root before a Run that requires auth begins (spec §4.7 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionProbeOutcome {
    /// The session is usable.
    Valid,
    /// A session exists but a HEAD to the domain root returned 401/403 or
    /// a transport error occurred.
    Invalid,
    /// No stored session exists for the key.
    Missing,
}

/// Probes whether a stored session still authenticates against a domain
/// (spec §4.7 step 2).
pub trait SessionProber {
    /// Performs the probe.
    fn probe(&self, domain: &str, session: Option<&SessionVault>) -> SessionProbeOutcome;
}

// ============================================================================
// SECTION: Broker & Event Bus
// ============================================================================

/// Errors raised by [`Broker`] or [`EventBus`] implementations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker/bus could not accept the message.
    #[error("broker error: {0}")]
    Unavailable(String),
}

/// Fire-and-forget run-execution broker (spec §6 "Broker contract").
pub trait Broker {
    /// Enqueues `run_id` for execution (or re-execution, after an
    /// intervention resolves).
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the message cannot be accepted.
    fn enqueue(&self, run_id: RunId) -> Result<(), BrokerError>;
}

/// The topical event kinds the orchestrator emits (spec §6 "Event bus").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// A Run transitioned `queued` -> `running`.
    RunStarted {
        /// The Run.
        run_id: RunId,
        /// When it started.
        #[serde(with = "time::serde::rfc3339")]
        timestamp: time::OffsetDateTime,
    },
    /// One engine attempt completed (success or escalate).
    RunProgress {
        /// The Run.
        run_id: RunId,
        /// The engine tier just tried.
        engine: Engine,
        /// What happened.
        message: String,
        /// When it happened.
        #[serde(with = "time::serde::rfc3339")]
        timestamp: time::OffsetDateTime,
    },
    /// A Run reached `completed`.
    RunCompleted {
        /// The Run.
        run_id: RunId,
        /// How many Records were persisted.
        record_count: usize,
        /// When it completed.
        #[serde(with = "time::serde::rfc3339")]
        timestamp: time::OffsetDateTime,
    },
    /// A Run reached `failed`.
    RunFailed {
        /// The Run.
        run_id: RunId,
        /// The terminal failure kind, serialized as its snake_case tag.
        failure_kind: String,
        /// When it failed.
        #[serde(with = "time::serde::rfc3339")]
        timestamp: time::OffsetDateTime,
    },
    /// An [`InterventionTask`] was created.
    InterventionCreated {
        /// The Run it pauses.
        run_id: RunId,
        /// The task.
        task_id: InterventionTaskId,
        /// Its kind, serialized as its snake_case tag.
        kind: String,
        /// When it was created.
        #[serde(with = "time::serde::rfc3339")]
        timestamp: time::OffsetDateTime,
    },
    /// An [`InterventionTask`] was resolved.
    InterventionResolved {
        /// The Run it had paused.
        run_id: RunId,
        /// The task.
        task_id: InterventionTaskId,
        /// When it was resolved.
        #[serde(with = "time::serde::rfc3339")]
        timestamp: time::OffsetDateTime,
    },
}

/// The orchestrator's non-authoritative event sink (spec §6: "Consumers are
/// free to drop events; the bus is not authoritative").
pub trait EventBus {
    /// Publishes one event. Best-effort: failures are logged, never
    /// propagated as Run failures.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the event cannot be accepted.
    fn publish(&self, event: &OrchestratorEvent) -> Result<(), BrokerError>;
}
