// harvestgate-core/src/core/run.rs
// ============================================================================
// Module: Run
// Description: One execution attempt of a Job (spec §3 "Run", §4.7 state
//              machine).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::JobId;
use crate::core::identifiers::RunId;

/// The escalation tiers, cheapest first. Ordering here *is* the tier order
/// from spec §4.3 (`http < browser < provider`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    /// Cheap transport-level fetch.
    Http,
    /// Headless-browser navigation with JS rendering.
    Browser,
    /// Paid third-party fetch service.
    Provider,
}

impl Engine {
    /// The next tier up, or `None` at `Provider` (the top of the ladder).
    #[must_use]
    pub const fn next_tier(self) -> Option<Self> {
        match self {
            Self::Http => Some(Self::Browser),
            Self::Browser => Some(Self::Provider),
            Self::Provider => None,
        }
    }

    /// The cost weight used in `avg_cost_per_record` (spec §4.4).
    #[must_use]
    pub const fn cost_weight(self) -> f64 {
        match self {
            Self::Http => 1.0,
            Self::Browser => 3.0,
            Self::Provider => 10.0,
        }
    }
}

/// A Run's position in the state machine (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Waiting to be picked up by a worker.
    Queued,
    /// Currently executing `execute_run`.
    Running,
    /// Paused on a pending/in-progress [`crate::core::intervention::InterventionTask`].
    WaitingForHuman,
    /// Terminated successfully; its Record set is frozen.
    Completed,
    /// Terminated unsuccessfully; carries a [`FailureKind`].
    Failed,
}

/// The closed set of terminal failure reasons a Run may carry (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 401/403 with no path to a pausable intervention.
    Blocked,
    /// 429, never paused, simply terminal if it is the last engine tried.
    RateLimited,
    /// An engine adapter exceeded its timeout budget.
    Timeout,
    /// A network-level transport error (DNS, connection reset, ...).
    Network,
    /// Any other 4xx/5xx.
    BadResponse,
    /// No escalation is possible and no record could be extracted.
    ExtractionFailed,
    /// The escalation cap (`MAX_ESCALATIONS`) was reached with no success.
    MaxEscalations,
    /// Anything uncategorized, including exceptions at the run-loop
    /// boundary (spec §9 design note).
    Unknown,
}

/// What the orchestrator decided to do after one engine attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptDecision {
    /// The attempt produced usable items; the run completes.
    Success,
    /// Move to the next tier, carrying the escalation reason.
    Escalate {
        /// e.g. `blocked_status_code`, `js_app_detected`.
        reason: String,
    },
    /// Stop escalating and pause for a human.
    Pause {
        /// e.g. `hard_block`, `auth_expired`.
        reason: String,
    },
    /// Stop escalating and terminate the run.
    Fail {
        /// The [`FailureKind`] this attempt resolved to.
        reason: String,
    },
}

/// One append-only entry in a Run's engine-attempts log — "the only source
/// of truth for what happened" (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineAttempt {
    /// Which engine tier was tried.
    pub engine: Engine,
    /// The HTTP status the adapter returned, when applicable.
    pub status_code: Option<u16>,
    /// Detection signals observed (block markers, JS markers, exception
    /// class names, ...).
    pub signals: Vec<String>,
    /// What the orchestrator did as a result.
    pub decision: AttemptDecision,
    /// Convenience flag mirroring `decision == Success`.
    pub success: bool,
    /// When this attempt was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: time::OffsetDateTime,
}

/// One execution attempt of a [`crate::core::job::Job`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Opaque identifier.
    pub id: RunId,
    /// The Job this Run executes.
    pub job_id: JobId,
    /// The engine mode requested by the Job at Run creation time.
    pub requested_engine: Option<Engine>,
    /// The engine tier actually chosen at start (after routing + adaptive
    /// bias, spec §4.7 step 3).
    pub resolved_engine: Engine,
    /// How many escalations have occurred so far within this Run.
    pub attempt_count: u32,
    /// Upper bound on escalations (`default_max_attempts` config, or
    /// `MAX_ESCALATIONS = 3` when unset).
    pub max_attempts: u32,
    /// Current state-machine position.
    pub status: RunStatus,
    /// Populated only when `status == Failed`.
    pub failure_kind: Option<FailureKind>,
    /// Human-readable counterpart to `failure_kind`; populated whenever
    /// `failure_kind` is.
    pub error_message: Option<String>,
    /// Free-form statistics bag (records extracted, escalations, cost, ...).
    pub stats: serde_json::Value,
    /// Append-only, insertion-ordered log of every engine attempt.
    pub engine_attempts: Vec<EngineAttempt>,
    /// When the Run was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    /// When the Run was last mutated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: time::OffsetDateTime,
}

impl Run {
    /// Creates a fresh, `queued` Run for `job_id`.
    #[must_use]
    pub fn new(job_id: JobId, max_attempts: u32, now: time::OffsetDateTime) -> Self {
        Self {
            id: RunId::new(),
            job_id,
            requested_engine: None,
            resolved_engine: Engine::Http,
            attempt_count: 0,
            max_attempts,
            status: RunStatus::Queued,
            failure_kind: None,
            error_message: None,
            stats: serde_json::json!({}),
            engine_attempts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends an attempt to the log, keeping `updated_at` current.
    pub fn record_attempt(&mut self, attempt: EngineAttempt, now: time::OffsetDateTime) {
        self.engine_attempts.push(attempt);
        self.updated_at = now;
    }

    /// Transitions to `Completed`.
    pub fn complete(&mut self, now: time::OffsetDateTime) {
        self.status = RunStatus::Completed;
        self.updated_at = now;
    }

    /// Transitions to `Failed` with the given kind and message.
    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>, now: time::OffsetDateTime) {
        self.status = RunStatus::Failed;
        self.failure_kind = Some(kind);
        self.error_message = Some(message.into());
        self.updated_at = now;
    }

    /// Transitions to `WaitingForHuman`.
    pub fn pause(&mut self, now: time::OffsetDateTime) {
        self.status = RunStatus::WaitingForHuman;
        self.updated_at = now;
    }

    /// Transitions from `WaitingForHuman` back to `Queued`, out of band,
    /// when an intervention is resolved (spec §4.7).
    pub fn resume_to_queued(&mut self, now: time::OffsetDateTime) {
        self.status = RunStatus::Queued;
        self.updated_at = now;
    }
}
