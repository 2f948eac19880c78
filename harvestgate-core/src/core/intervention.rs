// harvestgate-core/src/core/intervention.rs
// ============================================================================
// Module: InterventionTask
// Description: Pause record for a Run (spec §3 "InterventionTask", §4.6).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::InterventionTaskId;
use crate::core::identifiers::RunId;

/// The closed set of intervention kinds (spec §3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    /// A low-confidence or missing selector result needs a human fix.
    SelectorFix,
    /// A required field extracted at low confidence needs confirmation.
    FieldConfirm,
    /// A stored session is stale or invalid and needs a fresh login.
    LoginRefresh,
    /// The domain cannot be reached by any engine without a human present.
    ManualAccess,
    /// A CAPTCHA challenge needs to be solved by a human.
    CaptchaSolve,
}

/// Lifecycle status of an [`InterventionTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionStatus {
    /// Created, not yet picked up.
    Pending,
    /// A human has started working on it.
    InProgress,
    /// Resolved; `apply_resolution` has run.
    Completed,
    /// `expires_at` passed with no resolution; the Run is not resumed.
    Expired,
    /// Withdrawn without resolution.
    Cancelled,
}

impl InterventionStatus {
    /// True for the two statuses that keep a Run in `waiting_for_human`
    /// (spec §3 invariant).
    #[must_use]
    pub const fn keeps_run_paused(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

/// Priority assigned to an [`InterventionTask`] (spec §3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionPriority {
    /// Routine; no rush.
    Low,
    /// Default priority.
    Normal,
    /// Blocks meaningful progress on the domain.
    High,
    /// Blocks the Run entirely and likely blocks sibling Runs.
    Critical,
}

/// The closed vocabulary of trigger reasons a task may carry (spec §7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// Required field confidence fell below threshold.
    LowConfidence,
    /// A selector produced zero matches.
    SelectorDrift,
    /// The Job's auth requirement could not be satisfied.
    AuthExpired,
    /// The run-loop block classifier observed a hard block with no session.
    HardBlock,
    /// A CAPTCHA challenge was detected.
    CaptchaDetected,
    /// A 403 response with no usable session.
    ForbiddenNoSession,
    /// A 403 response with a session that is no longer trusted.
    ForbiddenSessionInvalid,
    /// A 401 response.
    Unauthorized,
    /// A non-public domain returned 200 with zero extracted items.
    NoItemsExtracted,
}

/// A per-kind outcome recorded when a human resolves a task, consumed by
/// `apply_resolution` (spec §4.6) to decide which new version to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// A human edited the selector; `apply_resolution` bumps the FieldMap.
    SelectorEdited {
        /// The replacement selector.
        new_selector: String,
    },
    /// A human confirmed or corrected a low-confidence field value.
    FieldConfirmed {
        /// The value the human confirmed.
        confirmed_value: serde_json::Value,
        /// `true` when the human also wants a standing normalization rule
        /// recorded (produces a [`super::rule_candidate::RuleCandidate`]).
        promote_to_rule: bool,
    },
    /// A human refreshed the login and captured a new session.
    SessionRefreshed {
        /// Opaque cookies/storage blob captured from the refreshed login.
        session_payload: serde_json::Value,
    },
    /// A human solved the CAPTCHA in place; no new version is created.
    CaptchaSolved,
    /// A human granted manual access (e.g. whitelisted the run); no new
    /// version is created.
    ManualAccessGranted,
    /// A human declined to resolve; the Run stays failed/cancelled.
    Declined {
        /// Free-form reason for the record.
        reason: String,
    },
}

/// A pause record for a [`crate::core::run::Run`].
///
/// Invariant: exactly one task with `status in {pending, in_progress}` may
/// exist per Run at a time; that invariant also ties
/// `Run.status == waiting_for_human` to this task's existence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionTask {
    /// Opaque identifier.
    pub id: InterventionTaskId,
    /// The Run this task pauses.
    pub run_id: RunId,
    /// What kind of human action is needed.
    pub kind: InterventionKind,
    /// Current lifecycle status.
    pub status: InterventionStatus,
    /// Why the task was created.
    pub trigger_reason: TriggerReason,
    /// How urgently it should be worked.
    pub priority: InterventionPriority,
    /// Kind-specific opaque payload for the UI.
    pub payload: serde_json::Value,
    /// Populated once a human has resolved the task.
    pub resolution: Option<Resolution>,
    /// When the task was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    /// When the task was last mutated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: time::OffsetDateTime,
    /// Optional deadline; a background sweep expires pending tasks past
    /// this point without resuming the Run (spec §5).
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<time::OffsetDateTime>,
}

impl InterventionTask {
    /// Creates a fresh, `pending` task.
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "one argument per InterventionTask field, no natural grouping")]
    pub fn new(
        run_id: RunId,
        kind: InterventionKind,
        trigger_reason: TriggerReason,
        priority: InterventionPriority,
        payload: serde_json::Value,
        expires_at: Option<time::OffsetDateTime>,
        now: time::OffsetDateTime,
    ) -> Self {
        Self {
            id: InterventionTaskId::new(),
            run_id,
            kind,
            status: InterventionStatus::Pending,
            trigger_reason,
            priority,
            payload,
            resolution: None,
            created_at: now,
            updated_at: now,
            expires_at,
        }
    }

    /// Marks the task resolved, recording the human's [`Resolution`].
    pub fn resolve(&mut self, resolution: Resolution, now: time::OffsetDateTime) {
        self.resolution = Some(resolution);
        self.status = InterventionStatus::Completed;
        self.updated_at = now;
    }

    /// Marks the task expired in place, per the background sweep (spec §5):
    /// "moves expired pending tasks to `expired` without resuming the Run."
    pub fn expire(&mut self, now: time::OffsetDateTime) {
        self.status = InterventionStatus::Expired;
        self.updated_at = now;
    }

    /// True when `now` is past `expires_at` and the task is still pending.
    #[must_use]
    pub fn is_overdue(&self, now: time::OffsetDateTime) -> bool {
        self.status == InterventionStatus::Pending && self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_run_paused_only_for_pending_and_in_progress() {
        assert!(InterventionStatus::Pending.keeps_run_paused());
        assert!(InterventionStatus::InProgress.keeps_run_paused());
        assert!(!InterventionStatus::Completed.keeps_run_paused());
        assert!(!InterventionStatus::Expired.keeps_run_paused());
        assert!(!InterventionStatus::Cancelled.keeps_run_paused());
    }

    #[test]
    fn resolving_moves_to_completed_and_unblocks_run() {
        let mut task = InterventionTask::new(
            RunId::new(),
            InterventionKind::FieldConfirm,
            TriggerReason::LowConfidence,
            InterventionPriority::Normal,
            serde_json::json!({}),
            None,
            time::OffsetDateTime::UNIX_EPOCH,
        );
        assert!(task.status.keeps_run_paused());
        task.resolve(Resolution::CaptchaSolved, time::OffsetDateTime::UNIX_EPOCH);
        assert!(!task.status.keeps_run_paused());
    }
}
