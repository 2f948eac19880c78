// harvestgate-core/src/intervention_engine.rs
// ============================================================================
// Module: Intervention engine (C6)
// Description: Pure classifiers that decide whether a Run pauses for a
//              human, plus the run-loop block classifier (spec §4.6).
// ============================================================================

//! ## Overview
//! Four named classifiers each produce an [`InterventionSpec`] (or `None`);
//! a fifth, distinct function (`classify_block`) is consulted by the
//! orchestrator directly from an engine adapter's response rather than from
//! any of the four. None of these touch storage — the orchestrator (C7)
//! turns a `Some(InterventionSpec)` into a persisted
//! [`crate::core::InterventionTask`] via `create`.

use harvestgate_fields::FieldResult;

use crate::core::DomainAccessClass;
use crate::core::EngineAttempt;
use crate::core::InterventionKind;
use crate::core::InterventionPriority;
use crate::core::Job;
use crate::core::Run;
use crate::core::TriggerReason;

/// Confidence floor below which a required field triggers `field_confirm`
/// (spec §4.6).
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.75;
/// Confidence floor below which that intervention is `high` rather than
/// `normal` priority (spec §4.6).
pub const HIGH_PRIORITY_CONFIDENCE_THRESHOLD: f64 = 0.5;
/// Minimum attempts logged before `hard_block` can fire (spec §4.6).
pub const HARD_BLOCK_MIN_ATTEMPTS: usize = 3;
/// Minimum attempts among those that must carry a block signal (spec §4.6).
pub const HARD_BLOCK_MIN_BLOCKED_ATTEMPTS: usize = 2;
/// Rolling 403 rate above which the run-loop block classifier escalates a
/// task's priority to `critical`.
pub const HIGH_BLOCK_RATE_THRESHOLD: f64 = 0.7;

/// What a C6 classifier emits when it decides a pause is warranted: enough
/// for the orchestrator to build an [`crate::core::InterventionTask`]
/// without re-deriving the decision.
#[derive(Debug, Clone, PartialEq)]
pub struct InterventionSpec {
    /// What kind of task to create.
    pub kind: InterventionKind,
    /// Why it was created.
    pub trigger_reason: TriggerReason,
    /// How urgently it should be worked.
    pub priority: InterventionPriority,
    /// Kind-specific payload for the UI.
    pub payload: serde_json::Value,
}

/// `field_confirm` when a required field's pipeline confidence falls below
/// [`LOW_CONFIDENCE_THRESHOLD`] (spec §4.6 `low_confidence`).
#[must_use]
pub fn low_confidence(field_name: &str, field_result: &FieldResult, is_required: bool) -> Option<InterventionSpec> {
    if !is_required || field_result.confidence >= LOW_CONFIDENCE_THRESHOLD {
        return None;
    }
    let priority = if field_result.confidence < HIGH_PRIORITY_CONFIDENCE_THRESHOLD {
        InterventionPriority::High
    } else {
        InterventionPriority::Normal
    };
    Some(InterventionSpec {
        kind: InterventionKind::FieldConfirm,
        trigger_reason: TriggerReason::LowConfidence,
        priority,
        payload: serde_json::json!({
            "field_name": field_name,
            "raw": field_result.raw,
            "parsed": field_result.value,
            "confidence": field_result.confidence,
            "reasons": field_result.reasons,
            "errors": field_result.errors,
            "field_type": field_result.field_type.tag(),
        }),
    })
}

/// `selector_fix` when a selector produced zero matches (spec §4.6
/// `selector_drift`). `page_html` is truncated to
/// [`crate::core::MAX_SNAPSHOT_BYTES`] before being embedded in the payload.
#[must_use]
pub fn selector_drift(field_name: &str, selector: &str, page_html: &str, extraction_count: usize) -> Option<InterventionSpec> {
    if extraction_count != 0 {
        return None;
    }
    let selector_hash = short_hash(selector);
    let snapshot = crate::core::truncate_snapshot(page_html);
    Some(InterventionSpec {
        kind: InterventionKind::SelectorFix,
        trigger_reason: TriggerReason::SelectorDrift,
        priority: InterventionPriority::High,
        payload: serde_json::json!({
            "field_name": field_name,
            "old_selector": selector,
            "old_selector_hash": selector_hash,
            "page_snapshot": snapshot,
            "extraction_count": extraction_count,
        }),
    })
}

/// Truncated hash used to identify a selector in intervention payloads
/// without embedding the full selector string repeatedly in logs.
#[must_use]
fn short_hash(selector: &str) -> String {
    use sha2::Digest;
    let digest = sha2::Sha256::digest(selector.as_bytes());
    digest.iter().take(8).map(|byte| format!("{byte:02x}")).collect()
}

/// Failure codes that, for an auth-requiring Job, trigger `login_refresh`
/// (spec §4.6 `auth_expired`).
const AUTH_FAILURE_CODES: &[&str] = &["auth_expired", "unauthorized", "forbidden"];

/// `login_refresh` when `failure_code` is auth-related and the Job requires
/// auth (spec §4.6 `auth_expired`).
#[must_use]
pub fn auth_expired(failure_code: &str, job: &Job, run: &Run) -> Option<InterventionSpec> {
    if !job.requires_auth || !AUTH_FAILURE_CODES.contains(&failure_code) {
        return None;
    }
    Some(InterventionSpec {
        kind: InterventionKind::LoginRefresh,
        trigger_reason: TriggerReason::AuthExpired,
        priority: InterventionPriority::Critical,
        payload: serde_json::json!({
            "job_id": job.id,
            "run_id": run.id,
            "failure_code": failure_code,
            "target_url": job.target_url,
        }),
    })
}

/// `manual_access` when the attempts log has at least
/// [`HARD_BLOCK_MIN_ATTEMPTS`] entries and at least
/// [`HARD_BLOCK_MIN_BLOCKED_ATTEMPTS`] of them carry a block signal (spec
/// §4.6 `hard_block`). A signal counts as "block" when it begins with
/// `status_4` (a 401/403/429 status signal) or is exactly `"blocked_detected"`.
#[must_use]
pub fn hard_block(engine_attempts: &[EngineAttempt], job: &Job, run: &Run) -> Option<InterventionSpec> {
    if engine_attempts.len() < HARD_BLOCK_MIN_ATTEMPTS {
        return None;
    }
    let blocked_attempts = engine_attempts
        .iter()
        .filter(|attempt| attempt.signals.iter().any(|signal| signal.starts_with("status_4") || signal == "blocked_detected"))
        .count();
    if blocked_attempts < HARD_BLOCK_MIN_BLOCKED_ATTEMPTS {
        return None;
    }
    Some(InterventionSpec {
        kind: InterventionKind::ManualAccess,
        trigger_reason: TriggerReason::HardBlock,
        priority: InterventionPriority::Critical,
        payload: serde_json::json!({
            "job_id": job.id,
            "run_id": run.id,
            "attempt_count": engine_attempts.len(),
            "blocked_attempt_count": blocked_attempts,
        }),
    })
}

/// Whether a stored session is present for the target, passed into
/// [`classify_block`] by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPresence {
    /// A session was used/available for this attempt.
    Present,
    /// No session was available.
    Absent,
}

/// The run-loop block classifier's decision: whether the Run should pause,
/// and if so, which kind and why (spec §4.6, distinct from the four pure
/// classifiers above).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDecision {
    /// `true` when the Run should pause for a human.
    pub should_pause: bool,
    /// The kind to create, when `should_pause`.
    pub kind: Option<InterventionKind>,
    /// The trigger reason, when `should_pause`.
    pub reason: Option<TriggerReason>,
}

impl BlockDecision {
    const fn no_pause() -> Self {
        Self {
            should_pause: false,
            kind: None,
            reason: None,
        }
    }

    const fn pause(kind: InterventionKind, reason: TriggerReason) -> Self {
        Self {
            should_pause: true,
            kind: Some(kind),
            reason: Some(reason),
        }
    }
}

/// Maps `(response_code, error_message, has_session, access_class)` to a
/// pause decision (spec §4.6, the block classifier used during the run
/// loop): 403 with session -> `login_refresh`; 403 without -> `manual_access`;
/// 401 -> `login_refresh`; a CAPTCHA mention -> `captcha_solve`; a
/// Cloudflare/challenge mention -> `manual_access`; zero items on 200 for a
/// non-public domain -> `selector_fix`; 429/network/timeout/unknown -> never
/// pause.
#[must_use]
pub fn classify_block(
    response_code: Option<u16>,
    error_message: Option<&str>,
    has_session: SessionPresence,
    access_class: DomainAccessClass,
    extracted_count: usize,
) -> BlockDecision {
    let message_lower = error_message.map(str::to_lowercase).unwrap_or_default();

    if message_lower.contains("captcha") {
        return BlockDecision::pause(InterventionKind::CaptchaSolve, TriggerReason::CaptchaDetected);
    }
    if message_lower.contains("cloudflare") || message_lower.contains("challenge") {
        return BlockDecision::pause(InterventionKind::ManualAccess, TriggerReason::ForbiddenNoSession);
    }

    match response_code {
        Some(401) => BlockDecision::pause(InterventionKind::LoginRefresh, TriggerReason::Unauthorized),
        Some(403) => match has_session {
            SessionPresence::Present => BlockDecision::pause(InterventionKind::LoginRefresh, TriggerReason::ForbiddenSessionInvalid),
            SessionPresence::Absent => BlockDecision::pause(InterventionKind::ManualAccess, TriggerReason::ForbiddenNoSession),
        },
        Some(200) => {
            if extracted_count == 0 && access_class != DomainAccessClass::Public {
                BlockDecision::pause(InterventionKind::SelectorFix, TriggerReason::NoItemsExtracted)
            } else {
                BlockDecision::no_pause()
            }
        }
        _ => BlockDecision::no_pause(),
    }
}

/// The priority a freshly created block-classifier task should carry:
/// `manual_access`/`captcha_solve` default to `high`, `login_refresh` to
/// `low`, `selector_fix` to `normal`;
/// any kind escalates to `critical` when the domain's rolling 403 rate
/// exceeds [`HIGH_BLOCK_RATE_THRESHOLD`].
#[must_use]
pub fn block_task_priority(kind: InterventionKind, rolling_403_rate: f64) -> InterventionPriority {
    if rolling_403_rate > HIGH_BLOCK_RATE_THRESHOLD {
        return InterventionPriority::Critical;
    }
    match kind {
        InterventionKind::ManualAccess | InterventionKind::CaptchaSolve => InterventionPriority::High,
        InterventionKind::LoginRefresh => InterventionPriority::Low,
        InterventionKind::SelectorFix | InterventionKind::FieldConfirm => InterventionPriority::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvestgate_fields::FieldType;
    use harvestgate_fields::FieldValue;

    fn field_result(confidence: f64) -> FieldResult {
        FieldResult {
            value: FieldValue::Text("john at example dot com".to_string()),
            raw: "john at example dot com".to_string(),
            confidence,
            reasons: Vec::new(),
            errors: vec!["invalid_email_format".to_string()],
            field_type: FieldType::Email,
        }
    }

    #[test]
    fn low_confidence_fires_only_when_required_and_below_threshold() {
        assert!(low_confidence("email", &field_result(0.9), true).is_none());
        assert!(low_confidence("email", &field_result(0.6), false).is_none());
        let spec = low_confidence("email", &field_result(0.6), true).expect("fires");
        assert_eq!(spec.priority, InterventionPriority::Normal);
        let spec = low_confidence("email", &field_result(0.3), true).expect("fires");
        assert_eq!(spec.priority, InterventionPriority::High);
    }

    #[test]
    fn selector_drift_fires_only_on_zero_extraction() {
        assert!(selector_drift("title", "h1", "<html></html>", 1).is_none());
        let spec = selector_drift("title", "h1", "<html></html>", 0).expect("fires");
        assert_eq!(spec.kind, InterventionKind::SelectorFix);
    }

    #[test]
    fn classify_block_403_with_session_is_login_refresh() {
        let decision = classify_block(Some(403), None, SessionPresence::Present, DomainAccessClass::Human, 0);
        assert!(decision.should_pause);
        assert_eq!(decision.kind, Some(InterventionKind::LoginRefresh));
    }

    #[test]
    fn classify_block_403_without_session_is_manual_access() {
        let decision = classify_block(Some(403), None, SessionPresence::Absent, DomainAccessClass::Human, 0);
        assert_eq!(decision.kind, Some(InterventionKind::ManualAccess));
    }

    #[test]
    fn classify_block_429_never_pauses() {
        let decision = classify_block(Some(429), None, SessionPresence::Absent, DomainAccessClass::Human, 0);
        assert!(!decision.should_pause);
    }

    #[test]
    fn classify_block_200_zero_items_on_human_domain_is_selector_fix() {
        let decision = classify_block(Some(200), None, SessionPresence::Absent, DomainAccessClass::Human, 0);
        assert_eq!(decision.kind, Some(InterventionKind::SelectorFix));
    }

    #[test]
    fn classify_block_200_zero_items_on_public_domain_does_not_pause() {
        let decision = classify_block(Some(200), None, SessionPresence::Absent, DomainAccessClass::Public, 0);
        assert!(!decision.should_pause);
    }

    #[test]
    fn classify_block_captcha_mention_pauses_regardless_of_status() {
        let decision = classify_block(Some(200), Some("CAPTCHA required"), SessionPresence::Absent, DomainAccessClass::Public, 1);
        assert_eq!(decision.kind, Some(InterventionKind::CaptchaSolve));
    }

    #[test]
    fn block_task_priority_escalates_to_critical_on_high_block_rate() {
        assert_eq!(block_task_priority(InterventionKind::LoginRefresh, 0.9), InterventionPriority::Critical);
        assert_eq!(block_task_priority(InterventionKind::LoginRefresh, 0.1), InterventionPriority::Low);
    }
}
