// harvestgate-core/src/core/rule_candidate.rs
// ============================================================================
// Module: RuleCandidate
// Description: Standing normalization override produced by
//              resolving a `field_confirm` intervention (spec §4.6).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::InterventionTaskId;
use crate::core::identifiers::JobId;
use crate::core::identifiers::RuleCandidateId;

/// What a [`RuleCandidate`] changes about future extractions of a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCandidateKind {
    /// Always substitute `value` for the parsed result of this field,
    /// bypassing the pipeline's own parse stage going forward.
    NormalizationOverride {
        /// The standing override value.
        value: serde_json::Value,
    },
    /// Demote the field from required to optional for this Job.
    FieldOptional,
}

/// A human-authored rule produced by resolving an intervention with
/// `promote_to_rule: true` (spec §4.6: "`apply_resolution` ... mutates
/// system state by creating new versions ... rather than editing historical
/// rows"). Append-only; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCandidate {
    /// Opaque identifier.
    pub id: RuleCandidateId,
    /// The Job this rule applies to.
    pub job_id: JobId,
    /// The field the rule governs.
    pub field_name: String,
    /// What the rule does.
    pub kind: RuleCandidateKind,
    /// When the rule was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    /// The intervention task whose resolution produced this rule.
    pub source_task_id: InterventionTaskId,
}

impl RuleCandidate {
    /// Creates a fresh rule candidate.
    #[must_use]
    pub fn new(
        job_id: JobId,
        field_name: impl Into<String>,
        kind: RuleCandidateKind,
        source_task_id: InterventionTaskId,
        now: time::OffsetDateTime,
    ) -> Self {
        Self {
            id: RuleCandidateId::new(),
            job_id,
            field_name: field_name.into(),
            kind,
            created_at: now,
            source_task_id,
        }
    }
}
