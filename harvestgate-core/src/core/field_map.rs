// harvestgate-core/src/core/field_map.rs
// ============================================================================
// Module: FieldMap
// Description: Per-job, per-field selector/type/validation binding
//              (spec §3 "FieldMap").
// ============================================================================

use harvestgate_fields::FieldType;
use harvestgate_fields::SmartConfig;
use harvestgate_fields::ValidationRules;
use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::FieldMapId;
use crate::core::identifiers::JobId;

/// One entry in a [`FieldMap`]'s selector history: a prior selector string
/// and when it was superseded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorHistoryEntry {
    /// The selector that was in effect.
    pub selector: String,
    /// The version number this selector was current for.
    pub version: u32,
    /// When this entry was superseded by a newer selector.
    #[serde(with = "time::serde::rfc3339")]
    pub superseded_at: time::OffsetDateTime,
}

/// A per-job, per-field binding: how to extract the field, what type it is,
/// and how to validate it.
///
/// Invariant: `(job_id, field_name)` is unique. Invariant: selector updates
/// append to `history` and increment `version`; prior versions are never
/// deleted.
///
/// Resolves the "`|selector_history| == selector_version - 1` or
/// `== selector_version`" ambiguity as: **history excludes the current
/// selector**, so `history.len() == version - 1` always holds for
/// `version >= 1`. See `DESIGN.md`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMap {
    /// Opaque identifier.
    pub id: FieldMapId,
    /// The owning Job.
    pub job_id: JobId,
    /// The logical field name, unique within the Job.
    pub field_name: String,
    /// The selector currently in effect.
    pub selector: String,
    /// Monotone version counter; starts at 1 when the FieldMap is created.
    pub selector_version: u32,
    /// Prior selectors, oldest first, excluding the current one.
    pub history: Vec<SelectorHistoryEntry>,
    /// What type to parse the extracted raw string as.
    pub field_type: FieldType,
    /// Type-specific parsing configuration.
    pub smart_config: SmartConfig,
    /// Validation rules applied after parsing.
    pub validation_rules: ValidationRules,
}

impl FieldMap {
    /// Creates a fresh FieldMap at selector version 1 with empty history.
    #[must_use]
    pub fn new(
        job_id: JobId,
        field_name: impl Into<String>,
        selector: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        Self {
            id: FieldMapId::new(),
            job_id,
            field_name: field_name.into(),
            selector: selector.into(),
            selector_version: 1,
            history: Vec::new(),
            field_type,
            smart_config: SmartConfig::default(),
            validation_rules: ValidationRules::default(),
        }
    }

    /// Appends the current selector to history and installs `new_selector`
    /// as current, bumping the version. This is the only mutation path for
    /// `selector`; it never edits `history` entries after they are written.
    pub fn bump_selector(&mut self, new_selector: impl Into<String>, superseded_at: time::OffsetDateTime) {
        self.history.push(SelectorHistoryEntry {
            selector: std::mem::replace(&mut self.selector, new_selector.into()),
            version: self.selector_version,
            superseded_at,
        });
        self.selector_version += 1;
    }

    /// Checks the invariant `history.len() == selector_version - 1`.
    #[must_use]
    pub fn history_length_invariant_holds(&self) -> bool {
        self.history.len() as u32 + 1 == self.selector_version
    }

    /// The default selector used when a job lists a field with no explicit
    /// mapping, per spec §4.7 step 1: `h1` for `title`, empty otherwise.
    #[must_use]
    pub fn default_selector_for(field_name: &str) -> &'static str {
        if field_name == "title" { "h1" } else { "" }
    }
}
