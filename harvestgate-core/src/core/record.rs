// harvestgate-core/src/core/record.rs
// ============================================================================
// Module: Record
// Description: One extracted item belonging to exactly one Run
//              (spec §3 "Record").
// ============================================================================

use std::collections::BTreeMap;

use harvestgate_fields::FieldResult;
use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RecordId;
use crate::core::identifiers::RunId;

/// One extracted item. Records are never mutated after insert; the map from
/// field name to typed value doubles as its own evidence map, since
/// [`FieldResult`] already carries confidence/reasons/errors (spec §9: "the
/// evidence map becomes a parallel typed structure, not a reflection-based
/// side channel").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Opaque identifier.
    pub id: RecordId,
    /// The Run this Record belongs to.
    pub run_id: RunId,
    /// Insertion order within the Run; Records are ordered by this.
    pub sequence: u32,
    /// Field name to evidence-bearing typed value.
    pub fields: BTreeMap<String, FieldResult>,
}

impl Record {
    /// Creates a new Record at the given insertion sequence.
    #[must_use]
    pub fn new(run_id: RunId, sequence: u32, fields: BTreeMap<String, FieldResult>) -> Self {
        Self {
            id: RecordId::new(),
            run_id,
            sequence,
            fields,
        }
    }

    /// True when every required field in `fields` is error-free.
    #[must_use]
    pub fn all_clean(&self) -> bool {
        self.fields.values().all(FieldResult::is_clean)
    }

    /// The lowest confidence across all fields, or `1.0` for an empty
    /// Record.
    #[must_use]
    pub fn min_confidence(&self) -> f64 {
        self.fields.values().map(|f| f.confidence).fold(1.0, f64::min)
    }
}
