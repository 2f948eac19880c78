// harvestgate-core/src/confidence_filter.rs
// ============================================================================
// Module: Confidence filter
// Description: Post-pipeline disposition for low-confidence Records in list
//              crawls.
// ============================================================================

//! ## Overview
//! Grounded on `app/services/confidence_filter.py`'s "low confidence required
//! fields → no_match" behavior, simplified to a single-Record, single-floor
//! shape: a Record below the floor is dropped
//! outright if it also carries parse/validation errors, or flagged for
//! review if it is merely uncertain but internally clean. The orchestrator
//! (C7) invokes this only in `list` crawl mode — single-item Jobs always
//! keep their one Record.

use crate::core::Record;

/// What to do with a Record after [`filter_low_confidence`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDisposition {
    /// Confidence clears the floor; persist normally.
    Keep,
    /// Below the floor but every field is otherwise clean; persist but mark
    /// for human review rather than silently dropping possibly-useful data.
    Flag,
    /// Below the floor and at least one field carries a parse/validation
    /// error; drop rather than persist noise.
    Drop,
}

/// Decides the disposition of `record` given a confidence `floor` in
/// `[0, 1]`.
#[must_use]
pub fn filter_low_confidence(record: &Record, floor: f64) -> RecordDisposition {
    if record.min_confidence() >= floor {
        return RecordDisposition::Keep;
    }
    if record.all_clean() {
        RecordDisposition::Flag
    } else {
        RecordDisposition::Drop
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use harvestgate_fields::FieldResult;
    use harvestgate_fields::FieldType;
    use harvestgate_fields::FieldValue;

    use super::*;
    use crate::core::identifiers::RunId;

    fn field(confidence: f64, errors: Vec<String>) -> FieldResult {
        FieldResult {
            value: FieldValue::Text("x".to_string()),
            raw: "x".to_string(),
            confidence,
            reasons: Vec::new(),
            errors,
            field_type: FieldType::String,
        }
    }

    fn record_with(fields: BTreeMap<String, FieldResult>) -> Record {
        Record::new(RunId::new(), 0, fields)
    }

    #[test]
    fn high_confidence_record_is_kept() {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), field(0.9, Vec::new()));
        assert_eq!(filter_low_confidence(&record_with(fields), 0.7), RecordDisposition::Keep);
    }

    #[test]
    fn low_confidence_clean_record_is_flagged() {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), field(0.4, Vec::new()));
        assert_eq!(filter_low_confidence(&record_with(fields), 0.7), RecordDisposition::Flag);
    }

    #[test]
    fn low_confidence_record_with_errors_is_dropped() {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), field(0.4, vec!["required_missing".to_string()]));
        assert_eq!(filter_low_confidence(&record_with(fields), 0.7), RecordDisposition::Drop);
    }

    #[test]
    fn empty_record_is_kept() {
        assert_eq!(filter_low_confidence(&record_with(BTreeMap::new()), 0.7), RecordDisposition::Keep);
    }
}
