// harvestgate-fields/src/pipeline.rs
// ============================================================================
// Module: Pipeline
// Description: Runs the six ordered stages over one (field_name, raw_string)
//              pair and returns the FieldResult. No I/O; deterministic.
// ============================================================================

use crate::consensus;
use crate::consensus::ConsensusContext;
use crate::error::FieldError;
use crate::parse;
use crate::score;
use crate::types::FieldResult;
use crate::types::FieldType;
use crate::types::FieldValue;
use crate::types::SmartConfig;
use crate::types::ValidationRules;
use crate::validate;

/// Runs the field pipeline for one field.
///
/// `raw` is the as-extracted string (or `None`/empty when the selector
/// matched nothing). `consensus_ctx`, when supplied and non-empty, drives
/// the optional multi-source consensus stage.
///
/// # Errors
///
/// Returns [`FieldError`] only for a pipeline misconfiguration (a malformed
/// custom regex in `rules.pattern`); per-value parse/validation problems are
/// never errors here, only entries in the returned [`FieldResult::errors`].
pub fn run_pipeline(
    raw: Option<&str>,
    field_type: FieldType,
    smart: &SmartConfig,
    rules: &ValidationRules,
    consensus_ctx: Option<&ConsensusContext>,
) -> Result<FieldResult, FieldError> {
    let trimmed = raw.map(str::trim).unwrap_or_default();

    // Stage 1: empty handling.
    if trimmed.is_empty() {
        return Ok(if rules.required {
            FieldResult {
                value: FieldValue::Null,
                raw: String::new(),
                confidence: 0.0,
                reasons: Vec::new(),
                errors: vec!["required_missing".to_string()],
                field_type,
            }
        } else {
            FieldResult {
                value: FieldValue::Null,
                raw: String::new(),
                confidence: 1.0,
                reasons: vec!["optional_not_provided".to_string()],
                errors: Vec::new(),
                field_type,
            }
        });
    }

    // Stage 2 (clean) already folded into `trimmed`.
    // Stage 3: parse.
    let outcome = parse::parse(field_type, trimmed, smart);
    let mut value = outcome.value;
    let mut reasons = outcome.reasons;
    let mut errors = outcome.errors;

    // Stage 4: validate.
    validate::apply(&value, field_type, rules, &mut errors)?;

    // Stage 5: multi-source consensus (optional).
    let mut consensus_bonus = 0.0;
    if let Some(ctx) = consensus_ctx
        && !ctx.is_empty()
    {
        let primary_raw = value.is_present().then_some(trimmed);
        if let Some(result) = consensus::evaluate(primary_raw, ctx) {
            consensus_bonus = result.bonus;
            if result.promoted {
                value = FieldValue::Text(result.value);
                reasons.push("promoted_from_consensus".to_string());
            } else {
                value = FieldValue::Text(result.value);
            }
            reasons.push("multi_source_consensus_agreement".to_string());
        }
    }

    // Stage 6: score.
    let confidence = score::score(trimmed, &value, &reasons, &errors, consensus_bonus);

    Ok(FieldResult {
        value,
        raw: trimmed.to_string(),
        confidence,
        reasons,
        errors,
        field_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_missing_field_has_zero_confidence() {
        let rules = ValidationRules {
            required: true,
            ..ValidationRules::default()
        };
        let result = run_pipeline(None, FieldType::Email, &SmartConfig::default(), &rules, None).expect("ok");
        assert_eq!(result.value, FieldValue::Null);
        assert!((result.confidence - 0.0).abs() < f64::EPSILON);
        assert_eq!(result.errors, vec!["required_missing".to_string()]);
    }

    #[test]
    fn optional_missing_field_is_clean() {
        let rules = ValidationRules::default();
        let result = run_pipeline(None, FieldType::Email, &SmartConfig::default(), &rules, None).expect("ok");
        assert!(result.errors.is_empty());
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_required_email_stays_low_confidence_and_null() {
        let rules = ValidationRules {
            required: true,
            ..ValidationRules::default()
        };
        let result = run_pipeline(
            Some("john at example dot com"),
            FieldType::Email,
            &SmartConfig::default(),
            &rules,
            None,
        )
        .expect("ok");
        assert_eq!(result.value, FieldValue::Null);
        assert_eq!(result.errors, vec!["invalid_email_format".to_string()]);
    }

    #[test]
    fn already_normalized_value_round_trips_at_full_confidence() {
        let rules = ValidationRules::default();
        let result = run_pipeline(
            Some("widget@example.com"),
            FieldType::Email,
            &SmartConfig::default(),
            &rules,
            None,
        )
        .expect("ok");
        assert!(result.is_clean());
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn consensus_promotes_null_primary() {
        let mut ctx = ConsensusContext::new();
        ctx.push(consensus::ConsensusSource::JsonLd, "Acme Corp");
        ctx.push(consensus::ConsensusSource::OpenGraph, "acme corp");
        let rules = ValidationRules::default();
        let result = run_pipeline(None, FieldType::Company, &SmartConfig::default(), &rules, Some(&ctx)).expect("ok");
        assert_eq!(result.value, FieldValue::Text("Acme Corp".to_string()));
        assert!(result.reasons.contains(&"promoted_from_consensus".to_string()));
    }
}

#[cfg(test)]
mod pipeline_invariants {
    use proptest::prelude::*;

    use super::run_pipeline;
    use crate::types::FieldType;
    use crate::types::SmartConfig;
    use crate::types::ValidationRules;

    proptest! {
        /// Spec §8 "Field pipeline on any already-normalized value returns the
        /// same value with `confidence = 1.0` and no errors" — exercised here
        /// over every already-normalized integer string the parser accepts.
        #[test]
        fn normalized_integer_round_trips_at_full_confidence(n in -1_000_000_i64..1_000_000_i64) {
            let raw = n.to_string();
            let rules = ValidationRules::default();
            let result = run_pipeline(Some(&raw), FieldType::Integer, &SmartConfig::default(), &rules, None)
                .expect("pipeline is infallible for well-formed integer rules");
            prop_assert!(result.is_clean());
            prop_assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        }

        /// Local usernames made of ASCII alphanumerics plus dot/underscore
        /// stay untouched by the email parser: it only lowercases/trims, so
        /// an already-lowercase, already-trimmed address is a fixed point.
        #[test]
        fn normalized_lowercase_email_round_trips_at_full_confidence(
            user in "[a-z][a-z0-9._]{0,12}",
            domain in "[a-z][a-z0-9-]{0,8}",
            tld in "[a-z]{2,4}",
        ) {
            let raw = format!("{user}@{domain}.{tld}");
            let rules = ValidationRules::default();
            let result = run_pipeline(Some(&raw), FieldType::Email, &SmartConfig::default(), &rules, None)
                .expect("pipeline is infallible for well-formed email rules");
            prop_assert!(result.is_clean());
            prop_assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        }

        /// Running the pipeline twice on the same raw input is idempotent:
        /// no hidden mutable state leaks between calls (spec §8 "Escalation
        /// policy is deterministic and idempotent" generalizes to every pure
        /// component, including the field pipeline).
        #[test]
        fn pipeline_is_idempotent_given_identical_inputs(n in -1_000_i64..1_000_i64) {
            let raw = n.to_string();
            let rules = ValidationRules::default();
            let first = run_pipeline(Some(&raw), FieldType::Integer, &SmartConfig::default(), &rules, None)
                .expect("pipeline is infallible for well-formed integer rules");
            let second = run_pipeline(Some(&raw), FieldType::Integer, &SmartConfig::default(), &rules, None)
                .expect("pipeline is infallible for well-formed integer rules");
            prop_assert_eq!(first.value, second.value);
            prop_assert!((first.confidence - second.confidence).abs() < f64::EPSILON);
        }
    }
}
