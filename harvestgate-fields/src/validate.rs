// harvestgate-fields/src/validate.rs
// ============================================================================
// Module: Validation
// Description: Stage 4 of the pipeline — applies the rule set to an already
//              parsed value and appends error codes. Never rejects the
//              value outright; callers decide what to do with the errors.
// ============================================================================

use regex::Regex;

use crate::error::FieldError;
use crate::types::FieldType;
use crate::types::FieldValue;
use crate::types::ValidationRules;

/// The closed vocabulary of validation failure codes this module can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// `required` was set and no value was produced.
    RequiredMissing,
    /// A string value is shorter than `min_len`.
    TooShort,
    /// A string value is longer than `max_len`.
    TooLong,
    /// A numeric value is below `min_value`.
    BelowMinimum,
    /// A numeric value is above `max_value`.
    AboveMaximum,
    /// The value is not a member of `allowed_values`.
    NotAllowed,
    /// The value's host is not a member of `allowed_domains`.
    DomainNotAllowed,
    /// The value does not match the custom `pattern`.
    PatternMismatch,
}

impl ValidationErrorKind {
    /// The string code attached to [`crate::FieldResult::errors`].
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::RequiredMissing => "required_missing",
            Self::TooShort => "value_too_short",
            Self::TooLong => "value_too_long",
            Self::BelowMinimum => "value_below_minimum",
            Self::AboveMaximum => "value_above_maximum",
            Self::NotAllowed => "value_not_allowed",
            Self::DomainNotAllowed => "domain_not_allowed",
            Self::PatternMismatch => "pattern_mismatch",
        }
    }
}

fn as_text(value: &FieldValue) -> Option<&str> {
    match value {
        FieldValue::Text(s) => Some(s.as_str()),
        _ => None,
    }
}

fn as_number(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(n) => Some(*n),
        FieldValue::Integer(n) => {
            #[expect(clippy::cast_precision_loss, reason = "validation bounds are advisory, not exact")]
            let widened = *n as f64;
            Some(widened)
        }
        FieldValue::Money(m) => Some(m.amount),
        _ => None,
    }
}

fn domain_of(value: &str) -> Option<String> {
    let candidate = if value.contains("://") {
        value.to_string()
    } else {
        format!("https://{value}")
    };
    url::Url::parse(&candidate).ok().and_then(|u| u.host_str().map(str::to_string))
}

/// Applies `rules` to `value` (already produced by the parse stage for
/// `field_type`), appending a code into `errors` for each violated rule.
///
/// # Errors
///
/// Returns [`FieldError::InvalidPattern`] when `rules.pattern` fails to
/// compile as a regex; this is a configuration error, not a validation
/// failure, and the caller should treat it as fatal to the FieldMap rather
/// than recording it on the result.
pub fn apply(
    value: &FieldValue,
    field_type: FieldType,
    rules: &ValidationRules,
    errors: &mut Vec<String>,
) -> Result<(), FieldError> {
    // A blank raw never reaches this stage (pipeline's stage 1 handles it
    // and emits `required_missing` itself). If `value` is `Null` here, the
    // parse stage already rejected a non-blank raw and recorded its own
    // type-specific error, so `required_missing` would just double up.
    if rules.required && !value.is_present() && errors.is_empty() {
        errors.push(ValidationErrorKind::RequiredMissing.code().to_string());
    }

    if let Some(text) = as_text(value) {
        if let Some(min_len) = rules.min_len
            && text.chars().count() < min_len
        {
            errors.push(ValidationErrorKind::TooShort.code().to_string());
        }
        if let Some(max_len) = rules.max_len
            && text.chars().count() > max_len
        {
            errors.push(ValidationErrorKind::TooLong.code().to_string());
        }
        if let Some(allowed) = &rules.allowed_values
            && !allowed.iter().any(|a| a.eq_ignore_ascii_case(text))
        {
            errors.push(ValidationErrorKind::NotAllowed.code().to_string());
        }
        if matches!(field_type, FieldType::Email | FieldType::Url)
            && let Some(allowed_domains) = &rules.allowed_domains
        {
            let host = if field_type == FieldType::Email {
                text.split('@').nth(1).map(str::to_string)
            } else {
                domain_of(text)
            };
            let permitted = host.is_some_and(|h| allowed_domains.iter().any(|d| d.eq_ignore_ascii_case(&h)));
            if !permitted {
                errors.push(ValidationErrorKind::DomainNotAllowed.code().to_string());
            }
        }
        if let Some(pattern) = &rules.pattern {
            let re = Regex::new(pattern).map_err(|source| FieldError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            if !re.is_match(text) {
                errors.push(ValidationErrorKind::PatternMismatch.code().to_string());
            }
        }
    }

    if let Some(n) = as_number(value) {
        if let Some(min_value) = rules.min_value
            && n < min_value
        {
            errors.push(ValidationErrorKind::BelowMinimum.code().to_string());
        }
        if let Some(max_value) = rules.max_value
            && n > max_value
        {
            errors.push(ValidationErrorKind::AboveMaximum.code().to_string());
        }
    }

    Ok(())
}
