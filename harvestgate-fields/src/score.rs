// harvestgate-fields/src/score.rs
// ============================================================================
// Module: Confidence Scoring
// Description: Stage 6 of the pipeline — turns reasons/errors into a single
//              confidence number in [0, 1].
// ============================================================================

use crate::types::FieldValue;
use crate::types::Money;

const ERROR_PENALTY: f64 = 0.2;
const REASON_BONUS: f64 = 0.05;
const SHRINK_PENALTY: f64 = 0.1;

fn rendered_len(value: &FieldValue) -> Option<usize> {
    match value {
        FieldValue::Null => None,
        FieldValue::Text(s) => Some(s.len()),
        FieldValue::Number(n) => Some(format!("{n}").len()),
        FieldValue::Integer(n) => Some(format!("{n}").len()),
        FieldValue::Money(Money { amount, currency }) => Some(format!("{amount}{currency}").len()),
        FieldValue::Boolean(b) => Some(format!("{b}").len()),
    }
}

/// Computes the final confidence for a field result.
///
/// `raw` is the trimmed raw input; `value` is the (possibly
/// consensus-promoted) parsed value; `reasons`/`errors` are the signals
/// accumulated across parse and validate; `consensus_bonus` is the `+0.2`/
/// `+0.3` reward from the (separately reasoned) consensus stage, kept apart
/// from the generic per-reason bonus since its magnitude is fixed by the
/// agreement count rather than by reason count.
#[must_use]
pub fn score(raw: &str, value: &FieldValue, reasons: &[String], errors: &[String], consensus_bonus: f64) -> f64 {
    #[expect(clippy::cast_precision_loss, reason = "counts are small; precision loss is not observable")]
    let mut confidence =
        1.0 - ERROR_PENALTY * errors.len() as f64 + REASON_BONUS * reasons.len() as f64 + consensus_bonus;

    if let Some(len) = rendered_len(value)
        && !raw.is_empty()
        && len * 2 < raw.len()
    {
        confidence -= SHRINK_PENALTY;
    }

    let clamped = confidence.clamp(0.0, 1.0);
    (clamped * 100.0).round() / 100.0
}
