// harvestgate-fields/src/error.rs
// ============================================================================
// Module: Field Errors
// Description: Failure modes that can arise while *configuring* the pipeline
//              (a malformed validation pattern). Parse/validation failures on
//              a given value are never errors here — they are recorded inline
//              on the resulting FieldResult per the pipeline's no-exceptions
//              contract.
// ============================================================================

use thiserror::Error;

/// Errors raised while preparing to run the pipeline, never while running it
/// against a value.
#[derive(Debug, Error)]
pub enum FieldError {
    /// A [`crate::ValidationRules::pattern`] failed to compile as a regex.
    #[error("invalid validation pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The pattern string that failed to compile.
        pattern: String,
        /// The underlying regex compiler error.
        #[source]
        source: regex::Error,
    },
}
