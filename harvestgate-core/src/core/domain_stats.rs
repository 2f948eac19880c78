// harvestgate-core/src/core/domain_stats.rs
// ============================================================================
// Module: DomainStats
// Description: Per-(domain, engine) performance counters
//              (spec §3 "DomainStats", §4.4).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::run::Engine;

/// Per-(domain, engine) performance counters, unique on `(domain, engine)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainStats {
    /// The domain these counters describe.
    pub domain: String,
    /// The engine tier these counters describe.
    pub engine: Engine,
    /// Total attempts recorded via `record_outcome`.
    pub total_attempts: u64,
    /// Attempts that succeeded.
    pub successful_attempts: u64,
    /// Attempts that did not succeed.
    pub failed_attempts: u64,
    /// Cached `successful_attempts / total_attempts`, recomputed on every
    /// `record_outcome` call.
    pub success_rate: f64,
    /// Exponentially-smoothed average escalations per attempt, α = 0.3.
    pub avg_escalations: f64,
    /// Total records extracted across all attempts on this (domain, engine).
    pub total_records_extracted: u64,
    /// Average cost per extracted record, in engine cost-weight units.
    pub avg_cost_per_record: f64,
    /// When this row was first created.
    #[serde(with = "time::serde::rfc3339")]
    pub first_seen: time::OffsetDateTime,
    /// When this row was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: time::OffsetDateTime,
}

impl DomainStats {
    /// Creates a fresh, zeroed counter row.
    #[must_use]
    pub fn new(domain: impl Into<String>, engine: Engine, now: time::OffsetDateTime) -> Self {
        Self {
            domain: domain.into(),
            engine,
            total_attempts: 0,
            successful_attempts: 0,
            failed_attempts: 0,
            success_rate: 0.0,
            avg_escalations: 0.0,
            total_records_extracted: 0,
            avg_cost_per_record: 0.0,
            first_seen: now,
            last_updated: now,
        }
    }

    /// Checks the core bookkeeping invariant: `successful + failed == total`
    /// and `0 <= success_rate <= 1`.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        let counts_add_up = self.successful_attempts + self.failed_attempts == self.total_attempts;
        let rate_in_range = (0.0..=1.0).contains(&self.success_rate);
        let rate_matches = self.total_attempts == 0
            || (self.success_rate - self.successful_attempts as f64 / self.total_attempts as f64).abs() < 1e-9;
        counts_add_up && rate_in_range && rate_matches
    }
}
