// harvestgate-sessions/src/circuit_breaker.rs
// ============================================================================
// Module: Site circuit breaker
// Description: Per-site sliding consecutive-failure gate suppressing
//              session issuance (spec §4.5 "Circuit breaker").
// ============================================================================

/// Consecutive failures at which a site's circuit breaker opens (spec §4.5).
pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 10;
/// Minutes with no further failures after which an open breaker closes
/// (spec §4.5).
pub const CIRCUIT_COOLDOWN_MINUTES: i64 = 30;

/// Per-site breaker state: a consecutive-failure counter plus the last
/// failure's timestamp, used to decide whether the cooldown has elapsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiteCircuit {
    /// Consecutive failures observed since the last success.
    consecutive_failures: u32,
    /// When the most recent failure was recorded, if any.
    last_failure_at: Option<time::OffsetDateTime>,
}

impl SiteCircuit {
    /// True when the breaker is currently open: at/above threshold and the
    /// cooldown has not yet elapsed since the last failure (spec §4.5:
    /// "Opens at 10; closes after 30 minutes with no failures, or on any
    /// success").
    #[must_use]
    pub fn is_open(&self, now: time::OffsetDateTime) -> bool {
        if self.consecutive_failures < CIRCUIT_FAILURE_THRESHOLD {
            return false;
        }
        self.last_failure_at.is_some_and(|last| (now - last) < time::Duration::minutes(CIRCUIT_COOLDOWN_MINUTES))
    }

    /// Records a failure, ticking the consecutive-failure counter.
    pub fn record_failure(&mut self, now: time::OffsetDateTime) {
        self.consecutive_failures += 1;
        self.last_failure_at = Some(now);
    }

    /// Records a success, closing the breaker immediately (spec §4.5: "or
    /// on any success").
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_failure_at = None;
    }
}
