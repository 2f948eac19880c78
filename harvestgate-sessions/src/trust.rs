// harvestgate-sessions/src/trust.rs
// ============================================================================
// Module: Trust scoring
// Description: The per-get trust formula and retirement thresholds for a
//              stored session (spec §4.5 "Trust scoring").
// ============================================================================

use harvestgate_core::SessionVault;

/// Trust floor at/above which a session may be reused (spec §4.5
/// "Reuse threshold"). Below this, `get` treats the session as retired.
pub const TRUST_DEGRADED: f64 = 40.0;
/// Trust floor at/above which a session is considered healthy (spec §4.5).
pub const TRUST_HEALTHY: f64 = 70.0;
/// Age in minutes past which a session is hard-retired regardless of trust
/// (spec §4.5 "Hard retire").
pub const MAX_AGE_MINUTES: f64 = 120.0;
/// Use count past which a session is hard-retired regardless of trust.
pub const HARD_CAP_USES: u32 = 200;
/// Consecutive failures at which a session is hard-retired.
pub const MAX_FAILURE_STREAK: u32 = 3;
/// Use count past which the trust formula applies its steep penalty.
pub const MAX_USES: u32 = 100;
/// Age in minutes past which the trust formula starts decaying score.
const AGE_GRACE_MINUTES: f64 = 60.0;
/// Minutes since last success under which a session gets a trust bonus.
const RECENT_SUCCESS_MINUTES: f64 = 5.0;
/// Use count past which the trust formula starts a linear decay.
const USE_GRACE_COUNT: f64 = 50.0;

/// A breakdown of the trust-score components, for logging on reuse (spec
/// §4.5 "on reuse log the trust breakdown").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustBreakdown {
    /// The starting score before any deductions/bonuses.
    pub base: f64,
    /// Deduction for age past the grace period.
    pub age_penalty: f64,
    /// Deduction for the current failure streak.
    pub failure_streak_penalty: f64,
    /// Bonus for a recent success.
    pub recent_success_bonus: f64,
    /// Deduction for use count past the grace threshold.
    pub use_penalty: f64,
    /// Extra flat penalty applied once `uses` exceeds [`MAX_USES`].
    pub over_max_uses_penalty: f64,
    /// The final, clamped score.
    pub score: f64,
}

/// Computes the trust score and its breakdown for `session` as of `now`
/// (spec §4.5 "Trust scoring (per get)").
///
/// Monotone-non-increasing in age for a fixed `(failure_streak, uses,
/// minutes_since_success)` (spec §8 invariant): every term but the
/// recent-success bonus only ever grows with age, and the bonus itself
/// depends on `minutes_since_success`, not on `now` directly once that
/// quantity is held fixed.
#[must_use]
pub fn score(session: &SessionVault, now: time::OffsetDateTime) -> TrustBreakdown {
    let age_minutes = session.age_minutes(now);
    let minutes_since_success = session.minutes_since_success(now);

    let base = 100.0;
    let age_penalty = (age_minutes - AGE_GRACE_MINUTES).max(0.0) * 0.5;
    let failure_streak_penalty = f64::from(session.failure_streak) * 15.0;
    let recent_success_bonus = if minutes_since_success < RECENT_SUCCESS_MINUTES { 20.0 } else { 0.0 };
    let use_penalty = (f64::from(session.total_uses) - USE_GRACE_COUNT).max(0.0);
    let over_max_uses_penalty = if session.total_uses > MAX_USES { 50.0 } else { 0.0 };

    let raw = base - age_penalty - failure_streak_penalty + recent_success_bonus - use_penalty - over_max_uses_penalty;
    let clamped = raw.clamp(0.0, 100.0);

    TrustBreakdown {
        base,
        age_penalty,
        failure_streak_penalty,
        recent_success_bonus,
        use_penalty,
        over_max_uses_penalty,
        score: clamped,
    }
}

/// True when `session` must be retired outright regardless of its trust
/// score (spec §4.5 "Hard retire"): age, use count, or failure streak past
/// their hard caps.
#[must_use]
pub fn must_hard_retire(session: &SessionVault, now: time::OffsetDateTime) -> bool {
    session.age_minutes(now) > MAX_AGE_MINUTES || session.total_uses > HARD_CAP_USES || session.failure_streak >= MAX_FAILURE_STREAK
}

/// True when `session`'s trust score clears the reuse threshold (spec §4.5
/// "Reuse threshold: trust >= 40").
#[must_use]
pub fn reusable(session: &SessionVault, now: time::OffsetDateTime) -> bool {
    !must_hard_retire(session, now) && score(session, now).score >= TRUST_DEGRADED
}
