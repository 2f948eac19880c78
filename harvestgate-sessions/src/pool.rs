// harvestgate-sessions/src/pool.rs
// ============================================================================
// Module: Session pool (C5)
// Description: Trust-scored, persisted, circuit-broken browser session
//              pool (spec §4.5). The concrete implementation of
//              `harvestgate_core::interfaces::SessionPool`.
// ============================================================================

//! ## Overview
//! [`InMemorySessionPool`] is a single shared instance in the process. Its
//! mutable state — the session map and the per-site circuit breakers — is
//! guarded by one `Mutex`, mirroring `InMemoryRunStateStore` /
//! `SharedRunStateStore` (`runtime/store.rs`): an inner, lock-owning
//! type plus a cheaply `Clone`-able `Arc` wrapper for sharing across
//! workers. The public operations (`get`/`create`/`mark_success`/
//! `mark_failure`) are thin wrappers around `now`-parameterized inner
//! methods, so tests can drive the trust/circuit-breaker math at any
//! simulated instant without sleeping.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use harvestgate_core::SessionKey;
use harvestgate_core::SessionVault;
use harvestgate_core::interfaces::SessionPool;

use crate::circuit_breaker::SiteCircuit;
use crate::persistence;
use crate::trust;

/// Aggregate pool statistics (spec §4.5 `stats()`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoolStats {
    /// Total sessions currently held.
    pub total: usize,
    /// Sessions whose trust score is >= [`trust::TRUST_HEALTHY`].
    pub healthy: usize,
    /// Sessions whose trust score is in `[TRUST_DEGRADED, TRUST_HEALTHY)`.
    pub degraded: usize,
    /// Mean age across all sessions, in minutes.
    pub mean_age_minutes: f64,
    /// Mean use count across all sessions.
    pub mean_uses: f64,
    /// `captchas / requests * 100` across all sessions (spec §4.5).
    pub captcha_rate_percent: f64,
    /// A trust breakdown for one representative session, for observability.
    pub sample_trust: Option<trust::TrustBreakdown>,
}

/// Configuration an [`InMemorySessionPool`] is built with.
#[derive(Debug, Clone, Default)]
pub struct SessionPoolConfig {
    /// Directory sessions are persisted under. `None` disables disk
    /// persistence entirely (spec §6 `session_persistence_enabled`).
    pub persistence_dir: Option<PathBuf>,
}

/// Mutable pool state, guarded by one lock.
#[derive(Debug, Default)]
struct Inner {
    /// Live sessions, keyed by `(site_domain, proxy_identity)`.
    sessions: BTreeMap<SessionKey, SessionVault>,
    /// Per-site circuit breaker state, keyed by `site_domain`.
    circuits: BTreeMap<String, SiteCircuit>,
}

/// The concrete C5 session pool (spec §4.5): trust scoring, hard caps,
/// per-site circuit breaking, and optional disk persistence.
#[derive(Clone)]
pub struct InMemorySessionPool {
    inner: Arc<Mutex<Inner>>,
    config: SessionPoolConfig,
}

impl InMemorySessionPool {
    /// Builds a pool with no persistence directory, starting empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            config: SessionPoolConfig::default(),
        }
    }

    /// Builds a pool that persists to `config.persistence_dir`, loading any
    /// sessions found there that are not past [`persistence::MAX_PERSISTED_AGE_HOURS`]
    /// (spec §4.5 "On startup, load all session files").
    ///
    /// # Errors
    ///
    /// Returns a [`persistence::PersistenceError`] if the directory exists
    /// but cannot be read.
    pub fn load(config: SessionPoolConfig, now: time::OffsetDateTime) -> Result<Self, persistence::PersistenceError> {
        let mut sessions = BTreeMap::new();
        if let Some(dir) = &config.persistence_dir {
            for session in persistence::load_all(dir, now)? {
                sessions.insert(session.key.clone(), session);
            }
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                sessions,
                circuits: BTreeMap::new(),
            })),
            config,
        })
    }

    /// Locks the pool's inner state.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned by a prior panic elsewhere in the
    /// process; there is no safe way to recover pool state at that point.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        #[allow(clippy::unwrap_used, reason = "a poisoned session-pool mutex means a prior panic already corrupted process state; there is no safe recovery")]
        self.inner.lock().unwrap()
    }

    /// `get` as of an explicit instant, for deterministic testing of the
    /// trust formula and circuit breaker (spec §8 invariants).
    #[must_use]
    pub fn get_at(&self, domain: &str, proxy_identity: Option<&str>, now: time::OffsetDateTime) -> Option<SessionVault> {
        let mut guard = self.lock();
        if guard.circuits.entry(domain.to_string()).or_default().is_open(now) {
            tracing::warn!(domain, "circuit open; refusing to issue a session");
            return None;
        }

        let key = SessionKey::new(domain, proxy_identity);
        let session = guard.sessions.get(&key)?.clone();

        if trust::must_hard_retire(&session, now) {
            tracing::info!(domain, proxy = %key.proxy_identity, "session hard-retired on get");
            guard.sessions.remove(&key);
            return None;
        }

        let breakdown = trust::score(&session, now);
        if breakdown.score < trust::TRUST_DEGRADED {
            tracing::info!(domain, proxy = %key.proxy_identity, trust = breakdown.score, "session below reuse threshold; retiring");
            guard.sessions.remove(&key);
            return None;
        }

        tracing::debug!(
            domain,
            proxy = %key.proxy_identity,
            trust = breakdown.score,
            age_penalty = breakdown.age_penalty,
            failure_streak_penalty = breakdown.failure_streak_penalty,
            recent_success_bonus = breakdown.recent_success_bonus,
            use_penalty = breakdown.use_penalty,
            "reusing session"
        );
        Some(session)
    }

    /// `mark_success` as of an explicit instant.
    pub fn mark_success_at(&self, domain: &str, proxy_identity: Option<&str>, had_captcha: bool, now: time::OffsetDateTime) {
        let key = SessionKey::new(domain, proxy_identity);
        let persisted = {
            let mut guard = self.lock();
            guard.circuits.entry(domain.to_string()).or_default().record_success();
            let Some(session) = guard.sessions.get_mut(&key) else {
                return;
            };
            session.failure_streak = 0;
            session.last_success = Some(now);
            session.total_uses += 1;
            if had_captcha {
                session.captcha_count += 1;
            }
            session.clone()
        };

        if let Some(dir) = &self.config.persistence_dir {
            if let Err(err) = persistence::save(dir, &persisted) {
                tracing::warn!(domain, error = %err, "failed to persist session after success");
            }
        }
    }

    /// `mark_failure` as of an explicit instant.
    pub fn mark_failure_at(&self, domain: &str, proxy_identity: Option<&str>, now: time::OffsetDateTime) {
        let key = SessionKey::new(domain, proxy_identity);
        let mut guard = self.lock();
        guard.circuits.entry(domain.to_string()).or_default().record_failure(now);

        let Some(session) = guard.sessions.get_mut(&key) else {
            return;
        };
        session.failure_streak += 1;
        session.total_uses += 1;
        if session.failure_streak >= trust::MAX_FAILURE_STREAK {
            tracing::info!(domain, proxy = %key.proxy_identity, "auto-retiring session after failure streak cap");
            guard.sessions.remove(&key);
            if let Some(dir) = &self.config.persistence_dir {
                if let Err(err) = persistence::delete(dir, &key) {
                    tracing::warn!(domain, error = %err, "failed to delete retired session file");
                }
            }
        }
    }

    /// Sweeps every session whose trust score has fallen below the reuse
    /// threshold (spec §4.5 `cleanup_expired`), returning how many were
    /// removed.
    pub fn cleanup_expired(&self, now: time::OffsetDateTime) -> usize {
        let mut guard = self.lock();
        let stale: Vec<SessionKey> = guard
            .sessions
            .values()
            .filter(|session| !trust::reusable(session, now))
            .map(|session| session.key.clone())
            .collect();
        for key in &stale {
            guard.sessions.remove(key);
        }
        drop(guard);
        if let Some(dir) = &self.config.persistence_dir {
            for key in &stale {
                if let Err(err) = persistence::delete(dir, key) {
                    tracing::warn!(error = %err, "failed to delete expired session file");
                }
            }
        }
        stale.len()
    }

    /// Computes aggregate pool statistics as of `now` (spec §4.5 `stats()`).
    #[must_use]
    pub fn stats_at(&self, now: time::OffsetDateTime) -> PoolStats {
        let guard = self.lock();
        let total = guard.sessions.len();
        if total == 0 {
            return PoolStats::default();
        }

        let mut healthy = 0;
        let mut degraded = 0;
        let mut age_sum = 0.0;
        let mut uses_sum = 0.0;
        let mut captchas = 0u64;
        let mut requests = 0u64;
        let mut sample_trust = None;

        for session in guard.sessions.values() {
            let breakdown = trust::score(session, now);
            if breakdown.score >= trust::TRUST_HEALTHY {
                healthy += 1;
            } else if breakdown.score >= trust::TRUST_DEGRADED {
                degraded += 1;
            }
            age_sum += session.age_minutes(now);
            uses_sum += f64::from(session.total_uses);
            captchas += u64::from(session.captcha_count);
            requests += u64::from(session.total_uses);
            sample_trust.get_or_insert(breakdown);
        }

        #[allow(clippy::cast_precision_loss, reason = "session counts are small in practice; precision loss is immaterial for an observability average")]
        let count = total as f64;
        PoolStats {
            total,
            healthy,
            degraded,
            mean_age_minutes: age_sum / count,
            mean_uses: uses_sum / count,
            captcha_rate_percent: if requests == 0 { 0.0 } else { (captchas as f64 / requests as f64) * 100.0 },
            sample_trust,
        }
    }
}

impl Default for InMemorySessionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionPool for InMemorySessionPool {
    fn get(&self, domain: &str, proxy_identity: Option<&str>) -> Option<SessionVault> {
        self.get_at(domain, proxy_identity, time::OffsetDateTime::now_utc())
    }

    fn create(&self, session: SessionVault) {
        let mut guard = self.lock();
        guard.sessions.insert(session.key.clone(), session);
    }

    fn mark_success(&self, domain: &str, proxy_identity: Option<&str>, had_captcha: bool) {
        self.mark_success_at(domain, proxy_identity, had_captcha, time::OffsetDateTime::now_utc());
    }

    fn mark_failure(&self, domain: &str, proxy_identity: Option<&str>) {
        self.mark_failure_at(domain, proxy_identity, time::OffsetDateTime::now_utc());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvestgate_core::Viewport;

    fn new_session(domain: &str, now: time::OffsetDateTime) -> SessionVault {
        SessionVault::new(
            SessionKey::new(domain, None),
            serde_json::json!({}),
            serde_json::json!({}),
            "ua/1.0",
            Viewport { width: 1280, height: 800 },
            now,
        )
    }

    #[test]
    fn fresh_session_is_reusable_immediately() {
        let pool = InMemorySessionPool::new();
        let now = time::OffsetDateTime::UNIX_EPOCH;
        pool.create(new_session("example.com", now));
        assert!(pool.get_at("example.com", None, now).is_some());
    }

    #[test]
    fn default_proxy_pools_are_keyed_separately_from_named_proxies() {
        let pool = InMemorySessionPool::new();
        let now = time::OffsetDateTime::UNIX_EPOCH;
        let mut proxied = new_session("example.com", now);
        proxied.key = SessionKey::new("example.com", Some("proxy-a"));
        pool.create(proxied);
        assert!(pool.get_at("example.com", None, now).is_none());
        assert!(pool.get_at("example.com", Some("proxy-a"), now).is_some());
    }

    #[test]
    fn third_consecutive_failure_retires_the_session() {
        let pool = InMemorySessionPool::new();
        let now = time::OffsetDateTime::UNIX_EPOCH;
        pool.create(new_session("example.com", now));
        pool.mark_failure_at("example.com", None, now);
        pool.mark_failure_at("example.com", None, now);
        assert!(pool.get_at("example.com", None, now).is_some());
        pool.mark_failure_at("example.com", None, now);
        assert!(pool.get_at("example.com", None, now).is_none());
    }

    #[test]
    fn circuit_opens_after_ten_consecutive_failures_across_the_site() {
        let pool = InMemorySessionPool::new();
        let now = time::OffsetDateTime::UNIX_EPOCH;
        pool.create(new_session("example.com", now));
        for _ in 0..10 {
            pool.mark_failure_at("example.com", None, now);
        }
        assert!(pool.get_at("example.com", None, now).is_none());
    }

    #[test]
    fn circuit_closes_after_cooldown() {
        let pool = InMemorySessionPool::new();
        let start = time::OffsetDateTime::UNIX_EPOCH;
        for _ in 0..10 {
            pool.mark_failure_at("example.com", None, start);
        }
        pool.create(new_session("example.com", start));
        assert!(pool.get_at("example.com", None, start).is_none());

        let later = start + time::Duration::minutes(crate::circuit_breaker::CIRCUIT_COOLDOWN_MINUTES + 1);
        assert!(pool.get_at("example.com", None, later).is_some());
    }

    #[test]
    fn mark_success_resets_failure_streak_and_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = InMemorySessionPool::load(
            SessionPoolConfig { persistence_dir: Some(dir.path().to_path_buf()) },
            time::OffsetDateTime::UNIX_EPOCH,
        )
        .expect("load");
        let now = time::OffsetDateTime::UNIX_EPOCH;
        pool.create(new_session("example.com", now));
        pool.mark_failure_at("example.com", None, now);
        pool.mark_success_at("example.com", None, true, now);

        let reloaded = InMemorySessionPool::load(
            SessionPoolConfig { persistence_dir: Some(dir.path().to_path_buf()) },
            now,
        )
        .expect("reload");
        let session = reloaded.get_at("example.com", None, now).expect("persisted");
        assert_eq!(session.failure_streak, 0);
        assert_eq!(session.captcha_count, 1);
    }

    #[test]
    fn cleanup_expired_sweeps_untrustworthy_sessions() {
        let pool = InMemorySessionPool::new();
        let created = time::OffsetDateTime::UNIX_EPOCH;
        pool.create(new_session("example.com", created));
        let much_later = created + time::Duration::minutes(400);
        assert_eq!(pool.cleanup_expired(much_later), 1);
        assert!(pool.get_at("example.com", None, much_later).is_none());
    }

    #[test]
    fn stats_reports_captcha_rate() {
        let pool = InMemorySessionPool::new();
        let now = time::OffsetDateTime::UNIX_EPOCH;
        pool.create(new_session("example.com", now));
        pool.mark_success_at("example.com", None, true, now);
        pool.mark_success_at("example.com", None, false, now);
        let stats = pool.stats_at(now);
        assert_eq!(stats.total, 1);
        assert!((stats.captcha_rate_percent - 50.0).abs() < f64::EPSILON);
    }
}
