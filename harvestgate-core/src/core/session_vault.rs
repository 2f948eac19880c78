// harvestgate-core/src/core/session_vault.rs
// ============================================================================
// Module: SessionVault
// Description: Persisted, trust-scored browser session entity
//              (spec §3 "SessionVault", §4.5).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

/// Identifies a stored session: the site domain plus the proxy identity
/// that fetched through it. When no proxy is used, `proxy_identity` is the
/// literal string `"default"` (spec §4.5), preventing trust pollution when
/// proxies change.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// The site this session authenticates against.
    pub site_domain: String,
    /// `"default"` when no proxy is in play.
    pub proxy_identity: String,
}

impl SessionKey {
    /// Builds a key, substituting `"default"` for an absent proxy identity.
    #[must_use]
    pub fn new(site_domain: impl Into<String>, proxy_identity: Option<&str>) -> Self {
        Self {
            site_domain: site_domain.into(),
            proxy_identity: proxy_identity.unwrap_or("default").to_string(),
        }
    }
}

/// The viewport dimensions a captured browser session used.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: u32,
    /// Height in CSS pixels.
    pub height: u32,
}

/// A reusable, trust-scored browser session, keyed by [`SessionKey`].
///
/// Round-trips stably through JSON (spec §8: "session serialization/
/// deserialization is round-trip stable for all fields"); every field here
/// is plain data, so `#[derive(Serialize, Deserialize)]` already satisfies
/// that property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionVault {
    /// The (domain, proxy) this session belongs to.
    pub key: SessionKey,
    /// Captured cookie jar, opaque to this crate.
    pub cookies: serde_json::Value,
    /// Full browser storage state (localStorage, sessionStorage, ...).
    pub storage_state: serde_json::Value,
    /// The user agent string the session was captured under.
    pub user_agent: String,
    /// The viewport the session was captured under.
    pub viewport: Viewport,
    /// When this session entry was first created.
    #[serde(with = "time::serde::rfc3339")]
    pub first_seen: time::OffsetDateTime,
    /// When this session last succeeded, if ever.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_success: Option<time::OffsetDateTime>,
    /// Total number of times this session has been handed out via `get`.
    pub total_uses: u32,
    /// Consecutive failures since the last success.
    pub failure_streak: u32,
    /// Total CAPTCHA challenges observed while using this session.
    pub captcha_count: u32,
}

impl SessionVault {
    /// Creates a freshly captured session with zeroed counters.
    #[must_use]
    pub fn new(
        key: SessionKey,
        cookies: serde_json::Value,
        storage_state: serde_json::Value,
        user_agent: impl Into<String>,
        viewport: Viewport,
        now: time::OffsetDateTime,
    ) -> Self {
        Self {
            key,
            cookies,
            storage_state,
            user_agent: user_agent.into(),
            viewport,
            first_seen: now,
            last_success: None,
            total_uses: 0,
            failure_streak: 0,
            captcha_count: 0,
        }
    }

    /// Minutes elapsed since `first_seen`.
    #[must_use]
    pub fn age_minutes(&self, now: time::OffsetDateTime) -> f64 {
        (now - self.first_seen).as_seconds_f64() / 60.0
    }

    /// Minutes elapsed since `last_success`, or `f64::INFINITY` if it never
    /// succeeded.
    #[must_use]
    pub fn minutes_since_success(&self, now: time::OffsetDateTime) -> f64 {
        self.last_success.map_or(f64::INFINITY, |t| (now - t).as_seconds_f64() / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_proxy_identity_is_literal_default() {
        let key = SessionKey::new("example.com", None);
        assert_eq!(key.proxy_identity, "default");
    }

    #[test]
    fn round_trips_through_json() {
        let session = SessionVault::new(
            SessionKey::new("example.com", Some("proxy-1")),
            serde_json::json!({"a": 1}),
            serde_json::json!({}),
            "ua/1.0",
            Viewport { width: 1280, height: 800 },
            time::OffsetDateTime::UNIX_EPOCH,
        );
        let encoded = serde_json::to_string(&session).expect("serialize");
        let decoded: SessionVault = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded.key, session.key);
        assert_eq!(decoded.user_agent, session.user_agent);
        assert_eq!(decoded.viewport.width, session.viewport.width);
    }
}
