// harvestgate-core/src/core/domain_config.rs
// ============================================================================
// Module: DomainConfig
// Description: Per-domain policy cache (spec §3 "DomainConfig", §4.7 step 3).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

/// How aggressively a domain is expected to police access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainAccessClass {
    /// Open data, no session expected.
    Public,
    /// Internal/infrastructure endpoint; always routed through `provider`.
    Infra,
    /// A domain known to gate content behind human-operated sessions.
    Human,
}

/// Whether a domain requires a stored session to be reached successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRequirement {
    /// No session needed.
    No,
    /// A session helps but is not required.
    Optional,
    /// A session is required to reach the target.
    Required,
}

/// Per-domain policy cache consulted by the orchestrator's routing step
/// (spec §4.7 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// The domain this policy applies to.
    pub domain: String,
    /// How the domain is classified for routing purposes.
    pub access_class: DomainAccessClass,
    /// Whether a session is required, optional, or unused.
    pub session_requirement: SessionRequirement,
    /// Rolling 403 rate in `[0, 1]`, used both by routing (spec §4.7 step 3:
    /// `human` without session and rolling 403 rate >= 0.8 -> provider) and
    /// by the block classifier's priority escalation (spec §4.6 resolution,
    /// DESIGN.md).
    pub rolling_403_rate: f64,
    /// Rolling CAPTCHA rate in `[0, 1]`.
    pub rolling_captcha_rate: f64,
    /// Free-form per-engine stat bag, supplementary to [`super::domain_stats::DomainStats`].
    pub per_engine_stats: serde_json::Value,
    /// Preferred third-party provider for this domain, if any.
    pub preferred_provider: Option<String>,
    /// Learned estimate of how long a captured session stays valid.
    pub learned_session_lifetime: Option<time::Duration>,
}

impl DomainConfig {
    /// Creates a default (public, no-session) policy row for a domain not
    /// yet seen.
    #[must_use]
    pub fn default_for(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            access_class: DomainAccessClass::Public,
            session_requirement: SessionRequirement::No,
            rolling_403_rate: 0.0,
            rolling_captcha_rate: 0.0,
            per_engine_stats: serde_json::json!({}),
            preferred_provider: None,
            learned_session_lifetime: None,
        }
    }
}
