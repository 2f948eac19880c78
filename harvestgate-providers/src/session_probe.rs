// harvestgate-providers/src/session_probe.rs
// ============================================================================
// Module: Session probe
// Description: Implements `SessionProber` by HEAD-requesting a domain's
//              root (spec §4.7 step 2).
// Purpose: Decides whether a stored session still authenticates before an
//          auth-required Run begins.
// Dependencies: harvestgate-core, reqwest
// ============================================================================

//! ## Overview
//! The orchestrator branches on [`SessionProbeOutcome::Valid`] /
//! [`SessionProbeOutcome::Invalid`] / [`SessionProbeOutcome::Missing`]
//! (spec §4.7 step 2: "probe a stored session via a HEAD to the domain
//! root; on `invalid` or `missing` status and `required` policy, create a
//! `login_refresh` or `manual_access` intervention"). `Missing` is decided
//! locally (no stored session); `Invalid` covers both a 401/403 HEAD
//! response and any transport failure during the probe.

use std::time::Duration;

use harvestgate_core::SessionVault;
use harvestgate_core::interfaces::SessionProbeOutcome;
use harvestgate_core::interfaces::SessionProber;
use reqwest::blocking::Client;

/// HEAD-request based [`SessionProber`], grounded on the same
/// `reqwest::blocking::Client` pattern as [`crate::http_adapter::HttpEngineAdapter`].
pub struct HeadSessionProber {
    client: Client,
}

impl HeadSessionProber {
    /// Builds the prober's HTTP client once.
    ///
    /// # Panics
    ///
    /// Panics if the underlying `reqwest` client cannot be built, which
    /// only happens on a misconfigured TLS backend at process startup.
    #[must_use]
    pub fn new(timeout_ms: u64) -> Self {
        #[allow(clippy::expect_used, reason = "client construction failure is a startup-time configuration error, not a runtime condition")]
        let client = Client::builder().timeout(Duration::from_millis(timeout_ms)).build().expect("failed to build session-probe http client");
        Self { client }
    }

    fn head_domain_root(&self, domain: &str) -> Option<u16> {
        let url = format!("https://{domain}/");
        self.client.head(&url).send().ok().map(|response| response.status().as_u16())
    }
}

impl SessionProber for HeadSessionProber {
    fn probe(&self, domain: &str, session: Option<&SessionVault>) -> SessionProbeOutcome {
        if session.is_none() {
            return SessionProbeOutcome::Missing;
        }
        match self.head_domain_root(domain) {
            Some(401 | 403) | None => SessionProbeOutcome::Invalid,
            Some(_) => SessionProbeOutcome::Valid,
        }
    }
}
