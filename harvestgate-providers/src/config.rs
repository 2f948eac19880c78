// harvestgate-providers/src/config.rs
// ============================================================================
// Module: Adapter configuration
// Description: Per-tier tunables (spec §6 "Configuration": `http_timeout_seconds`,
//              `browser_nav_timeout_ms`, provider API keys).
// ============================================================================

use std::collections::BTreeSet;

/// Tunables for [`crate::http_adapter::HttpEngineAdapter`] (`http_timeout_seconds`
/// and friends), modeled on `HttpProviderConfig`
/// (`decision-gate-providers/src/http.rs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpAdapterConfig {
    /// Request timeout, in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response body size accepted, in bytes.
    pub max_response_bytes: usize,
    /// Outbound `User-Agent` header.
    pub user_agent: String,
    /// Allow cleartext `http://` URLs (disabled by default).
    pub allow_http: bool,
    /// Optional host allowlist; `None` permits any host.
    pub allowed_hosts: Option<BTreeSet<String>>,
}

impl Default for HttpAdapterConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_response_bytes: 4 * 1024 * 1024,
            user_agent: "harvestgate/0.1".to_string(),
            allow_http: false,
            allowed_hosts: None,
        }
    }
}

/// Tunables for [`crate::browser_adapter::BrowserEngineAdapter`] (spec §6
/// `browser_nav_timeout_ms`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserAdapterConfig {
    /// Navigation timeout, in milliseconds.
    pub nav_timeout_ms: u64,
    /// Maximum response body size accepted, in bytes.
    pub max_response_bytes: usize,
    /// Default `User-Agent` used when the Job names no `browser_profile`.
    pub default_user_agent: String,
}

impl Default for BrowserAdapterConfig {
    fn default() -> Self {
        Self {
            nav_timeout_ms: 30_000,
            max_response_bytes: 8 * 1024 * 1024,
            default_user_agent: "Mozilla/5.0 (compatible; harvestgate-browser/0.1)".to_string(),
        }
    }
}

/// Tunables for [`crate::provider_adapter::ProviderEngineAdapter`] (spec §6
/// "Provider API keys and preference order").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAdapterConfig {
    /// Base endpoint of the third-party scraping service.
    pub endpoint: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Request timeout, in milliseconds.
    pub timeout_ms: u64,
}
