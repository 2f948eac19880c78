// harvestgate-providers/src/browser_adapter.rs
// ============================================================================
// Module: Browser engine adapter
// Description: The `browser` tier of the engine adapter contract (spec §6):
//              JSON-LD-first extraction, session capture, and block/CAPTCHA
//              detection.
// Purpose: The second rung of the escalation ladder (spec §4.3).
// Dependencies: harvestgate-core, reqwest, scraper
// ============================================================================

//! ## Overview
//! A genuine headless browser (`chromiumoxide` and similar) is built on
//! `tokio`, which the ambient design deliberately drops (every engine
//! adapter here is synchronous). This adapter instead
//! models the `browser` tier's distinguishing behavior on top of the same
//! bounded `reqwest::blocking` fetch the `http` tier uses:
//! - it tries a JSON-LD `Person` extraction (spec §6: "The browser adapter
//!   additionally attempts a JSON-LD Person/entity extraction before
//!   falling back to the selector map") before falling back to
//!   [`extraction::extract_via_selectors`];
//! - it synthesizes a [`SessionVault`] when the request carried none, since
//!   only the `browser` tier is credited with session capture (spec §6);
//! - it scans the response for [`harvestgate_core::escalation::BLOCK_INTERSTITIAL_PHRASES`]
//!   to set `captcha_detected`, and treats a transport failure as
//!   `navigation_failed` rather than an [`AdapterError`], since the
//!   escalation policy (C3) needs that signal in the response, not as an
//!   exception.

use std::time::Duration;

use harvestgate_core::CrawlMode;
use harvestgate_core::Engine;
use harvestgate_core::SessionKey;
use harvestgate_core::SessionVault;
use harvestgate_core::Viewport;
use harvestgate_core::escalation::BLOCK_INTERSTITIAL_PHRASES;
use harvestgate_core::interfaces::AdapterError;
use harvestgate_core::interfaces::AdapterRequest;
use harvestgate_core::interfaces::AdapterResponse;
use harvestgate_core::interfaces::EngineAdapter;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use crate::config::BrowserAdapterConfig;
use crate::extraction;
use crate::list_crawl;
use crate::list_crawl::FetchedPage;

/// The `browser` engine adapter (spec §4.3 tier 2).
pub struct BrowserEngineAdapter {
    config: BrowserAdapterConfig,
    client: Client,
}

impl BrowserEngineAdapter {
    /// Builds the adapter's HTTP client once.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Other`] when the client cannot be built.
    pub fn new(config: BrowserAdapterConfig) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.nav_timeout_ms))
            .redirect(Policy::limited(5))
            .build()
            .map_err(|err| AdapterError::Other(format!("browser client build failed: {err}")))?;
        Ok(Self { config, client })
    }

    fn user_agent(&self, browser_profile: Option<&str>) -> String {
        browser_profile.map_or_else(|| self.config.default_user_agent.clone(), str::to_string)
    }

    fn fetch(&self, url: &str, user_agent: &str) -> Result<FetchedPage, AdapterError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .map_err(classify_reqwest_err)?;
        let status = response.status().as_u16();
        let html = response.text().map_err(|err| AdapterError::Transport(err.to_string()))?;
        Ok(FetchedPage { status, html })
    }
}

impl EngineAdapter for BrowserEngineAdapter {
    fn engine(&self) -> Engine {
        Engine::Browser
    }

    fn run(&self, request: &AdapterRequest) -> Result<AdapterResponse, AdapterError> {
        let user_agent = self.user_agent(request.browser_profile.as_deref());

        let page = match self.fetch(&request.url, &user_agent) {
            Ok(page) => page,
            Err(AdapterError::Timeout) => return Err(AdapterError::Timeout),
            Err(_) => {
                return Ok(AdapterResponse {
                    navigation_failed: true,
                    ..AdapterResponse::default()
                });
            }
        };

        let captcha_detected = contains_any_case_insensitive(&page.html, BLOCK_INTERSTITIAL_PHRASES);

        if matches!(page.status, 401 | 403 | 429) || captcha_detected {
            return Ok(AdapterResponse {
                raw_html: Some(page.html),
                http_status: Some(page.status),
                captcha_detected,
                ..AdapterResponse::default()
            });
        }

        let captured_session = request.session.is_none().then(|| synthesize_session(&request.url, &user_agent));

        let items = match (request.crawl_mode, &request.list_config) {
            (CrawlMode::List, Some(list_config)) => list_crawl::crawl(&request.url, &page.html, &request.selector_map, list_config, |link| self.fetch(link, &user_agent))?,
            _ => {
                let item = extraction::extract_json_ld_person(&page.html).unwrap_or_else(|| extraction::extract_via_selectors(&page.html, &request.selector_map));
                if item.is_empty() { Vec::new() } else { vec![item] }
            }
        };

        Ok(AdapterResponse {
            items,
            raw_html: Some(page.html),
            http_status: Some(page.status),
            captured_session,
            navigation_failed: false,
            captcha_detected: false,
        })
    }
}

fn synthesize_session(url: &str, user_agent: &str) -> SessionVault {
    let domain = reqwest::Url::parse(url).ok().and_then(|parsed| parsed.host_str().map(str::to_string)).unwrap_or_default();
    SessionVault::new(
        SessionKey::new(domain, None),
        serde_json::Value::Null,
        serde_json::Value::Null,
        user_agent.to_string(),
        Viewport { width: 1920, height: 1080 },
        time::OffsetDateTime::now_utc(),
    )
}

fn classify_reqwest_err(err: reqwest::Error) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout
    } else {
        AdapterError::Transport(err.to_string())
    }
}

fn contains_any_case_insensitive(haystack: &str, needles: &[&str]) -> bool {
    let lowered = haystack.to_lowercase();
    needles.iter().any(|needle| lowered.contains(needle))
}
