// harvestgate-providers/src/http_adapter.rs
// ============================================================================
// Module: HTTP engine adapter
// Description: The `http` tier of the engine adapter contract (spec §6):
//              a bounded GET plus CSS-selector extraction.
// Purpose: The first, cheapest rung of the escalation ladder (spec §4.3).
// Dependencies: harvestgate-core, reqwest, scraper
// ============================================================================

//! ## Overview
//! Modeled on `HttpProvider` (`decision-gate-providers/src/http.rs`):
//! a `reqwest::blocking::Client` built once with a fixed timeout and
//! redirect policy, a scheme/host allowlist check before every request, and
//! a byte-bounded body read. A blocked status (401/403/429) is returned as
//! `Ok` with `http_status` set and no items, never as an [`AdapterError`]
//! (spec §6: "A blocked status ... is conveyed via the return tuple, not an
//! exception").

use std::collections::BTreeSet;
use std::io::Read;
use std::time::Duration;

use harvestgate_core::CrawlMode;
use harvestgate_core::Engine;
use harvestgate_core::interfaces::AdapterError;
use harvestgate_core::interfaces::AdapterRequest;
use harvestgate_core::interfaces::AdapterResponse;
use harvestgate_core::interfaces::EngineAdapter;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use crate::config::HttpAdapterConfig;
use crate::extraction;
use crate::list_crawl;
use crate::list_crawl::FetchedPage;

/// The `http` engine adapter (spec §4.3 tier 1).
pub struct HttpEngineAdapter {
    config: HttpAdapterConfig,
    client: Client,
}

impl HttpEngineAdapter {
    /// Builds the adapter's HTTP client once.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Other`] when the client cannot be built.
    pub fn new(config: HttpAdapterConfig) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::limited(5))
            .build()
            .map_err(|err| AdapterError::Other(format!("http client build failed: {err}")))?;
        Ok(Self { config, client })
    }

    fn fetch(&self, url: &str) -> Result<FetchedPage, AdapterError> {
        validate_url(url, &self.config)?;
        let response = self.client.get(url).send().map_err(classify_reqwest_err)?;
        let status = response.status().as_u16();
        let body = read_response_limited(response, self.config.max_response_bytes)?;
        Ok(FetchedPage {
            status,
            html: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

impl EngineAdapter for HttpEngineAdapter {
    fn engine(&self) -> Engine {
        Engine::Http
    }

    fn run(&self, request: &AdapterRequest) -> Result<AdapterResponse, AdapterError> {
        let page = self.fetch(&request.url)?;

        if matches!(page.status, 401 | 403 | 429) {
            return Ok(AdapterResponse {
                items: Vec::new(),
                raw_html: Some(page.html),
                http_status: Some(page.status),
                captured_session: None,
                navigation_failed: false,
                captcha_detected: false,
            });
        }

        let items = match (request.crawl_mode, &request.list_config) {
            (CrawlMode::List, Some(list_config)) => list_crawl::crawl(&request.url, &page.html, &request.selector_map, list_config, |link| self.fetch(link))?,
            _ => {
                let item = extraction::extract_via_selectors(&page.html, &request.selector_map);
                if item.is_empty() { Vec::new() } else { vec![item] }
            }
        };

        Ok(AdapterResponse {
            items,
            raw_html: Some(page.html),
            http_status: Some(page.status),
            captured_session: None,
            navigation_failed: false,
            captcha_detected: false,
        })
    }
}

fn validate_url(raw_url: &str, config: &HttpAdapterConfig) -> Result<(), AdapterError> {
    let url = reqwest::Url::parse(raw_url).map_err(|err| AdapterError::Other(format!("invalid url: {err}")))?;
    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        other => return Err(AdapterError::Other(format!("unsupported url scheme: {other}"))),
    }
    if let Some(allowlist) = &config.allowed_hosts {
        host_allowed(&url, allowlist)?;
    }
    Ok(())
}

fn host_allowed(url: &reqwest::Url, allowlist: &BTreeSet<String>) -> Result<(), AdapterError> {
    let host = url.host_str().ok_or_else(|| AdapterError::Other("url has no host".to_string()))?;
    if allowlist.contains(host) {
        Ok(())
    } else {
        Err(AdapterError::Other(format!("host not allowed: {host}")))
    }
}

fn classify_reqwest_err(err: reqwest::Error) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout
    } else {
        AdapterError::Transport(err.to_string())
    }
}

fn read_response_limited(mut response: reqwest::blocking::Response, max_bytes: usize) -> Result<Vec<u8>, AdapterError> {
    let max_bytes_u64 = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if let Some(expected) = response.content_length() {
        if expected > max_bytes_u64 {
            return Err(AdapterError::Other("response exceeds size limit".to_string()));
        }
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    response.by_ref().take(limit).read_to_end(&mut buf).map_err(|err| AdapterError::Transport(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(AdapterError::Other("response exceeds size limit".to_string()));
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_allowlisted_host() {
        let mut allowlist = BTreeSet::new();
        allowlist.insert("good.example.com".to_string());
        let config = HttpAdapterConfig {
            allowed_hosts: Some(allowlist),
            ..HttpAdapterConfig::default()
        };
        assert!(validate_url("https://evil.example.com/x", &config).is_err());
    }

    #[test]
    fn rejects_cleartext_http_by_default() {
        let config = HttpAdapterConfig::default();
        assert!(validate_url("http://example.com", &config).is_err());
    }

    #[test]
    fn allows_cleartext_http_when_configured() {
        let config = HttpAdapterConfig { allow_http: true, ..HttpAdapterConfig::default() };
        assert!(validate_url("http://example.com", &config).is_ok());
    }
}
