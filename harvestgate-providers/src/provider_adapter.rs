// harvestgate-providers/src/provider_adapter.rs
// ============================================================================
// Module: Provider engine adapter
// Description: The `provider` tier of the engine adapter contract (spec
//              §6): delegates extraction to a paid third-party scraping
//              service.
// Purpose: The last, most expensive rung of the escalation ladder (spec
//          §4.3), reached only after both the `http` and `browser` tiers
//          have failed.
// Dependencies: harvestgate-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! Modeled on `decision-gate-providers`'s provider-delegation shape (it
//! posts a job description to an external endpoint and parses back a JSON
//! item list); here the request body is the requested URL plus the field
//! selector map, and the response is expected to be a JSON array of flat
//! string-keyed objects, one per extracted record.

use std::time::Duration;

use harvestgate_core::Engine;
use harvestgate_core::interfaces::AdapterError;
use harvestgate_core::interfaces::AdapterRequest;
use harvestgate_core::interfaces::AdapterResponse;
use harvestgate_core::interfaces::EngineAdapter;
use harvestgate_core::interfaces::RawItem;
use reqwest::blocking::Client;
use serde::Serialize;

use crate::config::ProviderAdapterConfig;

/// The `provider` engine adapter (spec §4.3 tier 3).
pub struct ProviderEngineAdapter {
    config: ProviderAdapterConfig,
    client: Client,
}

#[derive(Serialize)]
struct ProviderRequestBody<'a> {
    url: &'a str,
    selectors: &'a std::collections::BTreeMap<String, String>,
}

impl ProviderEngineAdapter {
    /// Builds the adapter's HTTP client once.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Other`] when the client cannot be built.
    pub fn new(config: ProviderAdapterConfig) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| AdapterError::Other(format!("provider client build failed: {err}")))?;
        Ok(Self { config, client })
    }
}

impl EngineAdapter for ProviderEngineAdapter {
    fn engine(&self) -> Engine {
        Engine::Provider
    }

    fn run(&self, request: &AdapterRequest) -> Result<AdapterResponse, AdapterError> {
        let body = ProviderRequestBody { url: &request.url, selectors: &request.selector_map };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(classify_reqwest_err)?;

        let status = response.status().as_u16();
        if matches!(status, 401 | 403 | 429) {
            return Ok(AdapterResponse { http_status: Some(status), ..AdapterResponse::default() });
        }

        let items: Vec<RawItem> = response.json().map_err(|err| AdapterError::Other(format!("provider response parse failed: {err}")))?;

        Ok(AdapterResponse {
            items,
            raw_html: None,
            http_status: Some(status),
            captured_session: None,
            navigation_failed: false,
            captcha_detected: false,
        })
    }
}

fn classify_reqwest_err(err: reqwest::Error) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout
    } else {
        AdapterError::Transport(err.to_string())
    }
}
