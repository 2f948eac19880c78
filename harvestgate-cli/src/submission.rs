// harvestgate-cli/src/submission.rs
// ============================================================================
// Module: Job submission
// Description: Parses a JSON Job description into a Job + FieldMap set +
//              fresh Run (spec §3 "Job", "FieldMap", "Run").
// Purpose: The one place a human-authored file becomes the orchestrator's
//          persisted entities.
// Dependencies: harvestgate-core, harvestgate-fields, serde_json
// ============================================================================

use std::collections::BTreeMap;

use harvestgate_core::CrawlMode;
use harvestgate_core::EngineMode;
use harvestgate_core::Engine;
use harvestgate_core::FieldMap;
use harvestgate_core::Job;
use harvestgate_core::JobId;
use harvestgate_core::ListConfig;
use harvestgate_core::Run;
use harvestgate_fields::FieldType;
use serde::Deserialize;
use thiserror::Error;

/// Errors turning a [`JobSubmission`] into persisted entities.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The submission file could not be read.
    #[error("failed to read job submission: {0}")]
    Io(String),
    /// The submission file was not valid JSON, or named an unrecognized
    /// `field_types` entry.
    #[error("failed to parse job submission: {0}")]
    Parse(String),
    /// `crawl_mode == "list"` but `list_config` was omitted, or vice versa.
    #[error("invalid job submission: {0}")]
    Invalid(String),
}

/// Which engine a submitted Job should start on, as written in JSON.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
enum EngineModeInput {
    /// Let the adaptive/routing logic pick.
    #[default]
    Auto,
    /// Force the `http` tier.
    Http,
    /// Force the `browser` tier.
    Browser,
    /// Force the `provider` tier.
    Provider,
}

impl From<EngineModeInput> for EngineMode {
    fn from(value: EngineModeInput) -> Self {
        match value {
            EngineModeInput::Auto => Self::Auto,
            EngineModeInput::Http => Self::Forced(Engine::Http),
            EngineModeInput::Browser => Self::Forced(Engine::Browser),
            EngineModeInput::Provider => Self::Forced(Engine::Provider),
        }
    }
}

/// A human-authored Job description, as read from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSubmission {
    /// The page (or listing page) to extract from.
    pub target_url: String,
    /// Ordered logical field names this Job extracts.
    pub field_names: Vec<String>,
    /// Starting selector for each field; fields not listed here fall back
    /// to [`FieldMap::default_selector_for`].
    #[serde(default)]
    pub selectors: BTreeMap<String, String>,
    /// Parse type for each field; fields not listed here default to
    /// [`FieldType::String`].
    #[serde(default)]
    pub field_types: BTreeMap<String, FieldType>,
    /// Whether a stored session is required to reach `target_url`.
    #[serde(default)]
    pub requires_auth: bool,
    /// `single` or `list`.
    #[serde(default)]
    pub crawl_mode: CrawlModeInput,
    /// Present only when `crawl_mode == "list"`.
    #[serde(default)]
    pub list_config: Option<ListConfig>,
    /// `auto`, `http`, `browser`, or `provider`.
    #[serde(default)]
    pub engine_mode: EngineModeInput,
    /// Optional named browser profile.
    #[serde(default)]
    pub browser_profile: Option<String>,
    /// Overrides the orchestrator's configured `default_max_attempts` for
    /// this Run only.
    pub max_attempts: Option<u32>,
}

/// `crawl_mode`, as written in JSON.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CrawlModeInput {
    /// Extract one item from the target URL.
    #[default]
    Single,
    /// Follow item links and pagination from a listing page.
    List,
}

/// The entities a submission resolves to: a Job, its FieldMaps, and the
/// fresh Run ready for the broker.
pub struct SubmissionResult {
    /// The parsed Job.
    pub job: Job,
    /// One FieldMap per `field_names` entry.
    pub field_maps: Vec<FieldMap>,
    /// A fresh, `queued` Run for the Job.
    pub run: Run,
}

impl JobSubmission {
    /// Parses a submission from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::Parse`] on malformed JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self, SubmissionError> {
        serde_json::from_slice(bytes).map_err(|err| SubmissionError::Parse(err.to_string()))
    }

    /// Resolves this submission into a Job, its FieldMaps, and a fresh Run.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::Invalid`] when `crawl_mode` and
    /// `list_config` disagree, or `field_names` is empty.
    pub fn resolve(&self, default_max_attempts: u32, now: time::OffsetDateTime) -> Result<SubmissionResult, SubmissionError> {
        if self.field_names.is_empty() {
            return Err(SubmissionError::Invalid("field_names must not be empty".to_string()));
        }
        let crawl_mode = match self.crawl_mode {
            CrawlModeInput::Single => CrawlMode::Single,
            CrawlModeInput::List => CrawlMode::List,
        };
        match (crawl_mode, &self.list_config) {
            (CrawlMode::List, None) => return Err(SubmissionError::Invalid("crawl_mode \"list\" requires list_config".to_string())),
            (CrawlMode::Single, Some(_)) => return Err(SubmissionError::Invalid("crawl_mode \"single\" must not set list_config".to_string())),
            _ => {}
        }

        let job_id = JobId::new();
        let job = Job {
            id: job_id,
            target_url: self.target_url.clone(),
            field_names: self.field_names.clone(),
            requires_auth: self.requires_auth,
            crawl_mode,
            list_config: self.list_config.clone(),
            engine_mode: self.engine_mode.into(),
            browser_profile: self.browser_profile.clone(),
        };

        let field_maps = self
            .field_names
            .iter()
            .map(|field_name| {
                let selector = self.selectors.get(field_name).cloned().unwrap_or_else(|| FieldMap::default_selector_for(field_name).to_string());
                let field_type = self.field_types.get(field_name).copied().unwrap_or(FieldType::String);
                FieldMap::new(job_id, field_name.clone(), selector, field_type)
            })
            .collect();

        let max_attempts = self.max_attempts.unwrap_or(default_max_attempts);
        let run = Run::new(job_id, max_attempts, now);

        Ok(SubmissionResult { job, field_maps, run })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test-only helper, panics are acceptable")]

    use super::*;

    fn sample_bytes() -> Vec<u8> {
        br#"{
            "target_url": "https://example.com/listing",
            "field_names": ["title", "price"],
            "selectors": {"title": "h1.title"},
            "field_types": {"price": "money"},
            "requires_auth": false,
            "crawl_mode": "single"
        }"#
        .to_vec()
    }

    #[test]
    fn resolves_into_job_field_maps_and_run() {
        let submission = JobSubmission::from_json(&sample_bytes()).expect("parse");
        let result = submission.resolve(3, time::OffsetDateTime::UNIX_EPOCH).expect("resolve");
        assert_eq!(result.field_maps.len(), 2);
        assert_eq!(result.run.job_id, result.job.id);
        assert_eq!(result.run.max_attempts, 3);
        let title = result.field_maps.iter().find(|field_map| field_map.field_name == "title").expect("title field");
        assert_eq!(title.selector, "h1.title");
        assert_eq!(title.field_type, FieldType::String);
        let price = result.field_maps.iter().find(|field_map| field_map.field_name == "price").expect("price field");
        assert_eq!(price.field_type, FieldType::Money);
    }

    #[test]
    fn max_attempts_override_wins_over_default() {
        let mut submission = JobSubmission::from_json(&sample_bytes()).expect("parse");
        submission.max_attempts = Some(7);
        let result = submission.resolve(3, time::OffsetDateTime::UNIX_EPOCH).expect("resolve");
        assert_eq!(result.run.max_attempts, 7);
    }

    #[test]
    fn list_crawl_mode_without_list_config_is_rejected() {
        let mut submission = JobSubmission::from_json(&sample_bytes()).expect("parse");
        submission.crawl_mode = CrawlModeInput::List;
        let result = submission.resolve(3, time::OffsetDateTime::UNIX_EPOCH);
        assert!(matches!(result, Err(SubmissionError::Invalid(_))));
    }

    #[test]
    fn empty_field_names_is_rejected() {
        let mut submission = JobSubmission::from_json(&sample_bytes()).expect("parse");
        submission.field_names.clear();
        let result = submission.resolve(3, time::OffsetDateTime::UNIX_EPOCH);
        assert!(matches!(result, Err(SubmissionError::Invalid(_))));
    }
}
