// harvestgate-core/src/core/job.rs
// ============================================================================
// Module: Job
// Description: The declarative extraction request (spec §3 "Job").
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::JobId;

/// How a Job should be crawled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    /// Extract one item from the target URL.
    Single,
    /// Follow item links and pagination from a listing page.
    List,
}

/// Which engine a Job should start on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// Let the adaptive/routing logic pick the starting engine.
    Auto,
    /// Force a specific engine tier for the whole run; the escalation
    /// policy never escalates past the forced tier (spec §4.3).
    Forced(crate::core::run::Engine),
}

/// List-mode crawl configuration (ignored in [`CrawlMode::Single`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    /// CSS/attribute selector identifying item links on a listing page.
    pub item_link_selector: String,
    /// CSS/attribute selector identifying the "next page" control.
    pub pagination_selector: Option<String>,
    /// Upper bound on pages to follow.
    pub max_pages: u32,
    /// Upper bound on items to extract across all pages.
    pub max_items: u32,
}

/// A declarative extraction request.
///
/// Immutable after validation except for [`super::field_map::FieldMap`]
/// edits, which append to selector history rather than mutating the Job
/// itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque identifier.
    pub id: JobId,
    /// The page (or listing page, in list mode) to extract from.
    pub target_url: String,
    /// Ordered logical field names this Job extracts. Order is preserved
    /// for deterministic FieldMap iteration.
    pub field_names: Vec<String>,
    /// Whether a stored session is required to reach `target_url`.
    pub requires_auth: bool,
    /// Single-item vs. list crawl.
    pub crawl_mode: CrawlMode,
    /// Present only when `crawl_mode == List`.
    pub list_config: Option<ListConfig>,
    /// `auto` or a forced engine tier.
    pub engine_mode: EngineMode,
    /// Optional named browser profile (user agent / viewport bundle) an
    /// engine adapter may honor.
    pub browser_profile: Option<String>,
}

impl Job {
    /// True when the Job forces a single engine tier, in which case the
    /// escalation policy (C3) never escalates (spec §4.3).
    #[must_use]
    pub const fn forces_engine(&self) -> Option<crate::core::run::Engine> {
        match self.engine_mode {
            EngineMode::Auto => None,
            EngineMode::Forced(engine) => Some(engine),
        }
    }
}
