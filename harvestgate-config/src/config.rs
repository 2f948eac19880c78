// harvestgate-config/src/config.rs
// ============================================================================
// Module: Configuration model
// Description: TOML-facing configuration sections, loading, and validation.
// Purpose: Turn a config file (or its defaults) into the tunables every
//          collaborator crate needs, failing closed on anything malformed.
// Dependencies: harvestgate-providers, harvestgate-store-sqlite, serde, toml
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use harvestgate_providers::BrowserAdapterConfig;
use harvestgate_providers::HttpAdapterConfig;
use harvestgate_providers::ProviderAdapterConfig;
use harvestgate_store_sqlite::SqliteStoreConfig;
use harvestgate_store_sqlite::SqliteStoreMode;
use harvestgate_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "harvestgate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "HARVESTGATE_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error, including unrecognized keys.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A recognized key held an out-of-range or otherwise invalid value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Top-level config
// ============================================================================

/// The complete, validated Harvestgate configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarvestgateConfig {
    /// Orchestrator-level tunables (spec §6, `OrchestratorConfig`).
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    /// `http` engine adapter tunables.
    #[serde(default)]
    pub http: HttpSection,
    /// `browser` engine adapter tunables.
    #[serde(default)]
    pub browser: BrowserSection,
    /// `provider` (third-party) engine adapter tunables.
    #[serde(default)]
    pub providers: ProvidersSection,
    /// Session pool persistence tunables.
    #[serde(default)]
    pub sessions: SessionsSection,
    /// `SQLite` store tunables.
    #[serde(default)]
    pub store: StoreSection,
    /// `[AMBIENT]` structured logging tunables.
    #[serde(default)]
    pub logging: LoggingSection,
    /// When the loaded file was last modified, for diagnostics. Not itself
    /// configurable.
    #[serde(skip)]
    pub source_modified_at: Option<SystemTime>,
}

impl Default for HarvestgateConfig {
    fn default() -> Self {
        Self {
            orchestrator: OrchestratorSection::default(),
            http: HttpSection::default(),
            browser: BrowserSection::default(),
            providers: ProvidersSection::default(),
            sessions: SessionsSection::default(),
            store: StoreSection::default(),
            logging: LoggingSection::default(),
            source_modified_at: None,
        }
    }
}

impl HarvestgateConfig {
    /// Loads configuration from disk, falling back to an all-defaults
    /// configuration when no file exists at the resolved path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a config file exists but cannot be read,
    /// parsed, or validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        validate_path(&resolved)?;
        if !resolved.exists() {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.source_modified_at = fs::metadata(&resolved).and_then(|meta| meta.modified()).ok();
        config.validate()?;
        Ok(config)
    }

    /// Validates every section's numeric tunables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first out-of-range value
    /// found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.orchestrator.validate()?;
        self.http.validate()?;
        self.browser.validate()?;
        self.providers.validate()?;
        self.sessions.validate()?;
        self.store.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Builds the `http` engine adapter's runtime configuration.
    #[must_use]
    pub fn http_adapter_config(&self) -> HttpAdapterConfig {
        HttpAdapterConfig {
            timeout_ms: self.http.timeout_seconds.saturating_mul(1000),
            max_response_bytes: self.http.max_response_bytes,
            user_agent: self.http.user_agent.clone(),
            allow_http: self.http.allow_http,
            allowed_hosts: self.http.allowed_hosts.clone().map(|hosts| hosts.into_iter().collect::<BTreeSet<String>>()),
        }
    }

    /// Builds the `browser` engine adapter's runtime configuration.
    #[must_use]
    pub fn browser_adapter_config(&self) -> BrowserAdapterConfig {
        BrowserAdapterConfig {
            nav_timeout_ms: self.browser.nav_timeout_ms,
            max_response_bytes: self.browser.max_response_bytes,
            default_user_agent: self.browser.default_user_agent.clone(),
        }
    }

    /// Builds the `provider` engine adapter's runtime configuration for the
    /// preferred third-party provider, if one is configured.
    #[must_use]
    pub fn provider_adapter_config(&self) -> Option<ProviderAdapterConfig> {
        let entry = self.providers.preferred()?;
        Some(ProviderAdapterConfig { endpoint: entry.endpoint.clone(), api_key: entry.api_key.clone(), timeout_ms: entry.timeout_ms })
    }

    /// Builds the `SQLite` store's runtime configuration.
    #[must_use]
    pub fn sqlite_store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.store.sqlite_path.clone(),
            busy_timeout_ms: self.store.sqlite_busy_timeout_ms,
            journal_mode: self.store.journal_mode,
            sync_mode: self.store.sync_mode,
        }
    }
}

// ============================================================================
// SECTION: Orchestrator section
// ============================================================================

/// Orchestrator tunables (spec §6: `default_max_attempts`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorSection {
    /// Upper bound on escalations per Run, absent a Job-level override.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,
    /// Minimum field confidence a Record may have without triggering a
    /// `field_confirm` intervention.
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self { default_max_attempts: default_max_attempts(), confidence_floor: default_confidence_floor() }
    }
}

impl OrchestratorSection {
    /// Validates that `default_max_attempts` and `confidence_floor` are
    /// within sane bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10).contains(&self.default_max_attempts) {
            return Err(ConfigError::Invalid("orchestrator.default_max_attempts must be between 1 and 10".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(ConfigError::Invalid("orchestrator.confidence_floor must be between 0.0 and 1.0".to_string()));
        }
        Ok(())
    }
}

/// Default escalation cap, matching [`harvestgate_core::MAX_ESCALATIONS`].
const fn default_max_attempts() -> u32 {
    3
}

/// Default confidence floor, matching
/// [`harvestgate_core::orchestrator::DEFAULT_CONFIDENCE_FLOOR`].
const fn default_confidence_floor() -> f64 {
    0.5
}

// ============================================================================
// SECTION: HTTP section
// ============================================================================

/// `http` engine adapter tunables (spec §6: `http_timeout_seconds`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSection {
    /// Request timeout, in seconds.
    #[serde(default = "default_http_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Maximum response body size accepted, in bytes.
    #[serde(default = "default_http_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Outbound `User-Agent` header.
    #[serde(default = "default_http_user_agent")]
    pub user_agent: String,
    /// Allow cleartext `http://` URLs.
    #[serde(default)]
    pub allow_http: bool,
    /// Optional host allowlist; absent permits any host.
    #[serde(default)]
    pub allowed_hosts: Option<Vec<String>>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout_seconds(),
            max_response_bytes: default_http_max_response_bytes(),
            user_agent: default_http_user_agent(),
            allow_http: false,
            allowed_hosts: None,
        }
    }
}

impl HttpSection {
    /// Validates the HTTP adapter's timeout and size bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=300).contains(&self.timeout_seconds) {
            return Err(ConfigError::Invalid("http.timeout_seconds must be between 1 and 300".to_string()));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::Invalid("http.max_response_bytes must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Default HTTP request timeout, in seconds.
const fn default_http_timeout_seconds() -> u64 {
    10
}

/// Default maximum HTTP response size, in bytes (4 MiB).
const fn default_http_max_response_bytes() -> usize {
    4 * 1024 * 1024
}

/// Default outbound `User-Agent` header.
fn default_http_user_agent() -> String {
    "harvestgate/0.1".to_string()
}

// ============================================================================
// SECTION: Browser section
// ============================================================================

/// `browser` engine adapter tunables (spec §6: `browser_nav_timeout_ms`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserSection {
    /// Navigation timeout, in milliseconds.
    #[serde(default = "default_browser_nav_timeout_ms")]
    pub nav_timeout_ms: u64,
    /// Maximum response body size accepted, in bytes.
    #[serde(default = "default_browser_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Default `User-Agent` used when a Job names no `browser_profile`.
    #[serde(default = "default_browser_user_agent")]
    pub default_user_agent: String,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            nav_timeout_ms: default_browser_nav_timeout_ms(),
            max_response_bytes: default_browser_max_response_bytes(),
            default_user_agent: default_browser_user_agent(),
        }
    }
}

impl BrowserSection {
    /// Validates the browser adapter's timeout and size bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1_000..=120_000).contains(&self.nav_timeout_ms) {
            return Err(ConfigError::Invalid("browser.nav_timeout_ms must be between 1000 and 120000".to_string()));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::Invalid("browser.max_response_bytes must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Default browser navigation timeout, in milliseconds.
const fn default_browser_nav_timeout_ms() -> u64 {
    30_000
}

/// Default maximum browser response size, in bytes (8 MiB).
const fn default_browser_max_response_bytes() -> usize {
    8 * 1024 * 1024
}

/// Default browser `User-Agent` header.
fn default_browser_user_agent() -> String {
    "Mozilla/5.0 (compatible; harvestgate-browser/0.1)".to_string()
}

// ============================================================================
// SECTION: Providers section
// ============================================================================

/// One third-party `provider` engine credential/endpoint entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEntry {
    /// The name this entry is referenced by in `preference_order`.
    pub name: String,
    /// Base endpoint of the third-party scraping service.
    pub endpoint: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Request timeout, in milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
}

/// `provider` engine adapter tunables (spec §6: "provider API keys and
/// preference order").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProvidersSection {
    /// Configured third-party providers.
    #[serde(default)]
    pub entries: Vec<ProviderEntry>,
    /// Names from `entries`, most preferred first.
    #[serde(default)]
    pub preference_order: Vec<String>,
}

impl ProvidersSection {
    /// Returns the first entry named in `preference_order`, falling back to
    /// the first configured entry when the preference list is empty or
    /// names nothing configured.
    #[must_use]
    pub fn preferred(&self) -> Option<&ProviderEntry> {
        self.preference_order
            .iter()
            .find_map(|name| self.entries.iter().find(|entry| &entry.name == name))
            .or_else(|| self.entries.first())
    }

    /// Validates that `timeout_ms` is sane and every `preference_order` name
    /// resolves to a configured entry.
    fn validate(&self) -> Result<(), ConfigError> {
        for entry in &self.entries {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::Invalid("providers.entries[].name must be non-empty".to_string()));
            }
            if !(100..=120_000).contains(&entry.timeout_ms) {
                return Err(ConfigError::Invalid("providers.entries[].timeout_ms must be between 100 and 120000".to_string()));
            }
        }
        for name in &self.preference_order {
            if !self.entries.iter().any(|entry| &entry.name == name) {
                return Err(ConfigError::Invalid(format!("providers.preference_order names unconfigured provider '{name}'")));
            }
        }
        Ok(())
    }
}

/// Default third-party provider request timeout, in milliseconds.
const fn default_provider_timeout_ms() -> u64 {
    15_000
}

// ============================================================================
// SECTION: Sessions section
// ============================================================================

/// Session pool persistence tunables (spec §6: `session_persistence_dir`,
/// `session_persistence_enabled`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsSection {
    /// Directory sessions are persisted to; `None` disables persistence
    /// regardless of `persistence_enabled`.
    #[serde(default)]
    pub persistence_dir: Option<PathBuf>,
    /// Whether disk persistence is active.
    #[serde(default = "default_persistence_enabled")]
    pub persistence_enabled: bool,
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self { persistence_dir: None, persistence_enabled: default_persistence_enabled() }
    }
}

impl SessionsSection {
    /// Validates `persistence_dir`'s path length limits.
    fn validate(&self) -> Result<(), ConfigError> {
        let Some(dir) = &self.persistence_dir else {
            return Ok(());
        };
        let text = dir.to_string_lossy();
        if text.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("sessions.persistence_dir exceeds max length".to_string()));
        }
        for component in dir.components() {
            let value = component.as_os_str().to_string_lossy();
            if value.len() > MAX_PATH_COMPONENT_LENGTH {
                return Err(ConfigError::Invalid("sessions.persistence_dir contains an overlong component".to_string()));
            }
        }
        Ok(())
    }
}

/// Default: persistence is enabled whenever a directory is configured.
const fn default_persistence_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Store section
// ============================================================================

/// `SQLite` store tunables (`[AMBIENT]`: `sqlite_path`, `sqlite_busy_timeout_ms`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
    /// Busy timeout, in milliseconds.
    #[serde(default = "default_sqlite_busy_timeout_ms")]
    pub sqlite_busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
            sqlite_busy_timeout_ms: default_sqlite_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreSection {
    /// Validates `sqlite_path`'s length limits and `sqlite_busy_timeout_ms`'s
    /// range.
    fn validate(&self) -> Result<(), ConfigError> {
        let text = self.sqlite_path.to_string_lossy();
        if text.is_empty() || text.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("store.sqlite_path must be non-empty and within the length limit".to_string()));
        }
        if !(100..=60_000).contains(&self.sqlite_busy_timeout_ms) {
            return Err(ConfigError::Invalid("store.sqlite_busy_timeout_ms must be between 100 and 60000".to_string()));
        }
        Ok(())
    }
}

/// Default `SQLite` database path.
fn default_sqlite_path() -> PathBuf {
    PathBuf::from("harvestgate.sqlite3")
}

/// Default `SQLite` busy timeout, in milliseconds.
const fn default_sqlite_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Logging section
// ============================================================================

/// `tracing-subscriber` output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, multi-line output.
    #[default]
    Pretty,
    /// Newline-delimited JSON, for log aggregation.
    Json,
}

/// `[AMBIENT]` structured logging tunables (`log_level`, `log_format`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// An `EnvFilter` directive string, e.g. `"info"` or
    /// `"harvestgate_core=debug,warn"`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: default_log_level(), format: LogFormat::default() }
    }
}

impl LoggingSection {
    /// Validates that `level` is a non-empty, reasonably sized directive.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.level.trim().is_empty() || self.level.len() > 256 {
            return Err(ConfigError::Invalid("logging.level must be non-empty and at most 256 bytes".to_string()));
        }
        Ok(())
    }
}

/// Default log level directive.
fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Path resolution
// ============================================================================

/// Resolves the config path from an explicit argument, the
/// `HARVESTGATE_CONFIG` environment variable, or the default filename.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(env_path);
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
