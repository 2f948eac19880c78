// harvestgate-cli/src/wiring.rs
// ============================================================================
// Module: Collaborator wiring
// Description: Builds the concrete Orchestrator the CLI drives (spec §6:
//              repository, three engine adapters, session pool and
//              prober, broker, event bus).
// Purpose: Translate a loaded HarvestgateConfig into live collaborators.
// Dependencies: harvestgate-core, harvestgate-providers, harvestgate-sessions,
//               harvestgate-store-sqlite, harvestgate-broker, harvestgate-config
// ============================================================================

use std::collections::BTreeMap;

use harvestgate_broker::ChannelBroker;
use harvestgate_broker::LogEventBus;
use harvestgate_config::HarvestgateConfig;
use harvestgate_core::Engine;
use harvestgate_core::interfaces::AdapterError;
use harvestgate_core::interfaces::EngineAdapter;
use harvestgate_core::orchestrator::Orchestrator;
use harvestgate_core::orchestrator::OrchestratorConfig;
use harvestgate_providers::BrowserEngineAdapter;
use harvestgate_providers::HeadSessionProber;
use harvestgate_providers::HttpEngineAdapter;
use harvestgate_providers::ProviderEngineAdapter;
use harvestgate_sessions::InMemorySessionPool;
use harvestgate_sessions::PersistenceError;
use harvestgate_sessions::SessionPoolConfig;
use harvestgate_store_sqlite::SqliteRunStore;
use harvestgate_store_sqlite::SqliteStoreError;
use thiserror::Error;

/// The concrete orchestrator type the CLI assembles and drives.
pub type CliOrchestrator = Orchestrator<SqliteRunStore, InMemorySessionPool, HeadSessionProber, ChannelBroker, LogEventBus>;

/// Errors assembling the orchestrator's collaborators.
#[derive(Debug, Error)]
pub enum WiringError {
    /// The `SQLite` store could not be opened.
    #[error("failed to open run store: {0}")]
    Store(#[from] SqliteStoreError),
    /// A persisted session file could not be loaded.
    #[error("failed to load persisted sessions: {0}")]
    Sessions(#[from] PersistenceError),
    /// An engine adapter could not be constructed.
    #[error("failed to build engine adapter: {0}")]
    Adapter(#[from] AdapterError),
}

/// Opens the `SQLite` run store directly, for callers (`submit`,
/// `show-run`) that only need repository access, not the full orchestrator.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the store cannot be opened.
pub fn open_store(config: &HarvestgateConfig) -> Result<SqliteRunStore, SqliteStoreError> {
    SqliteRunStore::new(&config.sqlite_store_config())
}

/// Builds a live [`CliOrchestrator`], a handle to its broker, and a handle
/// to its store, from a loaded configuration. The returned store shares the
/// same underlying connection as the one the orchestrator holds, so writes
/// made through it (e.g. `submit`'s initial save) are immediately visible
/// to `execute_run`.
///
/// # Errors
///
/// Returns [`WiringError`] when the store cannot be opened, persisted
/// sessions cannot be loaded, or an engine adapter cannot be constructed.
pub fn build_orchestrator(config: &HarvestgateConfig) -> Result<(CliOrchestrator, ChannelBroker, SqliteRunStore), WiringError> {
    let store = SqliteRunStore::new(&config.sqlite_store_config())?;

    let pool_config = SessionPoolConfig {
        persistence_dir: if config.sessions.persistence_enabled { config.sessions.persistence_dir.clone() } else { None },
    };
    let sessions = InMemorySessionPool::load(pool_config, time::OffsetDateTime::now_utc())?;

    let prober = HeadSessionProber::new(config.http.timeout_seconds.saturating_mul(1000));

    let broker = ChannelBroker::new();
    let events = LogEventBus;

    let mut adapters: BTreeMap<Engine, Box<dyn EngineAdapter + Send + Sync>> = BTreeMap::new();
    adapters.insert(Engine::Http, Box::new(HttpEngineAdapter::new(config.http_adapter_config())?));
    adapters.insert(Engine::Browser, Box::new(BrowserEngineAdapter::new(config.browser_adapter_config())?));
    if let Some(provider_config) = config.provider_adapter_config() {
        adapters.insert(Engine::Provider, Box::new(ProviderEngineAdapter::new(provider_config)?));
    }

    let orchestrator_config = OrchestratorConfig { max_escalations: config.orchestrator.default_max_attempts, confidence_floor: config.orchestrator.confidence_floor };

    let store_handle = store.clone();
    let orchestrator = Orchestrator::new(store, adapters, sessions, prober, broker.clone(), events, orchestrator_config);
    Ok((orchestrator, broker, store_handle))
}
